pub mod config_inbox;

pub use config_inbox::*;
