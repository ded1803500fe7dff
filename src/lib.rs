pub mod app;
pub mod cli;
pub mod definitions;
pub mod logging;
pub mod shutdown;
