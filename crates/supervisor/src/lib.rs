//! Supervisor side: the worker table, process launching, the scheduling
//! loop and the operator quit prompt.

pub mod launcher;
pub mod prompt;
pub mod record;
pub mod scheduler;
pub mod supervisor;

pub use launcher::{ProcessLauncher, WorkerLauncher};
pub use prompt::{LinePrompt, OperatorPrompt, StdinPrompt, QUIT_QUESTION};
pub use record::{ExitOutcome, WorkerRecord};
pub use scheduler::{LoopState, SchedulerLoop, ShutdownReport};
pub use supervisor::WorkerSupervisor;
