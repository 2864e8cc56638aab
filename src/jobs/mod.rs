//! Job scheduling core: plans, the engine loop and the command executor.

pub mod error;
pub mod executor;
pub mod models;
pub mod plan;
pub mod process;
pub mod scheduler;

pub use error::{JobError, JobResult};
pub use executor::{CommandExecutor, JobDispatcher};
pub use models::{ExecutionInfo, ExecutionResult, Job, JobEvent, LogRecord, SchedulePlan};
pub use plan::{build_plan, parse_schedule};
pub use scheduler::{EngineHandle, EngineInbox, ScheduleEngine, engine_channel};
