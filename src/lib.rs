//! edaflow - EDA flow orchestration with checkpointed step pipelines

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod tools;

// Re-export commonly used types
pub use crate::core::{FlowConfig, RunState, RunStatus, ScriptBuffer, Settings, StartPoint, Step, Transition};
pub use crate::core::{CheckpointError, CheckpointIo, DbCheckpoints, EmitsCommands, NoCheckpoints};
pub use execution::{Finalize, OutputStyle, PipelineError, PipelineEvent, StepPipeline};
pub use execution::{RunnerError, SubprocessRunner, ToolRunner};
pub use tools::{Genus, Innovus, Joules, ToolKind, Xcelium};
