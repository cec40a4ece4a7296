//! Pipeline execution engine

pub mod pipeline;
pub mod runner;

pub use pipeline::{EventHandler, Finalize, PipelineError, PipelineEvent, StepPipeline};
pub use runner::{OutputStyle, RunnerError, SubprocessRunner, ToolRunner};
