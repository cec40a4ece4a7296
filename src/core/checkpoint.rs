//! Checkpoint save/restore collaborators
//!
//! The pipeline decides *when* checkpoints happen; these implementations
//! decide *how*. For database-backed tools that means emitting the vendor's
//! own save/load commands into the flow's script buffer: the tool itself
//! writes and reads the checkpoint when the script runs.

use crate::core::script::EmitsCommands;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("this flow cannot resume from `{step}`")]
    Unsupported { step: String },
}

/// When the pipeline calls these: `restore` before the first action of a
/// resumed run, `persist` after each successful non-terminal step, named for
/// the *next* step (`pre_{next}` write-ahead naming).
pub trait CheckpointIo<S>: Send {
    fn restore(&self, state: &mut S, step: &str) -> Result<(), CheckpointError>;
    fn persist(&self, state: &mut S, step: &str) -> Result<(), CheckpointError>;
}

/// Checkpoints through the tool's design database commands.
///
/// Command spellings differ per tool family (`write_db` for Innovus,
/// `write_db -to_file` for Genus), so they are injected at construction.
pub struct DbCheckpoints {
    restore_cmd: String,
    persist_cmd: String,
}

impl DbCheckpoints {
    pub fn new(restore_cmd: &str, persist_cmd: &str) -> Self {
        Self {
            restore_cmd: restore_cmd.to_string(),
            persist_cmd: persist_cmd.to_string(),
        }
    }
}

impl<S: EmitsCommands> CheckpointIo<S> for DbCheckpoints {
    fn restore(&self, state: &mut S, step: &str) -> Result<(), CheckpointError> {
        state.script().verbose_append(format!("{} pre_{}", self.restore_cmd, step));
        Ok(())
    }

    fn persist(&self, state: &mut S, step: &str) -> Result<(), CheckpointError> {
        state.script().verbose_append(format!("{} pre_{}", self.persist_cmd, step));
        Ok(())
    }
}

/// For single-step flows with nothing to resume.
pub struct NoCheckpoints;

impl<S> CheckpointIo<S> for NoCheckpoints {
    fn restore(&self, _state: &mut S, step: &str) -> Result<(), CheckpointError> {
        Err(CheckpointError::Unsupported { step: step.to_string() })
    }

    fn persist(&self, _state: &mut S, _step: &str) -> Result<(), CheckpointError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::ScriptBuffer;

    struct FakeState {
        script: ScriptBuffer,
    }

    impl EmitsCommands for FakeState {
        fn script(&mut self) -> &mut ScriptBuffer {
            &mut self.script
        }
    }

    #[test]
    fn test_db_checkpoints_emit_pre_named_commands() {
        let mut state = FakeState { script: ScriptBuffer::new() };
        let ckpt = DbCheckpoints::new("read_db", "write_db -to_file");

        ckpt.restore(&mut state, "syn_map").unwrap();
        ckpt.persist(&mut state, "write_regs").unwrap();

        assert_eq!(
            state.script.lines(),
            &["read_db pre_syn_map", "write_db -to_file pre_write_regs"]
        );
    }

    #[test]
    fn test_no_checkpoints_cannot_restore() {
        let mut state = FakeState { script: ScriptBuffer::new() };
        let ckpt = NoCheckpoints;

        let err = CheckpointIo::restore(&ckpt, &mut state, "run_simulation").unwrap_err();
        assert!(matches!(err, CheckpointError::Unsupported { .. }));
        assert!(state.script.is_empty());
    }
}
