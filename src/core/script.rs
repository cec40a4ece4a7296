//! Buffered command emission for vendor control scripts

use std::io;
use std::path::Path;
use tracing::info;

/// Append-only buffer of commands destined for a vendor tool script.
///
/// Steps build the script incrementally; nothing touches disk until the
/// flow's finalization flushes the buffer with [`ScriptBuffer::write_to`].
/// Commands are arbitrary text: no validation, no deduplication, order
/// preserved.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuffer {
    lines: Vec<String>,
}

impl ScriptBuffer {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Append a command silently.
    pub fn append(&mut self, cmd: impl Into<String>) {
        self.lines.push(cmd.into());
    }

    /// Append a command, mirroring it to the log sink first.
    pub fn verbose_append(&mut self, cmd: impl Into<String>) {
        let cmd = cmd.into();
        info!("> {}", cmd);
        self.lines.push(cmd);
    }

    /// Append every line of a multi-line block silently.
    pub fn append_lines<I, T>(&mut self, lines: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for line in lines {
            self.append(line);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The buffer contents as a newline-joined script.
    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }

    /// Flush the buffer to a script file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.contents())
    }
}

/// Anything that owns a [`ScriptBuffer`] steps can emit into.
///
/// Checkpoint emitters are generic over this so they can inject save/load
/// commands into whatever flow state they are attached to.
pub trait EmitsCommands {
    fn script(&mut self) -> &mut ScriptBuffer;
}
