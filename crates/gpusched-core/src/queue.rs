//! Command queue loaded from a command list file

use std::ops::Index;
use std::path::Path;

use tracing::debug;

use crate::error::{SchedError, SchedResult};

/// Ordered, immutable list of commands to dispatch
///
/// The list is read once; later edits to the source file are not observed.
/// Each line is trimmed of trailing whitespace and blank lines are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    commands: Vec<String>,
}

impl CommandQueue {
    /// Build a queue from lines of text
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let commands = lines
            .into_iter()
            .map(|line| line.as_ref().trim_end().to_string())
            .filter(|line| !line.trim_start().is_empty())
            .collect();
        Self { commands }
    }

    /// Load a queue from a newline-delimited command file
    pub fn from_file(path: &Path) -> SchedResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchedError::Config(format!(
                "Failed to read commands file {}: {}",
                path.display(),
                e
            ))
        })?;

        let queue = Self::from_lines(content.lines());
        debug!(
            path = %path.display(),
            commands = queue.len(),
            "Loaded command queue"
        );
        Ok(queue)
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the queue holds no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.commands.get(index).map(String::as_str)
    }

    /// Iterate over commands in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }
}

impl Index<usize> for CommandQueue {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.commands[index]
    }
}
