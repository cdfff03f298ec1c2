use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Outcome of one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Ctrl-D or closed stdin.
    Eof,
}

/// Source of user lines for the chat loop.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine>;
}

/// Line editor backed by rustyline, with in-process history.
pub struct RustylineReader {
    editor: DefaultEditor,
}

impl RustylineReader {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to initialise line editor")?;
        Ok(Self { editor })
    }
}

impl LineReader for RustylineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        tracing::debug!("failed to record history entry: {e}");
                    }
                }
                Ok(ReadLine::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
            Err(e) => Err(e).context("failed to read input"),
        }
    }
}

/// Replays a fixed list of lines, then reports end of input.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedReader {
    lines: std::collections::VecDeque<ReadLine>,
}

#[cfg(test)]
impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|l| ReadLine::Line(l.into())).collect(),
        }
    }

    /// Queue a Ctrl-C after the scripted lines.
    pub fn then_interrupt(mut self) -> Self {
        self.lines.push_back(ReadLine::Interrupted);
        self
    }
}

#[cfg(test)]
impl LineReader for ScriptedReader {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadLine> {
        Ok(self.lines.pop_front().unwrap_or(ReadLine::Eof))
    }
}
