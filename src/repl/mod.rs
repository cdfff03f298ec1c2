//! Interactive question/answer loop.
//!
//! [`ChatLoop`] reads a line, hands it to the agent, and prints the answer.
//! While the agent works a [`Spinner`] animates on the same display unless
//! verbose mode is on, in which case the agent's own logging is the
//! feedback. A failed turn is reported and the loop carries on.

pub mod input;
pub mod spinner;

pub use input::{LineReader, ReadLine, RustylineReader};
pub use spinner::{SharedWriter, Spinner, DEFAULT_LABEL};

use anyhow::Result;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

use crate::agent::{AgentExecutor, AgentInput};
use crate::sessions::{SessionMemory, DEFAULT_SESSION_ID};

pub const PROMPT: &str = "🔍 Your question: ";
pub const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "q"];
pub const CLEAR_COMMAND: &str = "/clear";

const RULE_WIDTH: usize = 60;

/// Resolves when the user asks to abandon the question in flight.
pub type InterruptFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
pub fn ctrl_c() -> InterruptFuture {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// What a line of user input asks the loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Skip,
    Clear,
    Ask(String),
}

/// Classify one raw input line.
pub fn classify_input(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Skip;
    }
    let lowered = trimmed.to_lowercase();
    if EXIT_KEYWORDS.contains(&lowered.as_str()) {
        Command::Exit
    } else if lowered == CLEAR_COMMAND {
        Command::Clear
    } else {
        Command::Ask(trimmed.to_string())
    }
}

pub struct ChatLoop {
    agent: Box<dyn AgentExecutor>,
    reader: Box<dyn LineReader>,
    display: SharedWriter,
    verbose: bool,
    session_id: Option<String>,
    memory: Option<Arc<dyn SessionMemory>>,
    interrupt: Box<dyn Fn() -> InterruptFuture>,
}

impl ChatLoop {
    pub fn new(
        agent: Box<dyn AgentExecutor>,
        reader: Box<dyn LineReader>,
        display: SharedWriter,
    ) -> Self {
        Self {
            agent,
            reader,
            display,
            verbose: false,
            session_id: None,
            memory: None,
            interrupt: Box::new(|| -> InterruptFuture { Box::pin(std::future::pending()) }),
        }
    }

    /// Suppress the spinner.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Attach a session identifier to every request.
    pub fn session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Store handle used by `/clear`.
    pub fn memory(mut self, memory: Option<Arc<dyn SessionMemory>>) -> Self {
        self.memory = memory;
        self
    }

    /// Signal that ends the session while the agent is working. Without one,
    /// a question always runs to completion.
    pub fn interrupt_with(mut self, signal: impl Fn() -> InterruptFuture + 'static) -> Self {
        self.interrupt = Box::new(signal);
        self
    }

    /// Run until an exit keyword, Ctrl-C, or end of input.
    ///
    /// Agent failures never end the loop. Only display or terminal I/O
    /// failures are returned.
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner()?;

        loop {
            self.say("")?;
            let line = match self.reader.read_line(PROMPT)? {
                ReadLine::Line(line) => line,
                ReadLine::Interrupted | ReadLine::Eof => {
                    self.say("\n\nGoodbye!")?;
                    break;
                }
            };

            match classify_input(&line) {
                Command::Exit => {
                    self.say("\nGoodbye!")?;
                    break;
                }
                Command::Skip => continue,
                Command::Clear => self.clear_session()?,
                Command::Ask(question) => {
                    if self.ask(question).await? == Flow::Quit {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn ask(&mut self, question: String) -> Result<Flow> {
        let mut request = AgentInput::new(question);
        request.session_id.clone_from(&self.session_id);

        let mut spinner =
            (!self.verbose).then(|| Spinner::new(DEFAULT_LABEL, Arc::clone(&self.display)));
        if let Some(spinner) = spinner.as_mut() {
            spinner.start();
        }
        let interrupted = (self.interrupt)();
        let outcome = tokio::select! {
            result = self.agent.invoke(&request) => Some(result),
            () = interrupted => None,
        };
        if let Some(spinner) = spinner.as_mut() {
            spinner.stop();
        }

        match outcome {
            Some(Ok(response)) => self.say(&format!("💡 Answer: {}", response.output))?,
            Some(Err(e)) => {
                tracing::debug!("agent invocation failed: {e:#}");
                self.say(&format!("\n❌ Error: {e}"))?;
                self.say("Please try rephrasing your question.")?;
            }
            None => {
                tracing::info!("question abandoned by interrupt");
                self.say("\n\nGoodbye!")?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    fn clear_session(&self) -> Result<()> {
        let Some(memory) = &self.memory else {
            return self.say("Conversation memory is disabled; nothing to clear.");
        };
        let session_id = self.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID);
        memory.clear(session_id);
        tracing::info!(session_id, "conversation cleared");
        self.say("🧹 Conversation history cleared.")
    }

    fn print_banner(&self) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        self.say(&rule)?;
        self.say(&console::style("E-Commerce Database Chat CLI").bold().to_string())?;
        self.say(&rule)?;
        self.say("Ask questions about your e-commerce data in natural language.")?;
        self.say("Type 'exit' or 'quit' to end the session.")?;
        if self.verbose {
            self.say("Verbose mode: ON - Showing background operations")?;
        }
        Ok(())
    }

    fn say(&self, text: &str) -> Result<()> {
        let mut out = self.display.lock();
        writeln!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }
}
