//! Terminal spinner shown while the agent is working.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle, TermLike};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Output sink shared between the chat loop and the spinner.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_LABEL: &str = "Thinking";

// indicatif shows the last tick string once the bar is finished.
const TICK_STRINGS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", ""];
const DRAW_WIDTH: u16 = 80;

/// Animates a single line until stopped.
///
/// At most one animation runs at a time. `stop` joins the tick thread before
/// blanking the line, so nothing is drawn once it returns.
pub struct Spinner {
    label: String,
    display: SharedWriter,
    bar: Option<ProgressBar>,
}

impl Spinner {
    pub fn new(label: impl Into<String>, display: SharedWriter) -> Self {
        Self {
            label: label.into(),
            display,
            bar: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_running(&self) -> bool {
        self.bar.is_some()
    }

    /// Start animating. No-op if already running.
    pub fn start(&mut self) {
        if self.bar.is_some() {
            return;
        }
        let target = ProgressDrawTarget::term_like(Box::new(LineTerm {
            display: Arc::clone(&self.display),
            clear: self.clear_sequence(),
        }));
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(ProgressStyle::default_spinner().tick_strings(&TICK_STRINGS));
        bar.set_message(format!("{}...", self.label));
        bar.enable_steady_tick(SPINNER_INTERVAL);
        self.bar = Some(bar);
    }

    /// Stop animating and blank the line. No-op if not running.
    pub fn stop(&mut self) {
        let Some(bar) = self.bar.take() else {
            return;
        };
        bar.disable_steady_tick();
        bar.finish_and_clear();
        write_all(&self.display, &self.clear_sequence());
    }

    /// The sequence that overwrites the spinner line and returns the cursor.
    pub fn clear_sequence(&self) -> String {
        format!("\r{}\r", " ".repeat(self.label.chars().count() + 10))
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn write_all(display: &SharedWriter, text: &str) {
    let mut out = display.lock();
    // Terminal write failures are not actionable here.
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

/// Single-line draw target over the loop's display, so frames and answers
/// share one writer.
struct LineTerm {
    display: SharedWriter,
    clear: String,
}

impl fmt::Debug for LineTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTerm").finish_non_exhaustive()
    }
}

impl LineTerm {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut out = self.display.lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

impl TermLike for LineTerm {
    fn width(&self) -> u16 {
        DRAW_WIDTH
    }

    // One line only: there is never another line to move to.
    fn move_cursor_up(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_down(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_right(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_left(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn write_line(&self, s: &str) -> io::Result<()> {
        self.write(&format!("\r{s}"))
    }

    fn write_str(&self, s: &str) -> io::Result<()> {
        self.write(s)
    }

    fn clear_line(&self) -> io::Result<()> {
        self.write(&self.clear)
    }

    fn flush(&self) -> io::Result<()> {
        self.display.lock().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn buffer() -> (Arc<Mutex<Vec<u8>>>, SharedWriter) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let display: SharedWriter = buf.clone();
        (buf, display)
    }

    fn contents(buf: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(buf.lock().clone()).unwrap()
    }

    fn has_frame(out: &str, label: &str) -> bool {
        SPINNER_FRAMES
            .iter()
            .any(|glyph| out.contains(&format!("{glyph} {label}...")))
    }

    #[test]
    fn draws_frames_with_label() {
        let (buf, display) = buffer();
        let mut spinner = Spinner::new(DEFAULT_LABEL, display);
        spinner.start();
        assert!(spinner.is_running());
        sleep(Duration::from_millis(250));
        spinner.stop();

        assert!(has_frame(&contents(&buf), "Thinking"));
    }

    #[test]
    fn stop_ends_with_clear_sequence_and_silences_ticks() {
        let (buf, display) = buffer();
        let mut spinner = Spinner::new("Thinking", display);
        spinner.start();
        sleep(Duration::from_millis(150));
        spinner.stop();

        let after_stop = contents(&buf);
        assert!(after_stop.ends_with(&format!("\r{}\r", " ".repeat(18))));

        sleep(Duration::from_millis(300));
        assert_eq!(contents(&buf), after_stop);
        assert!(!spinner.is_running());
    }

    #[test]
    fn can_start_and_stop_twice() {
        let (buf, display) = buffer();
        let mut spinner = Spinner::new("Thinking", display);
        let clear = spinner.clear_sequence();

        spinner.start();
        sleep(Duration::from_millis(50));
        spinner.stop();
        let first = contents(&buf);
        assert!(first.ends_with(&clear));

        spinner.start();
        assert!(spinner.is_running());
        sleep(Duration::from_millis(150));
        spinner.stop();

        assert!(!spinner.is_running());
        let out = contents(&buf);
        assert!(out.len() > first.len());
        assert!(out.ends_with(&clear));
        assert!(has_frame(&out[first.len()..], "Thinking"));
    }

    #[test]
    fn stop_without_start_writes_nothing() {
        let (buf, display) = buffer();
        let mut spinner = Spinner::new("Thinking", display);
        spinner.stop();
        assert!(contents(&buf).is_empty());
        assert!(!spinner.is_running());
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let (_buf, display) = buffer();
        let mut spinner = Spinner::new("Thinking", display);
        spinner.start();
        spinner.start();
        assert!(spinner.is_running());
        spinner.stop();
        assert!(!spinner.is_running());
    }

    #[test]
    fn dropping_a_running_spinner_clears_the_line() {
        let (buf, display) = buffer();
        {
            let mut spinner = Spinner::new("Thinking", display);
            spinner.start();
            sleep(Duration::from_millis(50));
        }
        assert!(contents(&buf).ends_with(&format!("\r{}\r", " ".repeat(18))));
    }

    #[test]
    fn clear_sequence_covers_label_and_glyph() {
        let (_buf, display) = buffer();
        let spinner = Spinner::new("Working", display);
        assert_eq!(spinner.clear_sequence(), format!("\r{}\r", " ".repeat(17)));
        assert_eq!(spinner.label(), "Working");
    }
}
