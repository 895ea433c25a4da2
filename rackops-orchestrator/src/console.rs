//! User-facing report output, kept apart from `tracing` diagnostics.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

const BAR_WIDTH: u64 = 50;

enum Sink {
    Stdout,
    Buffer(Arc<Mutex<String>>),
}

pub struct Console {
    sink: Sink,
    mid_line: bool,
}

impl Console {
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Stdout,
            mid_line: false,
        }
    }

    /// Console writing into a shared buffer, returned alongside for inspection.
    pub fn capture() -> (Self, Arc<Mutex<String>>) {
        let buf = Arc::new(Mutex::new(String::new()));
        (
            Self {
                sink: Sink::Buffer(buf.clone()),
                mid_line: false,
            },
            buf,
        )
    }

    fn write(&mut self, text: &str) {
        match &self.sink {
            Sink::Stdout => {
                let mut out = io::stdout().lock();
                // Ignore a closed stdout.
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            Sink::Buffer(buf) => {
                let mut buf = buf.lock().unwrap_or_else(|e| e.into_inner());
                buf.push_str(text);
            }
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.end_progress();
        let text = format!("{}\n", text.as_ref());
        self.write(&text);
    }

    /// Question text left on the current line for the user's answer.
    pub fn prompt(&mut self, text: &str) {
        self.end_progress();
        self.write(text);
    }

    /// One progress dot on the current line.
    pub fn dot(&mut self) {
        self.mid_line = true;
        self.write(".");
    }

    /// Terminate a line of dots or a progress bar, if one is open.
    pub fn end_progress(&mut self) {
        if self.mid_line {
            self.mid_line = false;
            self.write("\n");
        }
    }

    /// Redraw a fixed-width bar: one `=` per 2 % done.
    pub fn progress_bar(&mut self, done: u64, total: u64) {
        let filled = if total == 0 {
            BAR_WIDTH
        } else {
            (done.min(total) * BAR_WIDTH) / total
        };
        let bar = format!(
            "\r[{}{}] {:3}%",
            "=".repeat(filled as usize),
            " ".repeat((BAR_WIDTH - filled) as usize),
            filled * 2
        );
        self.mid_line = true;
        self.write(&bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(buf: &Arc<Mutex<String>>) -> String {
        buf.lock().unwrap().clone()
    }

    #[test]
    fn dots_are_closed_before_next_line() {
        let (mut c, buf) = Console::capture();
        c.dot();
        c.dot();
        c.line("done");
        assert_eq!(text(&buf), "..\ndone\n");
    }

    #[test]
    fn progress_bar_scales_to_fifty_columns() {
        let (mut c, buf) = Console::capture();
        c.progress_bar(1, 2);
        c.end_progress();
        let out = text(&buf);
        assert!(out.starts_with("\r["));
        assert_eq!(out.matches('=').count(), 25);
        assert!(out.contains(" 50%"));
    }

    #[test]
    fn empty_upload_draws_full_bar() {
        let (mut c, buf) = Console::capture();
        c.progress_bar(0, 0);
        assert_eq!(text(&buf).matches('=').count(), 50);
    }
}
