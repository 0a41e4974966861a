use crate::format::{Formatter, Run};

use std::io::{self, Write};

use anyhow::Result;

const CLEAR: &str = "\x1b[2J\x1b[H";
const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";

/// Where the scheduler sends what should be visible right now.
pub trait Screen {
    fn render(&mut self, text: &str) -> io::Result<()>;
    fn clear(&mut self) -> io::Result<()>;
    fn hide_cursor(&mut self) -> io::Result<()>;
}

/// ANSI terminal screen. Restores the cursor when dropped.
pub struct Terminal<W: Write> {
    out: W,
    formatter: Formatter,
    blank: bool,
    cursor_hidden: bool,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Result<Self> {
        Ok(Self {
            out,
            formatter: Formatter::new()?,
            blank: false,
            cursor_hidden: false,
        })
    }

    fn write_run(&mut self, run: &Run) -> io::Result<()> {
        let styled = run.style.bold || run.style.italic;
        if run.style.bold {
            self.out.write_all(b"\x1b[1m")?;
        }
        if run.style.italic {
            self.out.write_all(b"\x1b[3m")?;
        }
        self.out.write_all(run.text.as_bytes())?;
        if styled {
            self.out.write_all(b"\x1b[0m")?;
        }
        Ok(())
    }
}

impl<W: Write> Screen for Terminal<W> {
    fn render(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(CLEAR.as_bytes())?;
        for line in self.formatter.styled_lines(text) {
            for run in &line {
                self.write_run(run)?;
            }
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        self.blank = false;
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        if self.blank {
            return Ok(());
        }
        self.out.write_all(CLEAR.as_bytes())?;
        self.out.flush()?;
        self.blank = true;
        Ok(())
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.out.write_all(HIDE_CURSOR.as_bytes())?;
        self.out.flush()?;
        self.cursor_hidden = true;
        Ok(())
    }
}

impl<W: Write> Drop for Terminal<W> {
    fn drop(&mut self) {
        if self.cursor_hidden {
            let _ = self.out.write_all(SHOW_CURSOR.as_bytes());
            let _ = self.out.flush();
        }
    }
}
