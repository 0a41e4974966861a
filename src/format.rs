use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
}

/// A stretch of text that shares one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: Style,
}

/// Turns `<b>` and `<i>` markup into styled runs. The text between tags is
/// passed through untouched and in its original order.
pub struct Formatter {
    tags: Regex,
}

impl Formatter {
    pub fn new() -> Result<Self> {
        let tags = Regex::new(r"(?i)</?[bi]>").context("Invalid emphasis pattern.")?;
        Ok(Self { tags })
    }

    /// One entry per text line. Styles do not carry over from one line to
    /// the next.
    pub fn styled_lines(&self, text: &str) -> Vec<Vec<Run>> {
        text.split('\n').map(|line| self.styled_line(line)).collect()
    }

    fn styled_line(&self, line: &str) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut style = Style::default();
        let mut last = 0;

        for tag in self.tags.find_iter(line) {
            push_run(&mut runs, &line[last..tag.start()], style);
            match tag.as_str().to_ascii_lowercase().as_str() {
                "<b>" => style.bold = true,
                "</b>" => style.bold = false,
                "<i>" => style.italic = true,
                "</i>" => style.italic = false,
                _ => {}
            }
            last = tag.end();
        }
        push_run(&mut runs, &line[last..], style);

        runs
    }
}

fn push_run(runs: &mut Vec<Run>, text: &str, style: Style) {
    if text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(prev) if prev.style == style => prev.text.push_str(text),
        _ => runs.push(Run {
            text: text.to_string(),
            style,
        }),
    }
}
