use crate::error::SubpromptError;
use crate::srt::Cue;

use std::time::Duration;

use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::{all_consuming, map_res};
use nom::error::VerboseError;
use nom::IResult;

type Result<T> = std::result::Result<T, SubpromptError>;

/// A subtitle block that has been started but not yet closed by a blank line.
#[derive(Debug)]
struct PendingCue {
    index: usize,
    line: usize,
    raw_index: String,
    timing: Option<(Duration, Duration)>,
    text: Option<String>,
}

/// Line-oriented SRT parser.
///
/// Tracks the position of each line relative to the last blank line: the
/// first line of a block is the index, the second the timing line and
/// everything after that is text. A finished cue is held back until the
/// next cue's timing is known, so that its pause can be filled in before it
/// is appended to the output.
#[derive(Debug, Default)]
pub struct Parser {
    entry_position: usize,
    line_number: usize,
    pending: Option<PendingCue>,
    previous: Option<Cue>,
    cues: Vec<Cue>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(mut self, input: &str) -> Result<Vec<Cue>> {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        for line in input.split('\n') {
            self.feed_line(line.strip_suffix('\r').unwrap_or(line))?;
        }
        self.finish()
    }

    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        self.line_number += 1;
        if line.is_empty() {
            self.entry_position = 0;
            return self.close_entry();
        }

        self.entry_position += 1;
        match self.entry_position {
            1 => self.start_entry(line),
            2 => self.set_timing(line),
            3 => {
                self.pending(line)?.text = Some(line.to_string());
                Ok(())
            }
            _ => {
                let text = self.pending(line)?.text.get_or_insert_with(String::new);
                text.push('\n');
                text.push_str(line);
                Ok(())
            }
        }
    }

    pub fn finish(mut self) -> Result<Vec<Cue>> {
        self.close_entry()?;
        if let Some(last) = self.previous.take() {
            self.cues.push(last);
        }
        Ok(self.cues)
    }

    fn pending(&mut self, line: &str) -> Result<&mut PendingCue> {
        let line_number = self.line_number;
        self.pending
            .as_mut()
            .ok_or_else(|| SubpromptError::parse(line_number, line, "text outside of a subtitle"))
    }

    fn start_entry(&mut self, line: &str) -> Result<()> {
        let index = match all_consuming(seq_num)(line.trim()) {
            Ok((_, index)) => index,
            Err(_) => {
                return Err(SubpromptError::parse(
                    self.line_number,
                    line,
                    "invalid subtitle index",
                ))
            }
        };

        let expected = self.cues.len() + usize::from(self.previous.is_some()) + 1;
        if index != expected {
            return Err(SubpromptError::parse(
                self.line_number,
                line,
                format!("expected subtitle index {}", expected),
            ));
        }

        self.pending = Some(PendingCue {
            index,
            line: self.line_number,
            raw_index: line.to_string(),
            timing: None,
            text: None,
        });
        Ok(())
    }

    fn set_timing(&mut self, line: &str) -> Result<()> {
        let line_number = self.line_number;
        let (show_at, hide_at) = match all_consuming(show_hide)(line) {
            Ok((_, timing)) => timing,
            Err(_) => {
                return Err(SubpromptError::parse(
                    line_number,
                    line,
                    "malformed timing line, expected 'HH:MM:SS,mmm --> HH:MM:SS,mmm'",
                ))
            }
        };
        if hide_at < show_at {
            return Err(SubpromptError::parse(
                line_number,
                line,
                "subtitle ends before it starts",
            ));
        }

        if let Some(mut previous) = self.previous.take() {
            previous.pause = show_at
                .checked_sub(previous.end)
                .filter(|gap| !gap.is_zero());
            self.cues.push(previous);
        }

        self.pending(line)?.timing = Some((show_at, hide_at));
        Ok(())
    }

    fn close_entry(&mut self) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            let (start, end) = pending.timing.ok_or_else(|| {
                SubpromptError::parse(pending.line, &pending.raw_index, "missing timing line")
            })?;
            self.previous = Some(Cue {
                index: pending.index,
                start,
                end,
                text: pending.text.unwrap_or_default(),
                pause: None,
            });
        }
        Ok(())
    }
}

/// Parses a start offset in the form `HH:MM:SS`.
pub fn parse_start_time(input: &str) -> Result<Duration> {
    match all_consuming(clock)(input.trim()) {
        Ok((_, seconds)) => Ok(Duration::from_secs(seconds)),
        Err(_) => Err(SubpromptError::InvalidStartTime(input.to_string())),
    }
}

fn show_hide(input: &str) -> IResult<&str, (Duration, Duration), VerboseError<&str>> {
    let (input, show_at) = timestamp(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("-->")(input)?;
    let (input, _) = space1(input)?;
    let (input, hide_at) = timestamp(input)?;
    let (input, _) = space0(input)?;

    Ok((input, (show_at, hide_at)))
}

fn timestamp(input: &str) -> IResult<&str, Duration, VerboseError<&str>> {
    let (input, seconds) = clock(input)?;
    let (input, _) = tag(",")(input)?;
    let (input, millis) = digits(3)(input)?;

    Ok((input, Duration::from_millis(seconds * 1000 + millis)))
}

/// `HH:MM:SS`, in seconds.
fn clock(input: &str) -> IResult<&str, u64, VerboseError<&str>> {
    let (input, hours) = digits(2)(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, minutes) = digits(2)(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, seconds) = digits(2)(input)?;

    Ok((input, (hours * 60 + minutes) * 60 + seconds))
}

fn digits<'a>(count: usize) -> impl FnMut(&'a str) -> IResult<&'a str, u64, VerboseError<&'a str>> {
    map_res(
        take_while_m_n(count, count, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u64>(),
    )
}

fn seq_num(input: &str) -> IResult<&str, usize, VerboseError<&str>> {
    map_res(digit1, |s: &str| s.parse())(input)
}
