use crate::scheduler::StartPosition;
use crate::srt::Cue;

use std::fmt;
use std::io::{BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result};

/// Displays a timeline position as an SRT timestamp, `HH:MM:SS,mmm`.
pub struct Timecode(pub Duration);

impl fmt::Display for Timecode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let total_secs = self.0.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        let millis = self.0.as_millis() % 1000;
        write!(
            fmt,
            "{:02}:{:02}:{:02},{:03}",
            hours, minutes, seconds, millis
        )
    }
}

pub fn timecode(timestamp: &Duration) -> Timecode {
    Timecode(*timestamp)
}

/// Writes a human readable overview of the parsed cues and where playback
/// would begin.
pub fn write_listing<W: Write>(output: W, cues: &[Cue], start: &StartPosition) -> Result<()> {
    let mut writer = BufWriter::new(output);
    write_cues(&mut writer, cues).context("Failed to write cue listing.")?;
    write_start(&mut writer, cues, start).context("Failed to write cue listing.")?;
    writer.flush().context("Failed to write cue listing.")?;
    Ok(())
}

fn write_cues<W: Write>(buf: &mut W, cues: &[Cue]) -> Result<()> {
    for cue in cues {
        write_cue(buf, cue)?;
    }
    Ok(())
}

fn write_cue<W: Write>(buf: &mut W, cue: &Cue) -> Result<()> {
    write!(buf, "{:>5}  ", cue.index)?;
    write_ts(buf, cue.start)?;
    write!(buf, " --> ")?;
    write_ts(buf, cue.end)?;
    write!(buf, "  {:>8}", seconds(cue.duration()))?;
    if let Some(pause) = cue.pause {
        write!(buf, "  pause {}", seconds(pause))?;
    }
    writeln!(buf)?;
    for line in cue.text.lines() {
        writeln!(buf, "       {}", line)?;
    }
    Ok(())
}

fn write_start<W: Write>(buf: &mut W, cues: &[Cue], start: &StartPosition) -> Result<()> {
    let index = cues.get(start.index).map_or(start.index + 1, |cue| cue.index);
    let lead_in = Duration::from_millis(start.lead_in_ms.unsigned_abs());
    if start.lead_in_ms < 0 {
        writeln!(
            buf,
            "Playback resumes {} into subtitle {}.",
            seconds(lead_in),
            index
        )?;
    } else {
        writeln!(
            buf,
            "Playback reaches subtitle {} after {}.",
            index,
            seconds(lead_in)
        )?;
    }
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, timestamp: Duration) -> Result<()> {
    write!(buf, "{}", Timecode(timestamp))?;
    Ok(())
}

fn seconds(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}
