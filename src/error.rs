use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::serialiser::timecode;

#[derive(Error, Debug)]
pub enum SubpromptError {
    #[error("line {line}: {reason}: '{content}'")]
    Parse {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Unable to load file: '{path}'")]
    FileRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("start time {} beyond end of subtitles ({})", timecode(.start), timecode(.end))]
    SeekOutOfRange { start: Duration, end: Duration },

    #[error("invalid start time '{0}', expected HH:MM:SS")]
    InvalidStartTime(String),

    #[error("no subtitles found")]
    NoSubtitles,
}

impl SubpromptError {
    pub(crate) fn parse(line: usize, content: &str, reason: impl Into<String>) -> Self {
        SubpromptError::Parse {
            line,
            content: content.to_string(),
            reason: reason.into(),
        }
    }

    /// Short message suitable for showing on the screen itself.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubpromptError::Parse { .. } | SubpromptError::NoSubtitles => {
                "Unable to read subtitles!"
            }
            SubpromptError::FileRead { .. } => "Unable to load file!",
            SubpromptError::SeekOutOfRange { .. } => "Start time is beyond the end of the subtitles!",
            SubpromptError::InvalidStartTime(_) => "Invalid start time!",
        }
    }
}
