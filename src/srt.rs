use std::time::Duration;

/// A single subtitle entry, with the gap to the following entry
/// already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub(crate) index: usize,
    pub(crate) start: Duration,
    pub(crate) end: Duration,
    pub(crate) text: String,
    /// Time between the end of this cue and the start of the next one.
    /// Only set when that gap is strictly positive.
    pub(crate) pause: Option<Duration>,
}

impl Cue {
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}
