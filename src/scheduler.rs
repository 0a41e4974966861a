use crate::error::SubpromptError;
use crate::screen::Screen;
use crate::srt::Cue;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Length of a countdown tick, and the longest single wait while lining up
/// a seek.
const TICK: Duration = Duration::from_secs(1);
const TICK_MS: i64 = 1000;

/// Where playback begins once the countdown is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPosition {
    pub index: usize,
    /// Milliseconds from the end of the countdown until cue `index` starts.
    /// Negative when playback starts partway through that cue.
    pub lead_in_ms: i64,
}

impl StartPosition {
    /// Finds the first cue that is still showing, or yet to come, at
    /// `start` on the subtitle timeline.
    pub fn locate(cues: &[Cue], start: Duration) -> Result<Self, SubpromptError> {
        let first = cues.first().ok_or(SubpromptError::NoSubtitles)?;
        if start.is_zero() {
            return Ok(Self {
                index: 0,
                lead_in_ms: millis(first.start),
            });
        }

        let index = cues
            .iter()
            .position(|cue| cue.end >= start)
            .ok_or_else(|| SubpromptError::SeekOutOfRange {
                start,
                end: cues.last().map_or(Duration::ZERO, |cue| cue.end),
            })?;

        Ok(Self {
            index,
            lead_in_ms: millis(cues[index].start) - millis(start),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Countdown(u32),
    /// Blank screen while waiting out the remaining lead-in, in milliseconds.
    SeekAdjust(i64),
    Displaying { index: usize, offset: Duration },
    Paused(usize),
    Finished,
}

/// Plays a cue sequence as an explicit state machine. Each call to `step`
/// performs the current state's screen update and says how long to wait
/// before the next one.
#[derive(Debug)]
pub struct Scheduler {
    cues: Vec<Cue>,
    start: StartPosition,
    state: State,
}

impl Scheduler {
    pub fn new(cues: Vec<Cue>, start: StartPosition, countdown: u32) -> Self {
        Self {
            cues,
            start,
            state: State::Countdown(countdown),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the delay until the next step, or `None` once playback has
    /// finished.
    pub fn step<S: Screen>(&mut self, screen: &mut S) -> Result<Option<Duration>> {
        let (next, delay) = match self.state {
            State::Countdown(n) => {
                screen
                    .render(&n.to_string())
                    .context("Failed to render countdown")?;
                if n > 0 {
                    (State::Countdown(n - 1), TICK)
                } else {
                    screen.hide_cursor().context("Failed to hide cursor")?;
                    self.lead_in(self.start.lead_in_ms)
                }
            }
            State::SeekAdjust(remaining) => {
                screen.clear().context("Failed to clear screen")?;
                self.lead_in(remaining)
            }
            State::Displaying { index, offset } => {
                let cue = match self.cues.get(index) {
                    Some(cue) => cue,
                    None => return self.finish(screen, index),
                };
                screen
                    .render(&cue.text)
                    .context(format!("Failed to render subtitle {}", cue.index))?;
                let visible = cue.duration().saturating_sub(offset);
                if cue.pause.is_some() {
                    (State::Paused(index), visible)
                } else {
                    (
                        State::Displaying {
                            index: index + 1,
                            offset: Duration::ZERO,
                        },
                        visible,
                    )
                }
            }
            State::Paused(index) => {
                screen.clear().context("Failed to clear screen")?;
                let pause = self
                    .cues
                    .get(index)
                    .and_then(|cue| cue.pause)
                    .unwrap_or_default();
                (
                    State::Displaying {
                        index: index + 1,
                        offset: Duration::ZERO,
                    },
                    pause,
                )
            }
            State::Finished => return Ok(None),
        };

        let delay_ms = delay.as_millis() as u64;
        debug!(from = ?self.state, to = ?next, delay_ms, "transition");
        self.state = next;
        Ok(Some(delay))
    }

    /// Steps through the whole sequence in real time.
    pub async fn run<S: Screen>(mut self, screen: &mut S) -> Result<()> {
        while let Some(delay) = self.step(screen)? {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    /// What happens once the countdown is over, or after each blank second
    /// of a long lead-in. Waits are never longer than one tick so the first
    /// screen change comes within a second of the countdown ending.
    fn lead_in(&self, remaining_ms: i64) -> (State, Duration) {
        let index = self.start.index;
        if remaining_ms <= 0 {
            let offset = Duration::from_millis(remaining_ms.unsigned_abs());
            (State::Displaying { index, offset }, Duration::ZERO)
        } else if remaining_ms <= TICK_MS {
            let wait = Duration::from_millis(remaining_ms.unsigned_abs());
            (
                State::Displaying {
                    index,
                    offset: Duration::ZERO,
                },
                wait,
            )
        } else {
            (State::SeekAdjust(remaining_ms - TICK_MS), TICK)
        }
    }

    fn finish<S: Screen>(&mut self, screen: &mut S, index: usize) -> Result<Option<Duration>> {
        screen.clear().context("Failed to clear screen")?;
        info!(index, "finished playback");
        self.state = State::Finished;
        Ok(None)
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Event {
        Render(String),
        Clear,
        HideCursor,
    }

    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub(crate) events: Vec<Event>,
    }

    impl Screen for Recorder {
        fn render(&mut self, text: &str) -> io::Result<()> {
            self.events.push(Event::Render(text.to_string()));
            Ok(())
        }

        fn clear(&mut self) -> io::Result<()> {
            self.events.push(Event::Clear);
            Ok(())
        }

        fn hide_cursor(&mut self) -> io::Result<()> {
            self.events.push(Event::HideCursor);
            Ok(())
        }
    }

    pub(crate) fn cue(index: usize, start: u64, end: u64, text: &str) -> Cue {
        Cue {
            index,
            start: Duration::from_millis(start),
            end: Duration::from_millis(end),
            text: text.to_string(),
            pause: None,
        }
    }

    /// Fills in pauses the way the parser does.
    pub(crate) fn sequence(mut cues: Vec<Cue>) -> Vec<Cue> {
        for i in 1..cues.len() {
            let gap = cues[i].start.checked_sub(cues[i - 1].end);
            cues[i - 1].pause = gap.filter(|gap| !gap.is_zero());
        }
        cues
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn render(text: &str) -> Event {
        Event::Render(text.to_string())
    }

    /// Runs the scheduler to completion, recording each step's delay.
    fn drive(scheduler: &mut Scheduler, screen: &mut Recorder) -> Vec<Duration> {
        let mut delays = Vec::new();
        while let Some(delay) = scheduler.step(screen).unwrap() {
            delays.push(delay);
            assert!(delays.len() < 1000, "scheduler did not terminate");
        }
        delays
    }

    fn three_cues() -> Vec<Cue> {
        sequence(vec![
            cue(1, 0, 2000, "one"),
            cue(2, 2000, 5000, "two"),
            cue(3, 5000, 9000, "three"),
        ])
    }

    #[test]
    fn locate_from_zero_waits_for_first_cue() {
        let cues = sequence(vec![cue(1, 1500, 2000, "a"), cue(2, 3000, 4000, "b")]);

        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();

        assert_eq!(
            start,
            StartPosition {
                index: 0,
                lead_in_ms: 1500
            }
        );
    }

    #[test]
    fn locate_resumes_inside_active_cue() {
        let start = StartPosition::locate(&three_cues(), ms(3000)).unwrap();

        assert_eq!(
            start,
            StartPosition {
                index: 1,
                lead_in_ms: -1000
            }
        );
    }

    #[test]
    fn locate_waits_for_upcoming_cue_in_a_gap() {
        let cues = sequence(vec![cue(1, 0, 1000, "a"), cue(2, 6000, 7000, "b")]);

        let start = StartPosition::locate(&cues, ms(2000)).unwrap();

        assert_eq!(
            start,
            StartPosition {
                index: 1,
                lead_in_ms: 4000
            }
        );
    }

    #[test]
    fn locate_at_exact_end_keeps_that_cue() {
        let start = StartPosition::locate(&three_cues(), ms(2000)).unwrap();

        assert_eq!(start.index, 0);
        assert_eq!(start.lead_in_ms, -2000);
    }

    #[test]
    fn locate_beyond_end_is_an_error() {
        let err = StartPosition::locate(&three_cues(), ms(9001)).unwrap_err();

        assert!(matches!(err, SubpromptError::SeekOutOfRange { .. }));
    }

    #[test]
    fn locate_without_cues_is_an_error() {
        let err = StartPosition::locate(&[], Duration::ZERO).unwrap_err();

        assert!(matches!(err, SubpromptError::NoSubtitles));
    }

    #[test]
    fn countdown_ticks_once_per_second() {
        let cues = sequence(vec![cue(1, 0, 500, "go")]);
        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();
        let mut scheduler = Scheduler::new(cues, start, 3);
        let mut screen = Recorder::default();

        let delays = drive(&mut scheduler, &mut screen);

        assert_eq!(delays, vec![ms(1000), ms(1000), ms(1000), ms(0), ms(500)]);
        assert_eq!(
            screen.events,
            vec![
                render("3"),
                render("2"),
                render("1"),
                render("0"),
                Event::HideCursor,
                render("go"),
                Event::Clear,
            ]
        );
    }

    #[test]
    fn zero_countdown_moves_on_immediately() {
        let cues = sequence(vec![cue(1, 0, 500, "go")]);
        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();
        let mut scheduler = Scheduler::new(cues, start, 0);
        let mut screen = Recorder::default();

        assert_eq!(scheduler.step(&mut screen).unwrap(), Some(Duration::ZERO));
        assert_eq!(
            scheduler.state(),
            State::Displaying {
                index: 0,
                offset: Duration::ZERO
            }
        );
    }

    #[test]
    fn pauses_between_cues_clear_the_screen() {
        let cues = sequence(vec![cue(1, 1000, 4000, "first"), cue(2, 5000, 8000, "second")]);
        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();
        let mut scheduler = Scheduler::new(cues, start, 0);
        let mut screen = Recorder::default();

        let delays = drive(&mut scheduler, &mut screen);

        // lead-in, first, pause, second
        assert_eq!(delays, vec![ms(1000), ms(3000), ms(1000), ms(3000)]);
        assert_eq!(
            screen.events,
            vec![
                render("0"),
                Event::HideCursor,
                render("first"),
                Event::Clear,
                render("second"),
                Event::Clear,
            ]
        );
    }

    #[test]
    fn seek_resumes_with_remaining_time_of_first_cue_only() {
        let start = StartPosition::locate(&three_cues(), ms(3000)).unwrap();
        let mut scheduler = Scheduler::new(three_cues(), start, 0);
        let mut screen = Recorder::default();

        let delays = drive(&mut scheduler, &mut screen);

        assert_eq!(delays, vec![ms(0), ms(2000), ms(4000)]);
        assert_eq!(
            screen.events,
            vec![
                render("0"),
                Event::HideCursor,
                render("two"),
                render("three"),
                Event::Clear,
            ]
        );
    }

    #[test]
    fn long_lead_in_is_split_into_one_second_blanks() {
        let cues = sequence(vec![cue(1, 0, 1000, "a"), cue(2, 6500, 7000, "b")]);
        let start = StartPosition::locate(&cues, ms(3000)).unwrap();
        assert_eq!(start.lead_in_ms, 3500);
        let mut scheduler = Scheduler::new(cues, start, 0);
        let mut screen = Recorder::default();

        let delays = drive(&mut scheduler, &mut screen);

        assert_eq!(delays, vec![ms(1000), ms(1000), ms(1000), ms(500), ms(500)]);
        assert_eq!(delays[..4].iter().sum::<Duration>(), ms(3500));
        assert_eq!(
            screen.events,
            vec![
                render("0"),
                Event::HideCursor,
                Event::Clear,
                Event::Clear,
                Event::Clear,
                render("b"),
                Event::Clear,
            ]
        );
    }

    #[test]
    fn one_second_lead_in_goes_straight_to_display() {
        let cues = sequence(vec![cue(1, 1000, 1500, "on time")]);
        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();
        assert_eq!(start.lead_in_ms, 1000);
        let mut scheduler = Scheduler::new(cues, start, 0);
        let mut screen = Recorder::default();

        assert_eq!(scheduler.step(&mut screen).unwrap(), Some(ms(1000)));
        assert_eq!(
            scheduler.state(),
            State::Displaying {
                index: 0,
                offset: Duration::ZERO
            }
        );

        let delays = drive(&mut scheduler, &mut screen);

        assert_eq!(delays, vec![ms(500)]);
        assert_eq!(
            screen.events,
            vec![
                render("0"),
                Event::HideCursor,
                render("on time"),
                Event::Clear,
            ]
        );
    }

    #[test]
    fn short_lead_in_waits_without_blanking() {
        let cues = sequence(vec![cue(1, 800, 1000, "soon")]);
        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();
        let mut scheduler = Scheduler::new(cues, start, 0);
        let mut screen = Recorder::default();

        assert_eq!(scheduler.step(&mut screen).unwrap(), Some(ms(800)));
        assert_eq!(
            scheduler.state(),
            State::Displaying {
                index: 0,
                offset: Duration::ZERO
            }
        );
    }

    #[test]
    fn finishes_exactly_once() {
        let cues = sequence(vec![cue(1, 0, 100, "only")]);
        let start = StartPosition::locate(&cues, Duration::ZERO).unwrap();
        let mut scheduler = Scheduler::new(cues, start, 0);
        let mut screen = Recorder::default();

        drive(&mut scheduler, &mut screen);
        let events = screen.events.len();

        assert_eq!(scheduler.state(), State::Finished);
        assert_eq!(scheduler.step(&mut screen).unwrap(), None);
        assert_eq!(scheduler.step(&mut screen).unwrap(), None);
        assert_eq!(screen.events.len(), events);
        assert_eq!(
            screen.events.iter().filter(|e| **e == Event::Clear).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_follows_the_timeline() {
        let start = StartPosition::locate(&three_cues(), Duration::ZERO).unwrap();
        let scheduler = Scheduler::new(three_cues(), start, 2);
        let mut screen = Recorder::default();
        let began = tokio::time::Instant::now();

        scheduler.run(&mut screen).await.unwrap();

        // two countdown ticks plus the nine second timeline
        let elapsed = began.elapsed();
        assert!(elapsed >= ms(11_000) && elapsed < ms(11_050), "{:?}", elapsed);
        assert_eq!(screen.events.last(), Some(&Event::Clear));
    }
}
