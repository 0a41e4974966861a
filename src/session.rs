use crate::scheduler::Scheduler;
use crate::screen::Screen;

use anyhow::{anyhow, Result};
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// Owns the one playback that may be running. Loading new subtitles cancels
/// whatever was playing before, so no timer from an earlier load can fire
/// afterwards.
#[derive(Debug, Default)]
pub struct Session {
    playback: Option<JoinHandle<Result<()>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<S>(&mut self, scheduler: Scheduler, mut screen: S)
    where
        S: Screen + Send + 'static,
    {
        self.cancel();
        info!(state = ?scheduler.state(), "starting playback");
        self.playback = Some(tokio::spawn(async move {
            scheduler.run(&mut screen).await
        }));
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Waits for the current playback to run to its end.
    pub async fn wait(&mut self) -> Result<()> {
        let outcome = match self.playback.as_mut() {
            Some(handle) => handle.await,
            None => return Ok(()),
        };
        self.playback = None;
        finished(outcome)
    }

    /// Cancels the current playback and waits until it has been torn down.
    pub async fn stop(&mut self) -> Result<()> {
        match self.playback.take() {
            Some(handle) => {
                handle.abort();
                finished(handle.await)
            }
            None => Ok(()),
        }
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.playback.take() {
            if !handle.is_finished() {
                warn!("cancelling previous playback");
            }
            handle.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn finished(outcome: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match outcome {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => Err(anyhow!("Playback task failed: {}", err)),
    }
}
