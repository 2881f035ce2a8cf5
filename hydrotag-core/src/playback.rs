use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies one scheduled repeating timer. Ticks carry the handle of the
/// timer that produced them so ticks from a cancelled timer can be ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// Host-side repeating timer.
///
/// Implementations call back into the engine with the handle on every period
/// until [`cancel`](Scheduler::cancel) is called for it. An `Err` means no
/// timer is running.
pub trait Scheduler {
    fn schedule_repeating(&mut self, period: Duration) -> Result<TimerHandle, String>;
    fn cancel(&mut self, handle: TimerHandle);
}

/// Scheduler that only records requests; the caller delivers ticks by hand.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    active: Vec<(TimerHandle, Duration)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.active.iter().any(|(h, _)| *h == handle)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn period_of(&self, handle: TimerHandle) -> Option<Duration> {
        self.active.iter().find(|(h, _)| *h == handle).map(|(_, p)| *p)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> Result<TimerHandle, String> {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.active.push((handle, period));
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.active.retain(|(h, _)| *h != handle);
    }
}

/// What happens when playback runs past the last image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfList {
    /// Stop the timer and show the first image again.
    #[default]
    StopAndReset,
    /// Wrap to the first image and keep playing.
    Loop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub current_image_index: usize,
    pub is_playing: bool,
    pub image_count: usize,
}

impl PlaybackState {
    /// 1-based position for display, e.g. `(3, 24)`.
    pub fn progress(&self) -> Option<(usize, usize)> {
        (self.image_count > 0).then(|| (self.current_image_index + 1, self.image_count))
    }

    pub fn progress_fraction(&self) -> f64 {
        match self.progress() {
            Some((pos, count)) => pos as f64 / count as f64,
            None => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick from a timer that is no longer ours.
    Stale,
    /// The current image is not ready; index unchanged.
    Skipped,
    Advanced(usize),
    /// Ran off the end with [`EndOfList::StopAndReset`].
    Finished,
    /// Ran off the end with [`EndOfList::Loop`].
    Looped,
}

/// Timer-driven cursor over the image list.
#[derive(Clone, Debug)]
pub struct PlaybackController {
    period: Duration,
    end_of_list: EndOfList,
    image_count: usize,
    current: usize,
    timer: Option<TimerHandle>,
}

impl PlaybackController {
    pub fn new(period: Duration, end_of_list: EndOfList) -> Self {
        Self {
            period,
            end_of_list,
            image_count: 0,
            current: 0,
            timer: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_image_index: self.current,
            is_playing: self.is_playing(),
            image_count: self.image_count,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn is_playing(&self) -> bool {
        self.timer.is_some()
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// A new image list replaced the old one: stop and go back to the start.
    pub fn reset_list(&mut self, scheduler: &mut dyn Scheduler, image_count: usize) {
        self.stop(scheduler);
        self.image_count = image_count;
        self.current = 0;
    }

    /// Begin playback from the first image. No-op when there are no images,
    /// the current image is still loading, playback is already running, or
    /// the scheduler could not start a timer.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler, image_loading: bool) -> bool {
        if self.image_count == 0 || image_loading || self.is_playing() {
            return false;
        }
        let handle = match scheduler.schedule_repeating(self.period) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("Playback not started: {e}");
                return false;
            }
        };
        self.current = 0;
        self.timer = Some(handle);
        log::info!(
            "Playback started over {} images every {:?}",
            self.image_count,
            self.period
        );
        true
    }

    /// Cancel the timer. Safe to call when not playing.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        match self.timer.take() {
            Some(handle) => {
                scheduler.cancel(handle);
                log::debug!("Playback stopped at image {}", self.current);
                true
            }
            None => false,
        }
    }

    /// Timer callback. `advance_blocked` is true while the current image is
    /// loading or failed to load.
    pub fn tick(
        &mut self,
        scheduler: &mut dyn Scheduler,
        handle: TimerHandle,
        advance_blocked: bool,
    ) -> TickOutcome {
        if self.timer != Some(handle) {
            return TickOutcome::Stale;
        }
        if advance_blocked {
            log::debug!("Playback tick skipped: image {} not ready", self.current);
            return TickOutcome::Skipped;
        }
        let next = self.current + 1;
        if next < self.image_count {
            self.current = next;
            return TickOutcome::Advanced(next);
        }
        self.current = 0;
        match self.end_of_list {
            EndOfList::StopAndReset => {
                self.stop(scheduler);
                log::info!("Playback finished");
                TickOutcome::Finished
            }
            EndOfList::Loop => TickOutcome::Looped,
        }
    }

    /// Step back one image, wrapping to the end. Disabled while playing or loading.
    pub fn go_to_previous(&mut self, image_loading: bool) -> Option<usize> {
        if self.image_count == 0 || image_loading || self.is_playing() {
            return None;
        }
        self.current = if self.current > 0 { self.current - 1 } else { self.image_count - 1 };
        Some(self.current)
    }

    /// Step forward one image, wrapping to the start. Disabled while playing or loading.
    pub fn go_to_next(&mut self, image_loading: bool) -> Option<usize> {
        if self.image_count == 0 || image_loading || self.is_playing() {
            return None;
        }
        self.current = if self.current + 1 < self.image_count { self.current + 1 } else { 0 };
        Some(self.current)
    }
}
