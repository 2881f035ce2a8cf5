use std::path::Path;
use std::time::Duration;

use hydrotag_core::date::parse_date;
use hydrotag_core::{
    AnnotationStatus, AnnotationView, EngineConfig, FormPayload, ImageLoadState, ManualScheduler,
    PixelRect, Scheduler, Size, TickOutcome, TimerHandle,
};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::timer::TokioScheduler;

/// A recorded annotation session.
#[derive(Debug, Deserialize)]
pub struct Script {
    pub date: String,
    pub images: Vec<String>,
    pub viewport: PixelRect,
    /// Rendered image size; defaults to the viewport size.
    #[serde(default)]
    pub rendered: Option<Size>,
    /// Complete every image load immediately instead of waiting for
    /// `load_complete` events.
    #[serde(default = "default_auto_load")]
    pub auto_load: bool,
    pub events: Vec<Event>,
}

fn default_auto_load() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    PointerLeave { x: f64, y: f64 },
    Submit { #[serde(default)] form: FormPayload },
    Discard,
    /// Delete by id, or by position in creation order.
    Delete { #[serde(default)] id: Option<String>, #[serde(default)] index: Option<usize> },
    SetStatus { index: usize, status: AnnotationStatus },
    Clear,
    Play,
    Stop,
    Next,
    Previous,
    LoadStart,
    LoadComplete,
    LoadError,
    Tick,
    Wait { ms: u64 },
}

pub fn load_script(path: &Path) -> Result<Script, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

/// Where timer ticks come from during a replay.
enum Clock {
    /// `tick` and `wait` events deliver ticks synchronously.
    Manual,
    /// Real tokio intervals; `wait` sleeps and handles ticks as they arrive.
    Realtime(UnboundedReceiver<TimerHandle>),
}

pub struct Replay {
    view: AnnotationView,
    clock: Clock,
    auto_load: bool,
}

impl Replay {
    pub fn new(config: EngineConfig, script: &Script, realtime: bool) -> Result<Self, String> {
        let (scheduler, clock): (Box<dyn Scheduler>, Clock) = if realtime {
            let (tx, rx) = mpsc::unbounded_channel();
            (Box::new(TokioScheduler::new(tx)), Clock::Realtime(rx))
        } else {
            (Box::new(ManualScheduler::new()), Clock::Manual)
        };
        let mut view = AnnotationView::new(config, scheduler)?;

        let rendered = script
            .rendered
            .unwrap_or(Size::new(script.viewport.width, script.viewport.height));
        view.set_layout(script.viewport, rendered)?;

        let date = parse_date(&script.date)?;
        if !view.select_date(date, script.images.clone()) {
            return Err(format!(
                "Date {} is outside the configured window {}..={}",
                script.date,
                view.config().date_window.min,
                view.config().date_window.max
            ));
        }

        let mut replay = Self { view, clock, auto_load: script.auto_load };
        replay.settle_load();
        Ok(replay)
    }

    pub fn view(&self) -> &AnnotationView {
        &self.view
    }

    /// Stand in for the browser finishing the image fetch.
    fn settle_load(&mut self) {
        if self.auto_load && self.view.load_state() == ImageLoadState::Loading {
            self.view.on_load_complete();
        }
    }

    fn handle_tick(&mut self, handle: TimerHandle) {
        let outcome = self.view.tick(handle);
        match outcome {
            TickOutcome::Advanced(i) => tracing::info!("Playback: image {}", i + 1),
            TickOutcome::Finished => tracing::info!("Playback finished"),
            TickOutcome::Skipped => tracing::debug!("Tick skipped while image loads"),
            TickOutcome::Stale | TickOutcome::Looped => tracing::debug!("Tick: {outcome:?}"),
        }
        self.settle_load();
    }

    fn tick_now(&mut self) {
        if let Some(handle) = self.view.playback_timer() {
            self.handle_tick(handle);
        }
    }

    async fn wait(&mut self, ms: u64) {
        if matches!(self.clock, Clock::Manual) {
            let period_ms = self.view.config().playback_period_ms.max(1);
            for _ in 0..(ms / period_ms) {
                self.tick_now();
            }
            return;
        }
        let deadline = tokio::time::sleep(Duration::from_millis(ms));
        tokio::pin!(deadline);
        loop {
            let received = {
                let Clock::Realtime(rx) = &mut self.clock else { break };
                tokio::select! {
                    _ = &mut deadline => None,
                    handle = rx.recv() => handle,
                }
            };
            match received {
                Some(handle) => self.handle_tick(handle),
                None => break,
            }
        }
    }

    pub async fn run(&mut self, events: &[Event]) {
        for event in events {
            self.apply(event).await;
        }
    }

    async fn apply(&mut self, event: &Event) {
        tracing::debug!("Event: {event:?}");
        match event {
            Event::PointerDown { x, y } => {
                let outcome = self.view.pointer_down(*x, *y);
                tracing::debug!("pointer_down -> {outcome:?}");
            }
            Event::PointerMove { x, y } => {
                self.view.pointer_move(*x, *y);
            }
            Event::PointerUp { x, y } => {
                let outcome = self.view.pointer_up(*x, *y);
                tracing::debug!("pointer_up -> {outcome:?}");
            }
            Event::PointerLeave { x, y } => {
                self.view.pointer_leave(*x, *y);
            }
            Event::Submit { form } => {
                if self.view.submit(form.clone()).is_none() {
                    tracing::warn!("Submit ignored: no pending rectangle");
                }
            }
            Event::Discard => {
                self.view.discard_pending();
            }
            Event::Delete { id, index } => {
                let target = id.clone().or_else(|| {
                    index.and_then(|i| self.view.store().as_slice().get(i).map(|a| a.id.clone()))
                });
                match target {
                    Some(id) if self.view.delete_annotation(&id) => {}
                    _ => tracing::warn!("Delete ignored: no such annotation"),
                }
            }
            Event::SetStatus { index, status } => {
                let id = self.view.store().as_slice().get(*index).map(|a| a.id.clone());
                if !id.is_some_and(|id| self.view.set_annotation_status(&id, *status)) {
                    tracing::warn!("Status change ignored: no annotation at {index}");
                }
            }
            Event::Clear => {
                self.view.clear_annotations();
            }
            Event::Play => {
                if !self.view.start_playback() {
                    tracing::warn!("Playback not started");
                }
                self.settle_load();
            }
            Event::Stop => {
                self.view.stop_playback();
            }
            Event::Next => {
                self.view.next_image();
                self.settle_load();
            }
            Event::Previous => {
                self.view.previous_image();
                self.settle_load();
            }
            Event::LoadStart => self.view.on_load_start(),
            Event::LoadComplete => self.view.on_load_complete(),
            Event::LoadError => self.view.on_load_error(),
            Event::Tick => self.tick_now(),
            Event::Wait { ms } => self.wait(*ms).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "date": "2024-05-01",
        "images": ["a.png", "b.png", "c.png"],
        "viewport": {"left": 0, "top": 0, "width": 1000, "height": 700},
        "events": [
            {"type": "pointer_down", "x": 100, "y": 50},
            {"type": "pointer_move", "x": 400, "y": 300},
            {"type": "pointer_up", "x": 900, "y": 650},
            {"type": "submit", "form": {"species": "blue-whale", "call_type": "song"}},
            {"type": "next"},
            {"type": "pointer_down", "x": 200, "y": 200},
            {"type": "pointer_leave", "x": 5000, "y": 260},
            {"type": "submit", "form": {"species": "fin-whale", "call_type": "other", "custom_call_type": "pulse"}},
            {"type": "pointer_down", "x": 300, "y": 300},
            {"type": "pointer_up", "x": 302, "y": 302},
            {"type": "submit"},
            {"type": "play"},
            {"type": "wait", "ms": 10000}
        ]
    }"#;

    fn config() -> EngineConfig {
        EngineConfig {
            original_image: Size::new(1000.0, 700.0),
            plot_bbox: PixelRect::new(100.0, 50.0, 800.0, 600.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_manual_replay() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        let mut replay = Replay::new(config(), &script, false).unwrap();
        replay.run(&script.events).await;

        let view = replay.view();
        assert_eq!(view.store().len(), 2);
        let first = &view.store().as_slice()[0];
        assert_eq!(first.image_index, 0);
        assert_eq!(first.end_time, 3600.0);
        let second = &view.store().as_slice()[1];
        assert_eq!(second.image_index, 1);
        assert_eq!(second.metadata.call_type, "pulse");
        assert_eq!(second.pixel_rect.right(), 900.0);

        // Five periods over three images: two advances, then stop and reset.
        let state = view.playback_state();
        assert!(!state.is_playing);
        assert_eq!(state.current_image_index, 0);

        let record = view.export().unwrap();
        assert_eq!(record.images.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_window_date_fails() {
        let mut script: Script = serde_json::from_str(SCRIPT).unwrap();
        script.date = "2019-01-01".to_string();
        assert!(Replay::new(config(), &script, false).is_err());
    }
}
