use chrono::NaiveDate;
use serde::Serialize;

use crate::annotation::{Annotation, AnnotationBox, AnnotationStatus, FormPayload, LayerVisibility};
use crate::config::EngineConfig;
use crate::date::SelectedDate;
use crate::drawing::{DownOutcome, DrawBlock, DrawingSession, UpOutcome};
use crate::export::{export_file_name, ExportRecord};
use crate::geometry::{CoordinateMapper, OverlayGeometry, OverlayRect, PixelRect, Size, ViewportRect};
use crate::loading::{ImageLoadState, ImageLoadTracker};
use crate::playback::{PlaybackController, PlaybackState, Scheduler, TickOutcome, TimerHandle};
use crate::store::AnnotationStore;

/// Whether pixel/domain mapping is currently possible.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum LayoutState {
    /// No layout reported yet.
    Unset,
    Ready(OverlayRect),
    /// The reported layout cannot be mapped; shown to the user as an error.
    Invalid(String),
}

/// Everything a host needs to render the annotation surface.
#[derive(Clone, Debug, Serialize)]
pub struct ViewSnapshot {
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub playback: PlaybackState,
    pub load_state: ImageLoadState,
    pub layout: LayoutState,
    pub drawing: Option<PixelRect>,
    pub pending: Option<PixelRect>,
    pub annotations: Vec<AnnotationBox>,
}

/// The image and overlay a drag was started on. The rectangle is mapped and
/// stored against these, whatever is on screen when the form is submitted.
#[derive(Clone, Debug)]
struct DrawOrigin {
    image_index: usize,
    image_url: String,
    mapper: CoordinateMapper,
}

/// The annotation engine for one view: a list of images for a date, the
/// drawing session, the annotation store and playback.
///
/// Single-threaded; every input (pointer, timer, image load) is a method call.
pub struct AnnotationView {
    config: EngineConfig,
    geometry: OverlayGeometry,
    layout: LayoutState,
    mapper: Option<CoordinateMapper>,
    date: Option<SelectedDate>,
    images: Vec<String>,
    drawing: DrawingSession,
    draw_origin: Option<DrawOrigin>,
    store: AnnotationStore,
    playback: PlaybackController,
    loading: ImageLoadTracker,
    layers: LayerVisibility,
    scheduler: Box<dyn Scheduler>,
}

impl AnnotationView {
    pub fn new(config: EngineConfig, scheduler: Box<dyn Scheduler>) -> Result<Self, String> {
        config.validate()?;
        let geometry = config.overlay_geometry()?;
        Ok(Self {
            geometry,
            layout: LayoutState::Unset,
            mapper: None,
            date: None,
            images: Vec::new(),
            drawing: DrawingSession::new(config.min_draw_size_px),
            draw_origin: None,
            store: AnnotationStore::new(),
            playback: PlaybackController::new(config.playback_period(), config.end_of_list),
            loading: ImageLoadTracker::new(),
            layers: LayerVisibility::default(),
            scheduler,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Date and image list ---

    /// Switch to a new date and its images. Annotations from the previous
    /// date refer to a different image list, so the store is cleared.
    /// Returns false (and changes nothing) if the date is outside the window.
    pub fn select_date(&mut self, date: NaiveDate, image_urls: Vec<String>) -> bool {
        let Some(selected) = self.config.date_window.select(date) else {
            return false;
        };
        log::info!("Loaded {} spectrogram images for {}", image_urls.len(), selected.label);
        self.playback.reset_list(self.scheduler.as_mut(), image_urls.len());
        self.store.clear_all();
        self.discard_drawing();
        self.loading.image_changed(!image_urls.is_empty());
        self.images = image_urls;
        self.date = Some(selected);
        true
    }

    pub fn selected_date(&self) -> Option<&SelectedDate> {
        self.date.as_ref()
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn current_image_index(&self) -> usize {
        self.playback.current_index()
    }

    pub fn current_image_url(&self) -> Option<&str> {
        self.images.get(self.playback.current_index()).map(String::as_str)
    }

    // --- Layout ---

    /// Recompute the overlay after the container or image size changed.
    ///
    /// An unusable layout disables drawing and is kept as
    /// [`LayoutState::Invalid`] so the host can show it.
    pub fn set_layout(&mut self, viewport: ViewportRect, rendered: Size) -> Result<OverlayRect, String> {
        let mapped = self
            .geometry
            .derive(&viewport, rendered)
            .and_then(|overlay| CoordinateMapper::new(overlay, self.config.domain));
        // Rectangles in progress belong to the old overlay.
        let overlay_changed = match (&mapped, &self.mapper) {
            (Ok(new), Some(old)) => new != old,
            _ => true,
        };
        if overlay_changed {
            self.discard_drawing();
        }
        match mapped {
            Ok(mapper) => {
                let overlay = *mapper.overlay();
                self.layout = LayoutState::Ready(overlay);
                self.mapper = Some(mapper);
                Ok(overlay)
            }
            Err(e) => {
                log::warn!("Rejected layout: {e}");
                self.layout = LayoutState::Invalid(e.clone());
                self.mapper = None;
                Err(e)
            }
        }
    }

    pub fn layout(&self) -> &LayoutState {
        &self.layout
    }

    pub fn mapper(&self) -> Option<&CoordinateMapper> {
        self.mapper.as_ref()
    }

    // --- Image load signals ---

    pub fn on_load_start(&mut self) {
        self.loading.on_load_start();
    }

    pub fn on_load_complete(&mut self) {
        self.loading.on_load_complete();
    }

    /// A failed image stops playback; it cannot be drawn on or advanced past.
    pub fn on_load_error(&mut self) {
        log::warn!(
            "Failed to load image: {}",
            self.current_image_url().unwrap_or("<none>")
        );
        self.loading.on_load_error();
        if self.playback.stop(self.scheduler.as_mut()) {
            log::warn!("Playback stopped at unavailable image {}", self.playback.current_index());
        }
    }

    pub fn load_state(&self) -> ImageLoadState {
        self.loading.state()
    }

    // --- Drawing ---

    fn draw_block(&self) -> Option<DrawBlock> {
        if self.mapper.is_none() {
            Some(DrawBlock::NoLayout)
        } else if self.images.is_empty() {
            Some(DrawBlock::NoImage)
        } else if self.playback.is_playing() {
            Some(DrawBlock::Playing)
        } else {
            match self.loading.state() {
                ImageLoadState::Loaded => None,
                ImageLoadState::Failed => Some(DrawBlock::ImageUnavailable),
                ImageLoadState::Loading | ImageLoadState::Idle => Some(DrawBlock::ImageLoading),
            }
        }
    }

    /// Pointer pressed at container coordinates `(x, y)`.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> DownOutcome {
        let block = self.draw_block();
        let Some(mapper) = self.mapper else {
            return DownOutcome::Blocked(DrawBlock::NoLayout);
        };
        let outcome = self.drawing.pointer_down(x, y, mapper.overlay(), block);
        if outcome == DownOutcome::Started {
            let image_index = self.playback.current_index();
            self.draw_origin = Some(DrawOrigin {
                image_index,
                image_url: self.images.get(image_index).cloned().unwrap_or_default(),
                mapper,
            });
        }
        outcome
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<PixelRect> {
        self.drawing.pointer_move(x, y).map(|r| r.normalized())
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> UpOutcome {
        let outcome = self.drawing.pointer_up(x, y);
        self.forget_cancelled(outcome)
    }

    pub fn pointer_leave(&mut self, x: f64, y: f64) -> UpOutcome {
        let outcome = self.drawing.pointer_leave(x, y);
        self.forget_cancelled(outcome)
    }

    fn forget_cancelled(&mut self, outcome: UpOutcome) -> UpOutcome {
        if outcome == UpOutcome::Cancelled {
            self.draw_origin = None;
        }
        outcome
    }

    /// Drop the drag or pending rectangle, if any.
    fn discard_drawing(&mut self) -> bool {
        self.draw_origin = None;
        let discarded = self.drawing.cancel();
        if discarded {
            log::debug!("Discarded unfinished rectangle");
        }
        discarded
    }

    /// Live drag rectangle, normalized.
    pub fn live_rect(&self) -> Option<PixelRect> {
        self.drawing.live_rect()
    }

    /// Rectangle waiting for the metadata form.
    pub fn pending_rect(&self) -> Option<PixelRect> {
        self.drawing.pending()
    }

    /// Submit the metadata form for the pending rectangle and store the
    /// annotation against the image and overlay it was drawn on.
    ///
    /// `None` means nothing was pending: the form was discarded, or the
    /// rectangle was dropped because the image or layout changed under it.
    pub fn submit(&mut self, form: FormPayload) -> Option<Annotation> {
        let rect = self.drawing.take_pending()?;
        let origin = self.draw_origin.take()?;
        let metadata = form.resolve(&self.config.default_author);
        self.store
            .create(
                rect,
                metadata,
                origin.image_index,
                &origin.image_url,
                &origin.mapper,
                self.config.min_draw_size_px,
            )
            .cloned()
    }

    /// Close the metadata form without creating anything.
    pub fn discard_pending(&mut self) -> bool {
        self.discard_drawing()
    }

    // --- Store ---

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn delete_annotation(&mut self, id: &str) -> bool {
        self.store.delete(id)
    }

    pub fn clear_annotations(&mut self) -> usize {
        self.store.clear_all()
    }

    pub fn edit_annotation(&mut self, id: &str, form: FormPayload) -> bool {
        let metadata = form.resolve(&self.config.default_author);
        self.store.update_metadata(id, metadata)
    }

    pub fn set_annotation_status(&mut self, id: &str, status: AnnotationStatus) -> bool {
        self.store.set_status(id, status)
    }

    pub fn set_layers(&mut self, layers: LayerVisibility) {
        self.layers = layers;
    }

    pub fn layers(&self) -> LayerVisibility {
        self.layers
    }

    /// Visible annotations on the image currently shown.
    pub fn current_annotations(&self) -> Vec<&Annotation> {
        self.store.visible(self.playback.current_index(), &self.layers)
    }

    // --- Playback and navigation ---

    fn after_index_change(&mut self, before: usize) {
        if self.playback.current_index() != before {
            self.loading.image_changed(!self.images.is_empty());
            self.discard_drawing();
        }
    }

    pub fn start_playback(&mut self) -> bool {
        let before = self.playback.current_index();
        let started = self.playback.start(self.scheduler.as_mut(), self.loading.is_busy());
        if started {
            self.discard_drawing();
        }
        self.after_index_change(before);
        started
    }

    pub fn stop_playback(&mut self) -> bool {
        self.playback.stop(self.scheduler.as_mut())
    }

    pub fn toggle_playback(&mut self) -> bool {
        if self.playback.is_playing() {
            self.stop_playback();
        } else {
            self.start_playback();
        }
        self.playback.is_playing()
    }

    /// Timer callback for `handle`.
    pub fn tick(&mut self, handle: TimerHandle) -> TickOutcome {
        let before = self.playback.current_index();
        let blocked = !self.loading.is_available();
        let outcome = self.playback.tick(self.scheduler.as_mut(), handle, blocked);
        self.after_index_change(before);
        outcome
    }

    pub fn previous_image(&mut self) -> Option<usize> {
        let before = self.playback.current_index();
        let moved = self.playback.go_to_previous(self.loading.is_busy());
        self.after_index_change(before);
        moved
    }

    pub fn next_image(&mut self) -> Option<usize> {
        let before = self.playback.current_index();
        let moved = self.playback.go_to_next(self.loading.is_busy());
        self.after_index_change(before);
        moved
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn playback_timer(&self) -> Option<TimerHandle> {
        self.playback.timer()
    }

    // --- Output ---

    /// Export document for the current date, or `None` when there is nothing to export.
    pub fn export(&self) -> Option<ExportRecord> {
        let label = self.date.as_ref().map(|d| d.label.as_str()).unwrap_or("unknown");
        ExportRecord::from_store(&self.store, label, &self.images)
    }

    /// Suggested download name for [`export`](Self::export).
    pub fn export_file_name(&self) -> String {
        export_file_name(self.date.as_ref().map(|d| d.label.as_str()).unwrap_or("unknown"))
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            date: self.date.as_ref().map(|d| d.label.clone()),
            image_url: self.current_image_url().map(str::to_string),
            playback: self.playback.state(),
            load_state: self.loading.state(),
            layout: self.layout.clone(),
            drawing: self.drawing.live_rect(),
            pending: self.drawing.pending(),
            annotations: self.current_annotations().into_iter().map(AnnotationBox::from).collect(),
        }
    }
}

impl Drop for AnnotationView {
    fn drop(&mut self) {
        self.playback.stop(self.scheduler.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::ManualScheduler;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Shares a ManualScheduler with the test so it can observe timers.
    #[derive(Clone, Default)]
    struct SharedScheduler(Rc<RefCell<ManualScheduler>>);

    impl Scheduler for SharedScheduler {
        fn schedule_repeating(&mut self, period: Duration) -> Result<TimerHandle, String> {
            self.0.borrow_mut().schedule_repeating(period)
        }

        fn cancel(&mut self, handle: TimerHandle) {
            self.0.borrow_mut().cancel(handle)
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.org/2024-05-01/{i}.png")).collect()
    }

    /// Config whose overlay lands at {100, 50, 800, 600} in a 1000x700 container.
    fn scenario_config() -> EngineConfig {
        EngineConfig {
            original_image: Size::new(1000.0, 700.0),
            plot_bbox: PixelRect::new(100.0, 50.0, 800.0, 600.0),
            ..Default::default()
        }
    }

    fn ready_view(n: usize) -> (AnnotationView, SharedScheduler) {
        let sched = SharedScheduler::default();
        let mut view = AnnotationView::new(scenario_config(), Box::new(sched.clone())).unwrap();
        view.set_layout(PixelRect::new(0.0, 0.0, 1000.0, 700.0), Size::new(1000.0, 700.0))
            .unwrap();
        assert!(view.select_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), urls(n)));
        view.on_load_complete();
        (view, sched)
    }

    fn form(species: &str) -> FormPayload {
        FormPayload {
            species: species.to_string(),
            call_type: "song".to_string(),
            ..Default::default()
        }
    }

    fn draw(view: &mut AnnotationView, from: (f64, f64), to: (f64, f64), species: &str) -> Option<Annotation> {
        assert_eq!(view.pointer_down(from.0, from.1), DownOutcome::Started);
        view.pointer_move((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
        match view.pointer_up(to.0, to.1) {
            UpOutcome::Committing(_) => view.submit(form(species)),
            _ => None,
        }
    }

    #[test]
    fn test_full_overlay_drag_covers_domain() {
        let (mut view, _) = ready_view(3);
        let a = draw(&mut view, (100.0, 50.0), (900.0, 650.0), "blue-whale").unwrap();
        assert_eq!(a.start_time, 0.0);
        assert_eq!(a.end_time, 3600.0);
        assert_eq!(a.start_frequency, 0.0);
        assert_eq!(a.end_frequency, 8000.0);
        assert_eq!(a.metadata.author, "Anonymous");
        assert_eq!(a.image_index, 0);
        assert_eq!(a.source_image_url, "https://example.org/2024-05-01/0.png");
    }

    #[test]
    fn test_press_outside_overlay_ignored() {
        let (mut view, _) = ready_view(3);
        assert_eq!(view.pointer_down(0.0, 0.0), DownOutcome::OutsideOverlay);
        assert_eq!(view.pointer_up(500.0, 500.0), UpOutcome::Ignored);
        assert!(view.store().is_empty());
    }

    #[test]
    fn test_small_drag_creates_nothing() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(300.0, 300.0);
        assert_eq!(view.pointer_up(305.0, 400.0), UpOutcome::Cancelled);
        assert_eq!(view.submit(form("x")), None);
        assert!(view.store().is_empty());
    }

    #[test]
    fn test_discard_pending_has_no_effect() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(300.0, 300.0);
        view.pointer_up(400.0, 400.0);
        assert!(view.pending_rect().is_some());
        assert!(view.discard_pending());
        assert_eq!(view.submit(form("x")), None);
        assert!(view.store().is_empty());
    }

    #[test]
    fn test_per_image_partition() {
        let (mut view, _) = ready_view(3);
        for i in 0..3 {
            let x = 150.0 + i as f64 * 100.0;
            draw(&mut view, (x, 100.0), (x + 50.0, 200.0), "fin-whale").unwrap();
        }
        assert_eq!(view.next_image(), Some(1));
        view.on_load_complete();
        for i in 0..2 {
            let x = 150.0 + i as f64 * 100.0;
            draw(&mut view, (x, 100.0), (x + 50.0, 200.0), "humpback-whale").unwrap();
        }
        let on_one = view.store().by_image(1);
        assert_eq!(on_one.len(), 2);
        assert!(on_one.iter().all(|a| a.image_index == 1));
        assert_eq!(view.current_annotations().len(), 2);
        assert_eq!(view.store().by_image(0).len(), 3);
    }

    #[test]
    fn test_drawing_blocked_while_loading_and_playing() {
        let (mut view, _) = ready_view(3);
        view.on_load_start();
        assert_eq!(view.pointer_down(300.0, 300.0), DownOutcome::Blocked(DrawBlock::ImageLoading));
        view.on_load_error();
        assert_eq!(view.pointer_down(300.0, 300.0), DownOutcome::Blocked(DrawBlock::ImageUnavailable));
        view.on_load_complete();
        assert!(view.start_playback());
        assert_eq!(view.pointer_down(300.0, 300.0), DownOutcome::Blocked(DrawBlock::Playing));
    }

    #[test]
    fn test_no_layout_blocks_drawing() {
        let sched = SharedScheduler::default();
        let mut view = AnnotationView::new(scenario_config(), Box::new(sched)).unwrap();
        view.select_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), urls(2));
        view.on_load_complete();
        assert_eq!(view.pointer_down(300.0, 300.0), DownOutcome::Blocked(DrawBlock::NoLayout));
    }

    #[test]
    fn test_invalid_layout_is_reported() {
        let (mut view, _) = ready_view(2);
        let err = view.set_layout(PixelRect::new(0.0, 0.0, 0.0, 0.0), Size::new(1000.0, 700.0));
        assert!(err.is_err());
        assert!(matches!(view.layout(), LayoutState::Invalid(_)));
        assert_eq!(view.pointer_down(300.0, 300.0), DownOutcome::Blocked(DrawBlock::NoLayout));
    }

    #[test]
    fn test_playback_runs_to_end_and_resets() {
        let (mut view, sched) = ready_view(4);
        view.next_image();
        view.on_load_complete();
        assert!(view.start_playback());
        assert_eq!(view.current_image_index(), 0);
        let handle = view.playback_timer().unwrap();

        // Index went from 1 back to 0, so the image is loading again.
        assert_eq!(view.tick(handle), TickOutcome::Skipped);
        view.on_load_complete();

        let mut advanced = 0;
        loop {
            match view.tick(handle) {
                TickOutcome::Advanced(_) => {
                    advanced += 1;
                    assert_eq!(view.tick(handle), TickOutcome::Skipped);
                    view.on_load_complete();
                }
                TickOutcome::Finished => break,
                other => panic!("unexpected tick outcome {other:?}"),
            }
        }
        assert_eq!(advanced, 3);
        assert!(!view.playback_state().is_playing);
        assert_eq!(view.current_image_index(), 0);
        assert_eq!(sched.0.borrow().active_count(), 0);
    }

    #[test]
    fn test_new_date_clears_store_and_stops_timer() {
        let (mut view, sched) = ready_view(3);
        draw(&mut view, (150.0, 100.0), (250.0, 200.0), "gray-whale").unwrap();
        view.start_playback();
        let old = view.playback_timer().unwrap();

        assert!(view.select_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), urls(5)));
        assert!(view.store().is_empty());
        assert!(!view.playback_state().is_playing);
        assert!(!sched.0.borrow().is_active(old));
        assert_eq!(view.tick(old), TickOutcome::Stale);
        assert_eq!(view.playback_state().image_count, 5);
        assert_eq!(view.selected_date().unwrap().label, "2024-05-02");
    }

    #[test]
    fn test_out_of_window_date_rejected() {
        let (mut view, _) = ready_view(3);
        assert!(!view.select_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), urls(9)));
        assert_eq!(view.images().len(), 3);
    }

    #[test]
    fn test_export_and_empty_export() {
        let (mut view, _) = ready_view(3);
        assert!(view.export().is_none());
        draw(&mut view, (150.0, 100.0), (250.0, 200.0), "gray-whale").unwrap();
        let record = view.export().unwrap();
        assert_eq!(record.date, "2024-05-01");
        assert_eq!(record.images[&0].annotations.len(), 1);
        assert_eq!(view.export_file_name(), "annotations-2024-05-01.json");
    }

    #[test]
    fn test_edit_and_delete() {
        let (mut view, _) = ready_view(3);
        let a = draw(&mut view, (150.0, 100.0), (250.0, 200.0), "gray-whale").unwrap();
        let edit = FormPayload {
            species: "fin-whale".into(),
            call_type: "other".into(),
            custom_call_type: "pulse train".into(),
            author: "lee".into(),
            ..Default::default()
        };
        assert!(view.edit_annotation(&a.id, edit));
        assert!(view.set_annotation_status(&a.id, AnnotationStatus::Approved));
        let stored = view.store().get(&a.id).unwrap();
        assert_eq!(stored.metadata.call_type, "pulse train");
        assert_eq!(stored.metadata.author, "lee");

        view.set_layers(LayerVisibility { approved: false, ..Default::default() });
        assert!(view.current_annotations().is_empty());
        assert!(view.delete_annotation(&a.id));
        assert!(!view.delete_annotation(&a.id));
    }

    #[test]
    fn test_drop_cancels_timer() {
        let (mut view, sched) = ready_view(3);
        view.start_playback();
        assert_eq!(sched.0.borrow().active_count(), 1);
        drop(view);
        assert_eq!(sched.0.borrow().active_count(), 0);
    }

    #[test]
    fn test_snapshot_reflects_drag() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(200.0, 200.0);
        view.pointer_move(-50.0, 100.0);
        let snap = view.snapshot();
        assert_eq!(snap.drawing, Some(PixelRect::new(100.0, 100.0, 100.0, 100.0)));
        assert_eq!(snap.playback.progress(), Some((1, 3)));
        assert_eq!(snap.load_state, ImageLoadState::Loaded);
        assert!(serde_json::to_string(&snap).is_ok());
    }

    #[test]
    fn test_pending_rect_dropped_on_navigation() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(200.0, 200.0);
        assert!(matches!(view.pointer_up(300.0, 300.0), UpOutcome::Committing(_)));
        assert_eq!(view.next_image(), Some(1));
        assert_eq!(view.pending_rect(), None);
        assert_eq!(view.submit(form("fin-whale")), None);
        assert!(view.store().by_image(1).is_empty());
        assert!(view.store().is_empty());
    }

    #[test]
    fn test_pending_rect_keeps_image_it_was_drawn_on() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(200.0, 200.0);
        view.pointer_up(300.0, 300.0);
        // Same overlay reported again: the form stays open.
        view.set_layout(PixelRect::new(0.0, 0.0, 1000.0, 700.0), Size::new(1000.0, 700.0))
            .unwrap();
        let a = view.submit(form("fin-whale")).unwrap();
        assert_eq!(a.image_index, 0);
        assert_eq!(a.source_image_url, "https://example.org/2024-05-01/0.png");
    }

    #[test]
    fn test_pending_rect_dropped_on_resize() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(100.0, 50.0);
        view.pointer_up(900.0, 650.0);
        view.set_layout(PixelRect::new(0.0, 0.0, 500.0, 350.0), Size::new(500.0, 350.0))
            .unwrap();
        assert_eq!(view.pending_rect(), None);
        assert_eq!(view.submit(form("blue-whale")), None);

        // Drawn again in the new overlay, it still spans the whole domain.
        let a = draw(&mut view, (50.0, 25.0), (450.0, 325.0), "blue-whale").unwrap();
        assert_eq!((a.start_time, a.end_time), (0.0, 3600.0));
        assert_eq!((a.start_frequency, a.end_frequency), (0.0, 8000.0));
    }

    #[test]
    fn test_invalid_layout_discards_pending_rect() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(200.0, 200.0);
        view.pointer_up(300.0, 300.0);
        assert!(view.set_layout(PixelRect::new(0.0, 0.0, 0.0, 0.0), Size::new(1000.0, 700.0)).is_err());
        assert_eq!(view.snapshot().pending, None);
        assert_eq!(view.submit(form("x")), None);
        assert!(view.store().is_empty());
    }

    #[test]
    fn test_starting_playback_closes_form() {
        let (mut view, _) = ready_view(3);
        view.pointer_down(200.0, 200.0);
        view.pointer_up(300.0, 300.0);
        assert!(view.start_playback());
        assert_eq!(view.pending_rect(), None);
        assert_eq!(view.submit(form("x")), None);
    }

    #[test]
    fn test_failed_image_stops_playback() {
        let (mut view, sched) = ready_view(3);
        assert!(view.start_playback());
        let handle = view.playback_timer().unwrap();
        assert_eq!(view.tick(handle), TickOutcome::Advanced(1));
        view.on_load_error();

        // Playback stops rather than stalling on the unavailable image.
        assert!(!view.playback_state().is_playing);
        assert_eq!(sched.0.borrow().active_count(), 0);
        assert_eq!(view.tick(handle), TickOutcome::Stale);
        assert_eq!(view.current_image_index(), 1);
        assert_eq!(view.load_state(), ImageLoadState::Failed);

        // Manual navigation still moves past it.
        assert_eq!(view.next_image(), Some(2));
    }

    #[test]
    fn test_snapshot_carries_display_fields() {
        let (mut view, _) = ready_view(3);
        let a = draw(&mut view, (100.0, 50.0), (900.0, 650.0), "blue-whale").unwrap();
        view.set_annotation_status(&a.id, AnnotationStatus::Approved);
        let snap = view.snapshot();
        let shown = &snap.annotations[0];
        assert_eq!(shown.display_label, "Blue Whale - Song");
        assert_eq!(shown.status_label, "Admin Approved");
        assert_eq!(shown.color, "#248600");
        assert_eq!(shown.duration_seconds, 3600.0);

        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();
        let first = &json["annotations"][0];
        assert_eq!(first["status"], "approved");
        assert_eq!(first["status_label"], "Admin Approved");
        assert_eq!(first["bandwidth_hz"], 8000.0);
        assert_eq!(first["image_index"], 0);
    }
}
