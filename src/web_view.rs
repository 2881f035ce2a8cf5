use std::cell::RefCell;
use std::rc::Rc;

use hydrotag_core::catalog::{CALL_TYPES, SPECIES};
use hydrotag_core::date::parse_date;
use hydrotag_core::geometry::to_container;
use hydrotag_core::{
    AnnotationStatus, AnnotationView, DownOutcome, EngineConfig, FormPayload, LayerVisibility,
    PixelRect, Size, UpOutcome,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::download::download_text;
use crate::interval::{IntervalScheduler, TickTarget};

fn js_err(e: String) -> JsValue {
    JsValue::from_str(&e)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| js_err(format!("Serialize error: {e}")))?;
    js_sys::JSON::parse(&json)
}

fn parse_form(form_json: &str) -> Result<FormPayload, JsValue> {
    serde_json::from_str(form_json).map_err(|e| js_err(format!("Invalid form: {e}")))
}

fn element_rect(el: &web_sys::Element) -> PixelRect {
    let r = el.get_bounding_client_rect();
    PixelRect::new(r.left(), r.top(), r.width(), r.height())
}

/// Mouse position relative to the container's top-left corner.
fn container_point(ev: &web_sys::MouseEvent, container: &web_sys::Element) -> (f64, f64) {
    to_container(ev.client_x() as f64, ev.client_y() as f64, &element_rect(container))
}

#[derive(Serialize)]
struct Choice {
    value: &'static str,
    name: &'static str,
}

fn choices(table: &'static [(&'static str, &'static str)]) -> Vec<Choice> {
    table.iter().map(|&(value, name)| Choice { value, name }).collect()
}

/// Annotation view for a page: feeds DOM events into the engine and hands
/// state back as plain JS objects.
#[wasm_bindgen]
pub struct WebAnnotationView {
    view: Rc<RefCell<AnnotationView>>,
    target: TickTarget,
}

#[wasm_bindgen]
impl WebAnnotationView {
    /// `config_json` is an engine config in JSON; defaults are used when absent.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WebAnnotationView, JsValue> {
        let config = match config_json {
            Some(text) => EngineConfig::from_json_str(&text).map_err(js_err)?,
            None => EngineConfig::default(),
        };
        let target = TickTarget::default();
        let scheduler = IntervalScheduler::new(target.clone());
        let view = AnnotationView::new(config, Box::new(scheduler)).map_err(js_err)?;
        let view = Rc::new(RefCell::new(view));
        *target.view.borrow_mut() = Rc::downgrade(&view);
        log::info!("Annotation view ready");
        Ok(Self { view, target })
    }

    /// Called after every playback tick.
    pub fn on_change(&self, listener: js_sys::Function) {
        *self.target.listener.borrow_mut() = Some(listener);
    }

    pub fn species_options(&self) -> Result<JsValue, JsValue> {
        to_js(&choices(SPECIES))
    }

    pub fn call_type_options(&self) -> Result<JsValue, JsValue> {
        to_js(&choices(CALL_TYPES))
    }

    /// Switch to `date` (YYYY-MM-DD) with its image URLs. Returns false when
    /// the date is outside the allowed window.
    pub fn select_date(&self, date: &str, image_urls: Vec<String>) -> Result<bool, JsValue> {
        let date = parse_date(date).map_err(js_err)?;
        Ok(self.view.borrow_mut().select_date(date, image_urls))
    }

    /// Re-measure the container and the rendered image. Call on load and resize.
    pub fn update_layout(&self, container: &web_sys::Element, image: &web_sys::Element) -> Result<JsValue, JsValue> {
        let viewport = element_rect(container);
        let img = element_rect(image);
        let overlay = self
            .view
            .borrow_mut()
            .set_layout(viewport, Size::new(img.width, img.height))
            .map_err(js_err)?;
        to_js(&overlay)
    }

    pub fn image_load_start(&self) {
        self.view.borrow_mut().on_load_start();
    }

    pub fn image_loaded(&self) {
        self.view.borrow_mut().on_load_complete();
    }

    pub fn image_failed(&self) {
        self.view.borrow_mut().on_load_error();
    }

    /// Returns "started", "outside", "busy" or the reason drawing is blocked.
    pub fn pointer_down(&self, ev: &web_sys::MouseEvent, container: &web_sys::Element) -> String {
        let (x, y) = container_point(ev, container);
        match self.view.borrow_mut().pointer_down(x, y) {
            DownOutcome::Started => "started".to_string(),
            DownOutcome::OutsideOverlay => "outside".to_string(),
            DownOutcome::Busy => "busy".to_string(),
            DownOutcome::Blocked(block) => serde_json::to_value(block)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "blocked".to_string()),
        }
    }

    /// The live rectangle, or undefined when no drag is active.
    pub fn pointer_move(&self, ev: &web_sys::MouseEvent, container: &web_sys::Element) -> Result<JsValue, JsValue> {
        let (x, y) = container_point(ev, container);
        match self.view.borrow_mut().pointer_move(x, y) {
            Some(rect) => to_js(&rect),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// True when the drag produced a rectangle waiting for the form.
    pub fn pointer_up(&self, ev: &web_sys::MouseEvent, container: &web_sys::Element) -> bool {
        let (x, y) = container_point(ev, container);
        matches!(self.view.borrow_mut().pointer_up(x, y), UpOutcome::Committing(_))
    }

    pub fn pointer_leave(&self, ev: &web_sys::MouseEvent, container: &web_sys::Element) -> bool {
        let (x, y) = container_point(ev, container);
        matches!(self.view.borrow_mut().pointer_leave(x, y), UpOutcome::Committing(_))
    }

    /// Save the pending rectangle with the form values. Returns the new
    /// annotation, or null when nothing was pending.
    pub fn submit(&self, form_json: &str) -> Result<JsValue, JsValue> {
        let form = parse_form(form_json)?;
        match self.view.borrow_mut().submit(form) {
            Some(annotation) => to_js(&annotation),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn discard(&self) -> bool {
        self.view.borrow_mut().discard_pending()
    }

    pub fn delete_annotation(&self, id: &str) -> bool {
        self.view.borrow_mut().delete_annotation(id)
    }

    pub fn clear_annotations(&self) -> u32 {
        self.view.borrow_mut().clear_annotations() as u32
    }

    pub fn edit_annotation(&self, id: &str, form_json: &str) -> Result<bool, JsValue> {
        let form = parse_form(form_json)?;
        Ok(self.view.borrow_mut().edit_annotation(id, form))
    }

    /// `status` is "pending", "approved" or "ai".
    pub fn set_annotation_status(&self, id: &str, status: &str) -> Result<bool, JsValue> {
        let status: AnnotationStatus = serde_json::from_value(serde_json::Value::String(status.to_string()))
            .map_err(|_| js_err(format!("Unknown status '{status}'")))?;
        Ok(self.view.borrow_mut().set_annotation_status(id, status))
    }

    pub fn set_layers(&self, pending: bool, approved: bool, ai: bool) {
        self.view.borrow_mut().set_layers(LayerVisibility { pending, approved, ai });
    }

    pub fn start_playback(&self) -> bool {
        self.view.borrow_mut().start_playback()
    }

    pub fn stop_playback(&self) -> bool {
        self.view.borrow_mut().stop_playback()
    }

    pub fn toggle_playback(&self) -> bool {
        self.view.borrow_mut().toggle_playback()
    }

    pub fn previous_image(&self) -> Option<u32> {
        self.view.borrow_mut().previous_image().map(|i| i as u32)
    }

    pub fn next_image(&self) -> Option<u32> {
        self.view.borrow_mut().next_image().map(|i| i as u32)
    }

    /// Current image, playback, load state, layout, drag rectangles and the
    /// visible annotations for this image.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.view.borrow().snapshot())
    }

    pub fn export_json(&self) -> Result<Option<String>, JsValue> {
        match self.view.borrow().export() {
            Some(record) => record.to_json().map(Some).map_err(js_err),
            None => Ok(None),
        }
    }

    /// Download the export as `annotations-<date>.json`. Returns false when
    /// there is nothing to export.
    pub fn download_export(&self) -> Result<bool, JsValue> {
        let view = self.view.borrow();
        let Some(record) = view.export() else {
            log::warn!("Nothing to export");
            return Ok(false);
        };
        let json = record.to_json().map_err(js_err)?;
        let filename = view.export_file_name();
        download_text(&json, &filename).map_err(js_err)?;
        log::info!("Exported {} annotation(s) to {}", record.annotation_count, filename);
        Ok(true)
    }
}
