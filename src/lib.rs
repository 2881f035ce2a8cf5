pub mod download;
pub mod interval;
pub mod web_view;

pub use web_view::WebAnnotationView;

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
}
