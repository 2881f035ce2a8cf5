use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Save `text` as a file through a temporary download link.
pub fn download_text(text: &str, filename: &str) -> Result<(), String> {
    let parts = js_sys::Array::of1(&JsValue::from_str(text));
    let blob = web_sys::Blob::new_with_str_sequence(&parts)
        .map_err(|e| format!("Failed to create Blob: {:?}", e))?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)
        .map_err(|e| format!("Failed to create object URL: {:?}", e))?;

    let result = click_link(&url, filename);
    web_sys::Url::revoke_object_url(&url).ok();
    result
}

fn click_link(url: &str, filename: &str) -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("No document")?;
    let body = document.body().ok_or("No document body")?;

    let a: web_sys::HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| format!("Failed to create link: {:?}", e))?
        .dyn_into()
        .map_err(|_| "Created element is not an anchor")?;
    a.set_href(url);
    a.set_download(filename);
    a.set_attribute("style", "display:none").ok();
    body.append_child(&a).ok();
    a.click();
    body.remove_child(&a).ok();
    Ok(())
}
