use serde::{Deserialize, Serialize};

/// Load status of the image currently on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageLoadState {
    /// No image to show.
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The host reported a load error; shown as "unavailable".
    Failed,
}

/// Tracks load-start / load-complete / load-error signals for the current image.
#[derive(Clone, Debug, Default)]
pub struct ImageLoadTracker {
    state: ImageLoadState,
}

impl ImageLoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ImageLoadState {
        self.state
    }

    /// A different image (or list) is now current. The host's image element
    /// will start fetching, so treat it as loading straight away.
    pub fn image_changed(&mut self, has_image: bool) {
        self.state = if has_image { ImageLoadState::Loading } else { ImageLoadState::Idle };
    }

    pub fn on_load_start(&mut self) {
        self.state = ImageLoadState::Loading;
    }

    pub fn on_load_complete(&mut self) {
        self.state = ImageLoadState::Loaded;
    }

    pub fn on_load_error(&mut self) {
        self.state = ImageLoadState::Failed;
    }

    /// A load is in flight.
    pub fn is_busy(&self) -> bool {
        self.state == ImageLoadState::Loading
    }

    /// The image finished loading and can be drawn on or advanced past.
    pub fn is_available(&self) -> bool {
        self.state == ImageLoadState::Loaded
    }

    pub fn is_failed(&self) -> bool {
        self.state == ImageLoadState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut t = ImageLoadTracker::new();
        assert_eq!(t.state(), ImageLoadState::Idle);
        t.image_changed(true);
        assert!(t.is_busy());
        t.on_load_complete();
        assert!(t.is_available());
        t.on_load_start();
        t.on_load_error();
        assert!(t.is_failed());
        assert!(!t.is_busy());
        assert!(!t.is_available());
        t.image_changed(false);
        assert_eq!(t.state(), ImageLoadState::Idle);
    }
}
