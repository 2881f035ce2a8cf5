use serde::{Deserialize, Serialize};

/// Tolerance used when checking that the overlay fits inside the viewport.
/// Scaling a bounding box by a rendered/original ratio can overshoot the
/// container edge by a rounding error.
const CONTAINMENT_EPSILON: f64 = 1e-6;

/// An axis-aligned rectangle in container pixel space (y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// The container the spectrogram image is rendered into.
pub type ViewportRect = PixelRect;

/// The plotted-data region of the rendered image, in container pixels.
pub type OverlayRect = PixelRect;

impl PixelRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Containment test with inclusive edges and no tolerance.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    /// True if `other` lies entirely inside `self` (edges may touch).
    pub fn contains_rect(&self, other: &PixelRect) -> bool {
        other.left >= self.left - CONTAINMENT_EPSILON
            && other.top >= self.top - CONTAINMENT_EPSILON
            && other.right() <= self.right() + CONTAINMENT_EPSILON
            && other.bottom() <= self.bottom() + CONTAINMENT_EPSILON
    }

    /// Clamp a point onto the rectangle (including its edges).
    pub fn clamp_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.max(self.left).min(self.right()),
            y.max(self.top).min(self.bottom()),
        )
    }

    fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Reject rectangles that cannot be used as a mapping target.
    pub fn validate(&self, what: &str) -> Result<(), String> {
        if !self.is_finite() {
            return Err(format!("{what} has non-finite coordinates: {self:?}"));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(format!(
                "{what} must have a positive size, got {}x{}",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Physical extent of one spectrogram image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainRange {
    pub time_min: f64,
    pub time_max: f64,
    pub freq_min: f64,
    pub freq_max: f64,
}

impl Default for DomainRange {
    /// One hour of audio, 0-8 kHz.
    fn default() -> Self {
        Self {
            time_min: 0.0,
            time_max: 3600.0,
            freq_min: 0.0,
            freq_max: 8000.0,
        }
    }
}

impl DomainRange {
    pub fn new(time_min: f64, time_max: f64, freq_min: f64, freq_max: f64) -> Result<Self, String> {
        let range = Self { time_min, time_max, freq_min, freq_max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), String> {
        let all_finite = [self.time_min, self.time_max, self.freq_min, self.freq_max]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(format!("Domain range has non-finite bounds: {self:?}"));
        }
        if self.time_min >= self.time_max {
            return Err(format!(
                "Domain time range is empty or inverted: {} >= {}",
                self.time_min, self.time_max
            ));
        }
        if self.freq_min >= self.freq_max {
            return Err(format!(
                "Domain frequency range is empty or inverted: {} >= {}",
                self.freq_min, self.freq_max
            ));
        }
        Ok(())
    }

    pub fn time_span(&self) -> f64 {
        self.time_max - self.time_min
    }

    pub fn freq_span(&self) -> f64 {
        self.freq_max - self.freq_min
    }
}

/// A point in domain space: seconds into the image and frequency in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainPoint {
    pub time_seconds: f64,
    pub frequency_hz: f64,
}

/// Converts between container pixels and (time, frequency).
///
/// Only constructible from a validated overlay and domain, so the divisions
/// below never see a zero-sized overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    overlay: OverlayRect,
    domain: DomainRange,
}

impl CoordinateMapper {
    pub fn new(overlay: OverlayRect, domain: DomainRange) -> Result<Self, String> {
        overlay.validate("Overlay rectangle")?;
        domain.validate()?;
        Ok(Self { overlay, domain })
    }

    pub fn overlay(&self) -> &OverlayRect {
        &self.overlay
    }

    pub fn domain(&self) -> &DomainRange {
        &self.domain
    }

    /// Map a container pixel to domain coordinates.
    ///
    /// Row 0 of the overlay is the highest frequency, so the y axis is inverted.
    pub fn pixel_to_domain(&self, x: f64, y: f64) -> DomainPoint {
        let nx = (x - self.overlay.left) / self.overlay.width;
        let ny = (y - self.overlay.top) / self.overlay.height;
        DomainPoint {
            time_seconds: self.domain.time_min + nx * self.domain.time_span(),
            frequency_hz: self.domain.freq_max - ny * self.domain.freq_span(),
        }
    }

    /// Exact algebraic inverse of [`pixel_to_domain`](Self::pixel_to_domain).
    pub fn domain_to_pixel(&self, point: DomainPoint) -> (f64, f64) {
        let nx = (point.time_seconds - self.domain.time_min) / self.domain.time_span();
        let ny = (self.domain.freq_max - point.frequency_hz) / self.domain.freq_span();
        (
            self.overlay.left + nx * self.overlay.width,
            self.overlay.top + ny * self.overlay.height,
        )
    }

    /// Drawing-start guard.
    pub fn is_within_overlay(&self, x: f64, y: f64) -> bool {
        self.overlay.contains_point(x, y)
    }
}

/// Where the plotted data sits inside the source image, in original-image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayGeometry {
    pub original_size: Size,
    pub plot_bbox: PixelRect,
}

impl OverlayGeometry {
    pub fn new(original_size: Size, plot_bbox: PixelRect) -> Result<Self, String> {
        let geometry = Self { original_size, plot_bbox };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), String> {
        let Size { width, height } = self.original_size;
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(format!("Original image size must be positive, got {width}x{height}"));
        }
        self.plot_bbox.validate("Plot bounding box")?;
        let image = PixelRect::new(0.0, 0.0, width, height);
        if !image.contains_rect(&self.plot_bbox) {
            return Err(format!(
                "Plot bounding box {:?} extends outside the {width}x{height} image",
                self.plot_bbox
            ));
        }
        Ok(())
    }

    /// Scale the plot bounding box to the rendered image size.
    ///
    /// The image is rendered at the container origin, so the result is in the
    /// same container-relative space as pointer coordinates. Fails if the
    /// scaled overlay is degenerate or falls outside the viewport.
    pub fn derive(&self, viewport: &ViewportRect, rendered: Size) -> Result<OverlayRect, String> {
        viewport.validate("Viewport")?;
        if !(rendered.width > 0.0 && rendered.height > 0.0) {
            return Err(format!(
                "Rendered image size must be positive, got {}x{}",
                rendered.width, rendered.height
            ));
        }
        let sx = rendered.width / self.original_size.width;
        let sy = rendered.height / self.original_size.height;
        let overlay = PixelRect {
            left: self.plot_bbox.left * sx,
            top: self.plot_bbox.top * sy,
            width: self.plot_bbox.width * sx,
            height: self.plot_bbox.height * sy,
        };
        overlay.validate("Overlay rectangle")?;

        let container = PixelRect::new(0.0, 0.0, viewport.width, viewport.height);
        if !container.contains_rect(&overlay) {
            return Err(format!(
                "Overlay {overlay:?} does not fit inside the {}x{} viewport",
                viewport.width, viewport.height
            ));
        }
        Ok(overlay)
    }
}

/// Convert client (page) coordinates into container-relative coordinates.
pub fn to_container(client_x: f64, client_y: f64, viewport: &ViewportRect) -> (f64, f64) {
    (client_x - viewport.left, client_y - viewport.top)
}
