use serde::{Deserialize, Serialize};

use crate::catalog::{call_type_name, species_name, OTHER_CALL_TYPE};
use crate::geometry::{DomainPoint, PixelRect};

/// Review state of an annotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    #[default]
    Pending,
    Approved,
    Ai,
}

impl AnnotationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending annotation",
            Self::Approved => "Admin Approved",
            Self::Ai => "AI Annotation",
        }
    }

    /// Stroke colour used when drawing the box.
    pub fn color(self) -> &'static str {
        match self {
            Self::Pending => "#0078e8",
            Self::Approved => "#248600",
            Self::Ai => "#5e6166",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Ai => "ai",
        }
    }
}

/// Which status layers are shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerVisibility {
    pub pending: bool,
    pub approved: bool,
    pub ai: bool,
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self { pending: true, approved: true, ai: true }
    }
}

impl LayerVisibility {
    pub fn shows(&self, status: AnnotationStatus) -> bool {
        match status {
            AnnotationStatus::Pending => self.pending,
            AnnotationStatus::Approved => self.approved,
            AnnotationStatus::Ai => self.ai,
        }
    }
}

/// User-supplied labels attached when a rectangle is committed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    pub species: String,
    pub call_type: String,
    pub author: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// Raw form contents, before the "other" call type and the author default are resolved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormPayload {
    pub species: String,
    pub call_type: String,
    pub custom_call_type: String,
    pub author: String,
    pub label: String,
    pub description: String,
}

impl FormPayload {
    pub fn resolve(self, default_author: &str) -> AnnotationMetadata {
        let call_type = if self.call_type == OTHER_CALL_TYPE {
            self.custom_call_type.trim().to_string()
        } else {
            self.call_type
        };
        let author = match self.author.trim() {
            "" => default_author.to_string(),
            a => a.to_string(),
        };
        AnnotationMetadata {
            species: self.species,
            call_type,
            author,
            label: self.label,
            description: self.description,
        }
    }
}

/// Domain coordinates of all four rectangle corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corners {
    pub top_left: DomainPoint,
    pub top_right: DomainPoint,
    pub bottom_left: DomainPoint,
    pub bottom_right: DomainPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub pixel_rect: PixelRect,
    pub metadata: AnnotationMetadata,
    pub status: AnnotationStatus,
    pub start_time: f64,
    pub end_time: f64,
    pub start_frequency: f64,
    pub end_frequency: f64,
    pub corners: Corners,
    pub image_index: usize,
    pub source_image_url: String,
}

impl Annotation {
    pub fn duration_seconds(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn bandwidth_hz(&self) -> f64 {
        self.end_frequency - self.start_frequency
    }

    /// Text shown next to the box. Catalog values use their display names.
    pub fn display_label(&self) -> String {
        if !self.metadata.label.is_empty() {
            return self.metadata.label.clone();
        }
        let species = species_name(&self.metadata.species).unwrap_or(&self.metadata.species);
        let call_type = call_type_name(&self.metadata.call_type).unwrap_or(&self.metadata.call_type);
        match (species, call_type) {
            ("", "") => "Unlabeled".to_string(),
            (s, "") => s.to_string(),
            ("", c) => c.to_string(),
            (s, c) => format!("{s} - {c}"),
        }
    }
}

/// An annotation plus what a renderer needs to draw and caption its box.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationBox {
    #[serde(flatten)]
    pub annotation: Annotation,
    pub display_label: String,
    pub status_label: &'static str,
    pub color: &'static str,
    pub duration_seconds: f64,
    pub bandwidth_hz: f64,
}

impl From<&Annotation> for AnnotationBox {
    fn from(a: &Annotation) -> Self {
        Self {
            display_label: a.display_label(),
            status_label: a.status.label(),
            color: a.status.color(),
            duration_seconds: a.duration_seconds(),
            bandwidth_hz: a.bandwidth_hz(),
            annotation: a.clone(),
        }
    }
}
