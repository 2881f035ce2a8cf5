use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationStatus};
use crate::geometry::DomainPoint;
use crate::store::AnnotationStore;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportPoint {
    pub time_seconds: f64,
    pub frequency_hz: f64,
}

impl From<DomainPoint> for ExportPoint {
    fn from(p: DomainPoint) -> Self {
        Self { time_seconds: p.time_seconds, frequency_hz: p.frequency_hz }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportCorners {
    pub top_left: ExportPoint,
    pub top_right: ExportPoint,
    pub bottom_left: ExportPoint,
    pub bottom_right: ExportPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportPixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One annotation in the export document. Field names are consumed by
/// downstream tooling and must not change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedAnnotation {
    pub id: String,
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
    pub start_frequency_hz: f64,
    pub end_frequency_hz: f64,
    pub species: String,
    pub call_type: String,
    pub author: String,
    pub status: AnnotationStatus,
    pub image_url: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub pixel: ExportPixelRect,
    pub corners: ExportCorners,
}

impl From<&Annotation> for ExportedAnnotation {
    fn from(a: &Annotation) -> Self {
        Self {
            id: a.id.clone(),
            start_time_seconds: a.start_time,
            end_time_seconds: a.end_time,
            start_frequency_hz: a.start_frequency,
            end_frequency_hz: a.end_frequency,
            species: a.metadata.species.clone(),
            call_type: a.metadata.call_type.clone(),
            author: a.metadata.author.clone(),
            status: a.status,
            image_url: a.source_image_url.clone(),
            label: a.metadata.label.clone(),
            description: a.metadata.description.clone(),
            pixel: ExportPixelRect {
                x: a.pixel_rect.left,
                y: a.pixel_rect.top,
                width: a.pixel_rect.width,
                height: a.pixel_rect.height,
            },
            corners: ExportCorners {
                top_left: a.corners.top_left.into(),
                top_right: a.corners.top_right.into(),
                bottom_left: a.corners.bottom_left.into(),
                bottom_right: a.corners.bottom_right.into(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedImage {
    pub image_url: String,
    pub annotations: Vec<ExportedAnnotation>,
}

/// Export document: annotations grouped by image index (ascending).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub date: String,
    pub image_count: usize,
    pub annotation_count: usize,
    pub images: BTreeMap<usize, ExportedImage>,
}

impl ExportRecord {
    /// Group the store by image. Returns `None` for an empty store.
    pub fn from_store(
        store: &AnnotationStore,
        date_label: &str,
        image_urls: &[String],
    ) -> Option<Self> {
        if store.is_empty() {
            return None;
        }
        let mut images: BTreeMap<usize, ExportedImage> = BTreeMap::new();
        for a in store.iter() {
            let entry = images.entry(a.image_index).or_insert_with(|| ExportedImage {
                image_url: image_urls
                    .get(a.image_index)
                    .cloned()
                    .unwrap_or_else(|| a.source_image_url.clone()),
                annotations: Vec::new(),
            });
            entry.annotations.push(ExportedAnnotation::from(a));
        }
        Some(Self {
            date: date_label.to_string(),
            image_count: image_urls.len(),
            annotation_count: store.len(),
            images,
        })
    }

    /// Pretty-printed UTF-8 JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| format!("Serialize error: {e}"))?;
        Ok(format!("{json}\n"))
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("Failed to parse export: {e}"))
    }
}

/// Download name for a date's export, e.g. `annotations-2024-05-01.json`.
pub fn export_file_name(date_label: &str) -> String {
    format!("annotations-{date_label}.json")
}

/// Write an export to `path`, creating parent directories.
pub fn save_export(path: &Path, record: &ExportRecord) -> Result<PathBuf, String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create dir {}: {e}", parent.display()))?;
    }
    fs::write(path, record.to_json()?)
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    Ok(path.to_path_buf())
}

pub fn load_export(path: &Path) -> Result<ExportRecord, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    ExportRecord::from_json(&content)
}
