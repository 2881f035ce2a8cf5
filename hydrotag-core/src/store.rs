use crate::annotation::{Annotation, AnnotationMetadata, AnnotationStatus, Corners, LayerVisibility};
use crate::geometry::{CoordinateMapper, PixelRect};

/// Issues ids from the creation timestamp plus a sequence number, so two
/// annotations created in the same millisecond still differ.
#[derive(Clone, Debug, Default)]
struct IdGenerator {
    seq: u64,
}

impl IdGenerator {
    fn next(&mut self) -> String {
        self.seq += 1;
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{millis}-{}", self.seq)
    }
}

/// All annotations for the selected date, in creation order.
#[derive(Clone, Debug, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    ids: IdGenerator,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the rectangle to domain space and append a new pending annotation.
    ///
    /// Returns `None` without touching the store if either side of the
    /// rectangle is not larger than `min_size`.
    pub fn create(
        &mut self,
        pixel_rect: PixelRect,
        metadata: AnnotationMetadata,
        image_index: usize,
        source_image_url: &str,
        mapper: &CoordinateMapper,
        min_size: f64,
    ) -> Option<&Annotation> {
        if !(pixel_rect.width > min_size && pixel_rect.height > min_size) {
            log::debug!(
                "Rejected {}x{} rectangle below the {min_size}px minimum",
                pixel_rect.width,
                pixel_rect.height
            );
            return None;
        }

        let top_left = mapper.pixel_to_domain(pixel_rect.left, pixel_rect.top);
        let top_right = mapper.pixel_to_domain(pixel_rect.right(), pixel_rect.top);
        let bottom_left = mapper.pixel_to_domain(pixel_rect.left, pixel_rect.bottom());
        let bottom_right = mapper.pixel_to_domain(pixel_rect.right(), pixel_rect.bottom());

        // Top edge is the high frequency, left edge the early time.
        let (start_time, end_time) = ordered(top_left.time_seconds, top_right.time_seconds);
        let (start_frequency, end_frequency) =
            ordered(bottom_left.frequency_hz, top_left.frequency_hz);

        let annotation = Annotation {
            id: self.ids.next(),
            pixel_rect,
            metadata,
            status: AnnotationStatus::Pending,
            start_time,
            end_time,
            start_frequency,
            end_frequency,
            corners: Corners { top_left, top_right, bottom_left, bottom_right },
            image_index,
            source_image_url: source_image_url.to_string(),
        };
        log::info!(
            "Annotation created: {} on image {} ({:.1}-{:.1} s, {:.0}-{:.0} Hz)",
            annotation.id,
            image_index,
            start_time,
            end_time,
            start_frequency,
            end_frequency
        );
        self.annotations.push(annotation);
        self.annotations.last()
    }

    /// Remove exactly one annotation. Unknown ids are a no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(pos) = self.annotations.iter().position(|a| a.id == id) else {
            return false;
        };
        self.annotations.remove(pos);
        true
    }

    /// Empty the store, returning how many annotations were dropped.
    pub fn clear_all(&mut self) -> usize {
        let n = self.annotations.len();
        self.annotations.clear();
        if n > 0 {
            log::info!("All annotations cleared ({n})");
        }
        n
    }

    /// Replace the labels of an existing annotation. Geometry and image index
    /// stay as they were.
    pub fn update_metadata(&mut self, id: &str, metadata: AnnotationMetadata) -> bool {
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.metadata = metadata;
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, id: &str, status: AnnotationStatus) -> bool {
        match self.annotations.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Annotations drawn on one image, in creation order.
    pub fn by_image(&self, image_index: usize) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.image_index == image_index)
            .collect()
    }

    /// [`by_image`](Self::by_image) restricted to the visible status layers.
    pub fn visible(&self, image_index: usize, layers: &LayerVisibility) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.image_index == image_index && layers.shows(a.status))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DomainRange;
    use std::collections::HashSet;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(PixelRect::new(100.0, 50.0, 800.0, 600.0), DomainRange::default()).unwrap()
    }

    fn meta(species: &str) -> AnnotationMetadata {
        AnnotationMetadata {
            species: species.to_string(),
            call_type: "song".to_string(),
            author: "Anonymous".to_string(),
            ..Default::default()
        }
    }

    fn rect_at(x: f64) -> PixelRect {
        PixelRect::new(x, 100.0, 40.0, 30.0)
    }

    #[test]
    fn test_full_overlay_rect_maps_to_full_domain() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        let a = store
            .create(PixelRect::new(100.0, 50.0, 800.0, 600.0), meta("blue-whale"), 0, "img0", &m, 10.0)
            .unwrap();
        assert_eq!(a.start_time, 0.0);
        assert_eq!(a.end_time, 3600.0);
        assert_eq!(a.start_frequency, 0.0);
        assert_eq!(a.end_frequency, 8000.0);
        assert_eq!(a.corners.bottom_right.time_seconds, 3600.0);
        assert_eq!(a.corners.bottom_right.frequency_hz, 0.0);
        assert_eq!(a.status, AnnotationStatus::Pending);
        assert_eq!(a.source_image_url, "img0");
    }

    #[test]
    fn test_small_rect_rejected() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        assert!(store.create(PixelRect::new(200.0, 200.0, 10.0, 50.0), meta("x"), 0, "", &m, 10.0).is_none());
        assert!(store.create(PixelRect::new(200.0, 200.0, 50.0, 3.0), meta("x"), 0, "", &m, 10.0).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_by_image_isolation() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        for i in 0..3 {
            store.create(rect_at(150.0 + i as f64 * 50.0), meta("fin-whale"), 0, "a", &m, 10.0);
        }
        for i in 0..2 {
            store.create(rect_at(150.0 + i as f64 * 50.0), meta("blue-whale"), 1, "b", &m, 10.0);
        }
        let on_one = store.by_image(1);
        assert_eq!(on_one.len(), 2);
        assert!(on_one.iter().all(|a| a.image_index == 1));
        assert_eq!(store.by_image(0).len(), 3);
        assert!(store.by_image(7).is_empty());
    }

    #[test]
    fn test_clear_all_empties_every_image() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        for image in 0..4 {
            store.create(rect_at(200.0), meta("gray-whale"), image, "", &m, 10.0);
        }
        assert_eq!(store.clear_all(), 4);
        for image in 0..4 {
            assert!(store.by_image(image).is_empty());
        }
    }

    #[test]
    fn test_ids_unique_and_delete_removes_one() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        for _ in 0..20 {
            store.create(rect_at(300.0), meta("x"), 0, "", &m, 10.0);
        }
        let ids: HashSet<String> = store.iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids.len(), 20);

        let victim = store.as_slice()[5].id.clone();
        assert!(store.delete(&victim));
        assert_eq!(store.len(), 19);
        assert!(store.get(&victim).is_none());
        assert!(!store.delete(&victim));
        assert!(!store.delete("nope"));
        assert_eq!(store.len(), 19);
    }

    #[test]
    fn test_edit_keeps_geometry() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        let id = store.create(rect_at(300.0), meta("fin-whale"), 2, "u", &m, 10.0).unwrap().id.clone();
        let before = store.get(&id).unwrap().clone();

        assert!(store.update_metadata(&id, meta("humpback-whale")));
        assert!(store.set_status(&id, AnnotationStatus::Approved));
        let after = store.get(&id).unwrap();
        assert_eq!(after.metadata.species, "humpback-whale");
        assert_eq!(after.status, AnnotationStatus::Approved);
        assert_eq!(after.pixel_rect, before.pixel_rect);
        assert_eq!(after.image_index, 2);
        assert_eq!(after.start_time, before.start_time);
        assert!(!store.set_status("missing", AnnotationStatus::Ai));
    }

    #[test]
    fn test_visible_respects_layers() {
        let mut store = AnnotationStore::new();
        let m = mapper();
        let a = store.create(rect_at(200.0), meta("a"), 0, "", &m, 10.0).unwrap().id.clone();
        store.create(rect_at(300.0), meta("b"), 0, "", &m, 10.0);
        store.set_status(&a, AnnotationStatus::Approved);

        let hide_approved = LayerVisibility { approved: false, ..Default::default() };
        let shown = store.visible(0, &hide_approved);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].metadata.species, "b");
        assert_eq!(store.visible(0, &LayerVisibility::default()).len(), 2);
    }
}
