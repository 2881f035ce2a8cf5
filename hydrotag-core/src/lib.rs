//! Spectrogram annotation engine.
//!
//! Turns pointer drags over a rendered spectrogram into time/frequency
//! annotations, keeps them per image, steps through a day's images on a timer
//! and exports the result as JSON. Rendering, networking and styling belong to
//! the host.

pub mod annotation;
pub mod catalog;
pub mod config;
pub mod date;
pub mod drawing;
pub mod export;
pub mod geometry;
pub mod loading;
pub mod playback;
pub mod store;
pub mod view;

pub use annotation::{Annotation, AnnotationBox, AnnotationMetadata, AnnotationStatus, FormPayload, LayerVisibility};
pub use config::EngineConfig;
pub use drawing::{DownOutcome, DrawBlock, UpOutcome};
pub use export::ExportRecord;
pub use geometry::{CoordinateMapper, DomainPoint, DomainRange, OverlayRect, PixelRect, Size, ViewportRect};
pub use loading::ImageLoadState;
pub use playback::{EndOfList, ManualScheduler, PlaybackState, Scheduler, TickOutcome, TimerHandle};
pub use store::AnnotationStore;
pub use view::{AnnotationView, LayoutState, ViewSnapshot};
