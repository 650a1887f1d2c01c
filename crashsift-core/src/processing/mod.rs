//! Loading and two-pass metric computation.
//!
//! Pass 1 ([`extraction`]) turns annotated tensor archives into raw
//! per-video metrics; pass 2 ([`normalization`]) normalises the complete
//! corpus against one global reference and attaches human judgements.

pub mod annotations;
pub mod extraction;
pub mod judgements;
pub mod normalization;
pub mod tensors;

pub use annotations::{AnnotationIndex, load_annotations, load_annotations_or_empty};
pub use extraction::{RawCorpus, RawVideoMetrics, extract_corpus, extract_video, extraction_window};
pub use judgements::{JudgementIndex, load_judgements};
pub use normalization::{GlobalReference, MetricsTable, compute_global_reference, normalize, normalize_corpus};
pub use tensors::VideoTensors;
