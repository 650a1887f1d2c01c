//! Pass 1: raw per-video metric extraction.
//!
//! For every annotated video the extractor takes a window of frames around
//! the accident frame and derives three quantities from it:
//!
//! * the raw maximum L2 distance between consecutive aggregated frame
//!   features (normalised later against the whole corpus),
//! * scene complexity, the largest number of confident detections in any
//!   single frame,
//! * whether any frame shows a vulnerable road user next to a vehicle.
//!
//! Extraction is embarrassingly parallel and runs on a rayon pool sized by
//! `CoreConfig::jobs`. A video that cannot be read, or whose window is
//! empty, is skipped and counted; it never aborts the batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array1, ArrayView2, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::annotations::AnnotationIndex;
use super::tensors::{CLASS_COLUMN, CONFIDENCE_COLUMN, VideoTensors};
use crate::config::CoreConfig;
use crate::discovery::{discover_tensor_files, video_key};
use crate::error::{CoreError, CoreResult};
use crate::progress::{ProgressCallback, ProgressEvent, Stage};
use crate::types::{FeatureAggregation, SkipReport};

/// Pass-1 metrics of one video, before global normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideoMetrics {
    pub video_name: String,
    pub accident_frame: usize,
    pub window_length: usize,
    /// Un-normalised maximum consecutive-frame feature distance.
    pub max_dist: f64,
    pub scene_complexity: u32,
    pub has_vru_interaction: bool,
}

/// Complete pass-1 output. Only a finished corpus can be normalised.
#[derive(Debug, Clone, Default)]
pub struct RawCorpus {
    /// Sorted by video name.
    pub videos: Vec<RawVideoMetrics>,
    pub skips: SkipReport,
}

/// Extraction window `[start, end)` clipped to `[0, total)`.
#[must_use]
pub fn extraction_window(accident_frame: usize, half_width: usize, total: usize) -> (usize, usize) {
    let start = accident_frame.saturating_sub(half_width);
    let end = accident_frame.saturating_add(half_width).min(total);
    (start, end.max(start))
}

/// Settings that affect per-video extraction.
#[derive(Debug, Clone)]
pub struct ExtractionParams {
    pub window_half_width: usize,
    pub confidence_threshold: f64,
    pub aggregation: FeatureAggregation,
    pub vru_class_ids: Vec<u32>,
    pub vehicle_class_ids: Vec<u32>,
}

impl From<&CoreConfig> for ExtractionParams {
    fn from(config: &CoreConfig) -> Self {
        Self {
            window_half_width: config.window_half_width,
            confidence_threshold: config.confidence_threshold,
            aggregation: config.aggregation,
            vru_class_ids: config.vru_class_ids.clone(),
            vehicle_class_ids: config.vehicle_class_ids.clone(),
        }
    }
}

impl ExtractionParams {
    fn is_confident(&self, detection: ndarray::ArrayView1<'_, f64>) -> bool {
        detection[CONFIDENCE_COLUMN] > self.confidence_threshold
    }

    fn confident_slots(&self, detections: &ArrayView2<'_, f64>) -> Vec<usize> {
        detections
            .outer_iter()
            .enumerate()
            .filter(|(_, det)| self.is_confident(*det))
            .map(|(slot, _)| slot)
            .collect()
    }
}

/// Extracts raw metrics from one video's tensors.
///
/// Returns `None` when the clipped window holds no frames.
#[must_use]
pub fn extract_video(
    video_name: &str,
    tensors: &VideoTensors,
    accident_frame: usize,
    params: &ExtractionParams,
) -> Option<RawVideoMetrics> {
    let (start, end) = extraction_window(
        accident_frame,
        params.window_half_width,
        tensors.frame_count(),
    );
    if end <= start {
        return None;
    }

    let mut scene_complexity = 0u32;
    let mut has_vru_interaction = false;
    let mut max_dist = 0.0f64;
    let mut previous: Option<Array1<f64>> = None;

    for t in start..end {
        let detections = tensors.detections(t);
        let confident = params.confident_slots(&detections);

        scene_complexity = scene_complexity.max(confident.len() as u32);
        if !has_vru_interaction {
            has_vru_interaction = frame_has_vru_interaction(&detections, &confident, params);
        }

        let feature = aggregate_feature(tensors, t, &confident, params.aggregation);
        if let Some(prev) = &previous {
            max_dist = max_dist.max(l2_distance(prev, &feature));
        }
        previous = Some(feature);
    }

    Some(RawVideoMetrics {
        video_name: video_name.to_string(),
        accident_frame,
        window_length: end - start,
        max_dist,
        scene_complexity,
        has_vru_interaction,
    })
}

fn aggregate_feature(
    tensors: &VideoTensors,
    t: usize,
    confident: &[usize],
    aggregation: FeatureAggregation,
) -> Array1<f64> {
    match aggregation {
        FeatureAggregation::ConfidentMean if !confident.is_empty() => {
            let mut sum = Array1::<f64>::zeros(tensors.feature_dim());
            for &slot in confident {
                sum += &tensors.feature(t, slot);
            }
            sum / confident.len() as f64
        }
        _ => tensors.feature(t, 0).to_owned(),
    }
}

fn frame_has_vru_interaction(
    detections: &ArrayView2<'_, f64>,
    confident: &[usize],
    params: &ExtractionParams,
) -> bool {
    let mut vru = false;
    let mut vehicle = false;
    for &slot in confident {
        let class = detections[[slot, CLASS_COLUMN]].trunc();
        if class < 0.0 {
            continue;
        }
        let class = class as u32;
        vru |= params.vru_class_ids.contains(&class);
        vehicle |= params.vehicle_class_ids.contains(&class);
    }
    vru && vehicle
}

fn l2_distance(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let mut sum = 0.0;
    Zip::from(a).and(b).for_each(|x, y| sum += (x - y) * (x - y));
    sum.sqrt()
}

enum Outcome {
    Extracted(RawVideoMetrics),
    Unreadable,
    EmptyWindow,
}

/// Runs pass 1 over every archive in `tensor_dir`.
///
/// Archives without an annotation, unreadable archives and empty windows
/// are counted in the returned [`SkipReport`]. A missing tensor directory is
/// [`CoreError::DataNotFound`].
pub fn extract_corpus(
    annotations: &AnnotationIndex,
    tensor_dir: &Path,
    config: &CoreConfig,
    progress: &dyn ProgressCallback,
) -> CoreResult<RawCorpus> {
    let archives = discover_tensor_files(tensor_dir)?;
    let mut skips = SkipReport::default();
    let mut seen = HashSet::new();

    let work: Vec<(String, usize, PathBuf)> = archives
        .into_iter()
        .filter_map(|path| {
            let key = video_key(&path)?;
            if !seen.insert(key.clone()) {
                log::warn!("Duplicate archive {} for {key}, skipping", path.display());
                skips.duplicate += 1;
                return None;
            }
            match annotations.accident_frame(&key) {
                Some(frame) => Some((key, frame, path)),
                None => {
                    log::debug!("No annotation for {key}, skipping");
                    skips.unannotated += 1;
                    None
                }
            }
        })
        .collect();

    let total = work.len();
    log::info!(
        "Extracting metrics for {} annotated videos on {} threads",
        total,
        config.jobs
    );
    progress.on_progress(ProgressEvent::StageStarted {
        stage: Stage::Extraction,
        total: Some(total),
    });

    let params = ExtractionParams::from(config);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.max(1))
        .build()
        .map_err(|e| CoreError::OperationFailed(format!("Failed to build thread pool: {e}")))?;
    let completed = AtomicUsize::new(0);

    let outcomes: Vec<Outcome> = pool.install(|| {
        work.par_iter()
            .map(|(name, accident_frame, path)| {
                let outcome = match VideoTensors::load(path) {
                    Ok(tensors) => match extract_video(name, &tensors, *accident_frame, &params) {
                        Some(metrics) => Outcome::Extracted(metrics),
                        None => {
                            log::warn!("Empty extraction window for {name}, skipping");
                            Outcome::EmptyWindow
                        }
                    },
                    Err(e) => {
                        log::warn!("Skipping unreadable archive: {e}");
                        Outcome::Unreadable
                    }
                };
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress.on_progress(ProgressEvent::VideoProcessed {
                    video_name: name.clone(),
                    completed: done,
                    total,
                });
                outcome
            })
            .collect()
    });

    let mut videos = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Outcome::Extracted(metrics) => videos.push(metrics),
            Outcome::Unreadable => skips.unreadable += 1,
            Outcome::EmptyWindow => skips.empty_window += 1,
        }
    }
    videos.sort_by(|a, b| a.video_name.cmp(&b.video_name));

    progress.on_progress(ProgressEvent::StageComplete {
        stage: Stage::Extraction,
    });
    log::info!(
        "Extracted {} videos ({} unannotated, {} unreadable, {} empty windows)",
        videos.len(),
        skips.unannotated,
        skips.unreadable,
        skips.empty_window
    );

    Ok(RawCorpus { videos, skips })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn params() -> ExtractionParams {
        ExtractionParams::from(&CoreConfig::default())
    }

    /// Builds tensors where frame t has `counts[t]` confident detections of
    /// class `class` and a one-dimensional feature `features[t]` in every slot.
    fn tensors(counts: &[usize], class: f64, features: &[f64]) -> VideoTensors {
        let frames = counts.len();
        let slots = 4;
        let mut det = Array3::<f64>::zeros((frames, slots, 6));
        let mut data = Array3::<f64>::zeros((frames, slots, 1));
        for t in 0..frames {
            for s in 0..slots {
                data[[t, s, 0]] = features[t];
            }
            for s in 0..counts[t] {
                det[[t, s, 4]] = 0.9;
                det[[t, s, 5]] = class;
            }
        }
        VideoTensors::new(det, data).unwrap()
    }

    #[test]
    fn window_is_clipped_at_both_ends() {
        assert_eq!(extraction_window(0, 30, 100), (0, 30));
        assert_eq!(extraction_window(99, 30, 100), (69, 100));
        assert_eq!(extraction_window(50, 30, 100), (20, 80));
        assert_eq!(extraction_window(5, 30, 8), (0, 8));
        assert_eq!(extraction_window(200, 30, 100), (170, 170));
    }

    #[test]
    fn window_length_never_exceeds_twice_half_width() {
        for total in [1usize, 10, 61, 200] {
            for a in [0, total / 2, total.saturating_sub(1)] {
                let (start, end) = extraction_window(a, 30, total);
                assert!(end - start <= 60);
                assert!(end <= total);
            }
        }
    }

    #[test]
    fn accident_at_first_and_last_frame() {
        let t = tensors(&[1; 100], 2.0, &[0.0; 100]);
        let first = extract_video("a.mp4", &t, 0, &params()).unwrap();
        assert_eq!(first.window_length, 30);
        let last = extract_video("a.mp4", &t, 99, &params()).unwrap();
        assert_eq!(last.window_length, 31);
    }

    #[test]
    fn empty_window_is_none() {
        let t = tensors(&[1; 10], 2.0, &[0.0; 10]);
        assert!(extract_video("a.mp4", &t, 50, &params()).is_none());
    }

    #[test]
    fn complexity_is_max_confident_count() {
        let t = tensors(&[1, 3, 2, 0], 2.0, &[0.0; 4]);
        let m = extract_video("a.mp4", &t, 2, &params()).unwrap();
        assert_eq!(m.scene_complexity, 3);
        assert!(!m.has_vru_interaction);
    }

    #[test]
    fn max_dist_is_largest_consecutive_step() {
        let t = tensors(&[1; 4], 2.0, &[0.0, 1.0, 4.0, 4.5]);
        let m = extract_video("a.mp4", &t, 2, &params()).unwrap();
        assert_relative_eq!(m.max_dist, 3.0);
    }

    #[test]
    fn single_frame_has_zero_distance() {
        let t = tensors(&[1], 2.0, &[5.0]);
        let m = extract_video("a.mp4", &t, 0, &params()).unwrap();
        assert_eq!(m.window_length, 1);
        assert_eq!(m.max_dist, 0.0);
    }

    #[test]
    fn confident_mean_falls_back_to_first_slot() {
        let mut det = Array3::<f64>::zeros((2, 2, 6));
        let mut data = Array3::<f64>::zeros((2, 2, 1));
        // frame 0: nothing confident, slot 0 = 1.0, slot 1 = 9.0
        data[[0, 0, 0]] = 1.0;
        data[[0, 1, 0]] = 9.0;
        // frame 1: both confident, mean of 2.0 and 4.0
        det[[1, 0, 4]] = 0.8;
        det[[1, 1, 4]] = 0.8;
        data[[1, 0, 0]] = 2.0;
        data[[1, 1, 0]] = 4.0;
        let t = VideoTensors::new(det, data).unwrap();

        let mean = extract_video("a.mp4", &t, 1, &params()).unwrap();
        assert_relative_eq!(mean.max_dist, 2.0);

        let first = ExtractionParams {
            aggregation: FeatureAggregation::FirstSlot,
            ..params()
        };
        let slot0 = extract_video("a.mp4", &t, 1, &first).unwrap();
        assert_relative_eq!(slot0.max_dist, 1.0);
    }

    #[test]
    fn vru_interaction_needs_both_classes_in_one_frame() {
        let mut det = Array3::<f64>::zeros((2, 2, 6));
        let data = Array3::<f64>::zeros((2, 2, 1));
        det[[0, 0, 4]] = 0.9;
        det[[0, 0, 5]] = 0.0; // person
        det[[1, 0, 4]] = 0.9;
        det[[1, 0, 5]] = 2.0; // car
        let split = VideoTensors::new(det.clone(), data.clone()).unwrap();
        assert!(!extract_video("a.mp4", &split, 1, &params()).unwrap().has_vru_interaction);

        det[[1, 1, 4]] = 0.9;
        det[[1, 1, 5]] = 1.0; // bicycle next to the car
        let together = VideoTensors::new(det, data).unwrap();
        assert!(extract_video("a.mp4", &together, 1, &params()).unwrap().has_vru_interaction);
    }

    #[test]
    fn low_confidence_detections_are_ignored() {
        let mut det = Array3::<f64>::zeros((1, 2, 6));
        det[[0, 0, 4]] = 0.5;
        det[[0, 1, 4]] = 0.51;
        let t = VideoTensors::new(det, Array3::zeros((1, 2, 1))).unwrap();
        assert_eq!(extract_video("a.mp4", &t, 0, &params()).unwrap().scene_complexity, 1);
    }
}
