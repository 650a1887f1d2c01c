//! Per-video detection and feature tensors.
//!
//! Each archive is an `.npz` file with two arrays:
//!
//! * `det`  - `(frames, objects, >=6)`: box (4), confidence, class id
//! * `data` - `(frames, objects, D)`: appearance feature per object slot
//!
//! Both float32 and float64 archives are accepted; values are widened to
//! `f64` on load.

use std::fs::File;
use std::path::Path;

use ndarray::{Array3, ArrayView1, ArrayView2, Ix3, OwnedRepr, s};
use ndarray_npy::NpzReader;

use crate::error::{CoreError, CoreResult};

/// Column of the detection confidence in the `det` array.
pub const CONFIDENCE_COLUMN: usize = 4;
/// Column of the class id in the `det` array.
pub const CLASS_COLUMN: usize = 5;

const DET_ENTRY: &str = "det";
const DATA_ENTRY: &str = "data";

/// Detection and feature tensors of one video.
#[derive(Debug, Clone)]
pub struct VideoTensors {
    det: Array3<f64>,
    data: Array3<f64>,
}

impl VideoTensors {
    /// Wraps already loaded arrays after checking their shapes.
    pub fn new(det: Array3<f64>, data: Array3<f64>) -> CoreResult<Self> {
        let (_, det_objects, det_cols) = det.dim();
        let (_, data_objects, _) = data.dim();
        if det_cols <= CLASS_COLUMN {
            return Err(CoreError::Npz(format!(
                "det needs at least {} columns per detection, found {det_cols}",
                CLASS_COLUMN + 1
            )));
        }
        if det_objects == 0 || data_objects == 0 {
            return Err(CoreError::Npz("archive has no object slots".to_string()));
        }
        if det_objects != data_objects {
            return Err(CoreError::Npz(format!(
                "object slot mismatch: det has {det_objects}, data has {data_objects}"
            )));
        }
        Ok(Self { det, data })
    }

    /// Reads `det` and `data` from an `.npz` archive.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let file = File::open(path)?;
        let mut npz = NpzReader::new(file).map_err(|e| npz_error(path, e))?;
        let names = npz.names().map_err(|e| npz_error(path, e))?;
        let det_name = entry_name(&names, DET_ENTRY)
            .ok_or_else(|| CoreError::Npz(format!("{}: missing 'det' array", path.display())))?;
        let data_name = entry_name(&names, DATA_ENTRY)
            .ok_or_else(|| CoreError::Npz(format!("{}: missing 'data' array", path.display())))?;

        let det = read_array(&mut npz, &det_name, path)?;
        let data = read_array(&mut npz, &data_name, path)?;
        Self::new(det, data)
    }

    /// Frames usable for extraction: the shorter of the two arrays.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.det.dim().0.min(self.data.dim().0)
    }

    /// Detections of frame `t`, one row per object slot.
    #[must_use]
    pub fn detections(&self, t: usize) -> ArrayView2<'_, f64> {
        self.det.slice(s![t, .., ..])
    }

    /// Feature of object slot `slot` in frame `t`.
    #[must_use]
    pub fn feature(&self, t: usize, slot: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![t, slot, ..])
    }

    /// Feature vector length D.
    #[must_use]
    pub fn feature_dim(&self) -> usize {
        self.data.dim().2
    }
}

fn entry_name(names: &[String], base: &str) -> Option<String> {
    let with_ext = format!("{base}.npy");
    names
        .iter()
        .find(|n| n.as_str() == with_ext || n.as_str() == base)
        .cloned()
}

fn read_array(npz: &mut NpzReader<File>, name: &str, path: &Path) -> CoreResult<Array3<f64>> {
    match npz.by_name::<OwnedRepr<f32>, Ix3>(name) {
        Ok(arr) => Ok(arr.mapv(f64::from)),
        Err(_) => npz
            .by_name::<OwnedRepr<f64>, Ix3>(name)
            .map_err(|e| npz_error(path, e)),
    }
}

fn npz_error(path: &Path, err: impl std::fmt::Display) -> CoreError {
    CoreError::Npz(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use ndarray_npy::NpzWriter;
    use tempfile::tempdir;

    #[test]
    fn loads_float32_archive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("000001.npz");
        let det = Array3::<f32>::from_elem((4, 2, 6), 0.9);
        let data = Array3::<f32>::from_elem((5, 2, 3), 1.5);
        let mut npz = NpzWriter::new(File::create(&path)?);
        npz.add_array("det", &det)?;
        npz.add_array("data", &data)?;
        npz.finish()?;

        let tensors = VideoTensors::load(&path)?;
        assert_eq!(tensors.frame_count(), 4);
        assert_eq!(tensors.feature_dim(), 3);
        assert_eq!(tensors.feature(0, 1)[2], 1.5);
        Ok(())
    }

    #[test]
    fn loads_float64_archive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("000002.npz");
        let mut npz = NpzWriter::new(File::create(&path)?);
        npz.add_array("det", &Array3::<f64>::zeros((2, 1, 6)))?;
        npz.add_array("data", &Array3::<f64>::ones((2, 1, 4)))?;
        npz.finish()?;

        let tensors = VideoTensors::load(&path)?;
        assert_eq!(tensors.frame_count(), 2);
        Ok(())
    }

    #[test]
    fn rejects_missing_array() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("000003.npz");
        let mut npz = NpzWriter::new(File::create(&path)?);
        npz.add_array("det", &Array3::<f32>::zeros((2, 1, 6)))?;
        npz.finish()?;

        assert!(matches!(VideoTensors::load(&path), Err(CoreError::Npz(_))));
        Ok(())
    }

    #[test]
    fn rejects_bad_shapes() {
        let narrow = VideoTensors::new(Array3::zeros((2, 1, 5)), Array3::zeros((2, 1, 4)));
        assert!(narrow.is_err());
        let mismatch = VideoTensors::new(Array3::zeros((2, 2, 6)), Array3::zeros((2, 3, 4)));
        assert!(mismatch.is_err());
        let empty = VideoTensors::new(Array3::zeros((2, 0, 6)), Array3::zeros((2, 0, 4)));
        assert!(empty.is_err());
    }

    #[test]
    fn corrupt_file_is_npz_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.npz");
        std::fs::write(&path, b"not a zip archive")?;
        assert!(matches!(VideoTensors::load(&path), Err(CoreError::Npz(_))));
        Ok(())
    }
}
