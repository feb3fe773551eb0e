//! Trajectory recording and CSV export
//!
//! Two files per run, `estimation_<unix_secs>.csv` (fused path) and
//! `validation_<unix_secs>.csv` (ground truth). Rows are `ts_ns,x,y,z` with the timestamp as
//! integer nanoseconds and coordinates to 5 decimals. A ground-truth row is written only when
//! its nanosecond timestamp also appears in the fused path.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, StampedPose};
use tracing::{info, instrument};

/// Fused and ground-truth paths accumulated during a run
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder {
    fused: Vec<StampedPose>,
    ground_truth: Vec<StampedPose>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fused(&mut self, pose: StampedPose) {
        self.fused.push(pose);
    }

    pub fn record_ground_truth(&mut self, pose: StampedPose) {
        self.ground_truth.push(pose);
    }

    pub fn fused(&self) -> &[StampedPose] {
        &self.fused
    }

    pub fn ground_truth(&self) -> &[StampedPose] {
        &self.ground_truth
    }

    /// Replace the recorded fused path, e.g. with the engine's own optimized path
    pub fn set_fused(&mut self, path: Vec<StampedPose>) {
        self.fused = path;
    }

    /// Write both CSV files into `dir`
    pub fn export(&self, dir: &Path, unix_secs: i64) -> Result<ExportedFiles, ContractError> {
        export_trajectory(dir, unix_secs, &self.fused, &self.ground_truth)
    }
}

/// Paths and row counts of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub estimation: PathBuf,
    pub validation: PathBuf,
    pub estimation_rows: usize,
    pub validation_rows: usize,
}

/// Unix seconds used to name the export files
pub fn export_stamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[instrument(
    name = "export_trajectory",
    skip(fused, ground_truth),
    fields(dir = %dir.display(), fused = fused.len(), ground_truth = ground_truth.len())
)]
pub fn export_trajectory(
    dir: &Path,
    unix_secs: i64,
    fused: &[StampedPose],
    ground_truth: &[StampedPose],
) -> Result<ExportedFiles, ContractError> {
    fs::create_dir_all(dir).map_err(|e| export_error(dir, e))?;

    let estimation = dir.join(format!("estimation_{}.csv", unix_secs));
    let validation = dir.join(format!("validation_{}.csv", unix_secs));

    let fused_stamps: HashSet<i64> = fused.iter().map(StampedPose::timestamp_ns).collect();

    let estimation_rows = write_rows(&estimation, fused.iter())?;
    let validation_rows = write_rows(
        &validation,
        ground_truth
            .iter()
            .filter(|p| fused_stamps.contains(&p.timestamp_ns())),
    )?;

    info!(
        estimation = %estimation.display(),
        validation = %validation.display(),
        estimation_rows,
        validation_rows,
        "Trajectory exported"
    );

    Ok(ExportedFiles {
        estimation,
        validation,
        estimation_rows,
        validation_rows,
    })
}

fn write_rows<'a>(
    path: &Path,
    poses: impl Iterator<Item = &'a StampedPose>,
) -> Result<usize, ContractError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| export_error(path, e))?;
    let mut out = BufWriter::new(file);

    let mut rows = 0;
    for pose in poses {
        let p = pose.translation;
        writeln!(out, "{},{:.5},{:.5},{:.5}", pose.timestamp_ns(), p.x, p.y, p.z)
            .map_err(|e| export_error(path, e))?;
        rows += 1;
    }
    out.flush().map_err(|e| export_error(path, e))?;
    Ok(rows)
}

fn export_error(path: &Path, e: std::io::Error) -> ContractError {
    ContractError::export(path.display().to_string(), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{UnitQuaternion, Vector3};
    use tempfile::tempdir;

    fn pose(t: f64, x: f64, y: f64, z: f64) -> StampedPose {
        StampedPose::new(t, Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    #[test]
    fn test_export_format() {
        let dir = tempdir().unwrap();
        let mut recorder = TrajectoryRecorder::new();
        recorder.record_fused(pose(1.5, 1.0, -2.25, 0.123456));

        let files = recorder.export(dir.path(), 1700000000).unwrap();
        assert_eq!(
            files.estimation.file_name().unwrap(),
            "estimation_1700000000.csv"
        );

        let content = fs::read_to_string(&files.estimation).unwrap();
        assert_eq!(content, "1500000000,1.00000,-2.25000,0.12346\n");
        assert_eq!(fs::read_to_string(&files.validation).unwrap(), "");
    }

    #[test]
    fn test_ground_truth_joined_on_fused_stamps() {
        let dir = tempdir().unwrap();
        let mut recorder = TrajectoryRecorder::new();
        recorder.record_fused(pose(1.0, 0.0, 0.0, 0.0));
        recorder.record_fused(pose(1.05, 0.1, 0.0, 0.0));

        recorder.record_ground_truth(pose(1.0, 0.0, 0.0, 0.0));
        recorder.record_ground_truth(pose(1.025, 0.05, 0.0, 0.0));
        recorder.record_ground_truth(pose(1.05, 0.1, 0.0, 0.0));

        let files = recorder.export(dir.path(), 42).unwrap();
        assert_eq!(files.estimation_rows, 2);
        assert_eq!(files.validation_rows, 2);

        let content = fs::read_to_string(&files.validation).unwrap();
        let stamps: Vec<&str> = content
            .lines()
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(stamps, vec!["1000000000", "1050000000"]);
    }

    #[test]
    fn test_export_appends() {
        let dir = tempdir().unwrap();
        let fused = vec![pose(2.0, 1.0, 1.0, 1.0)];

        export_trajectory(dir.path(), 7, &fused, &[]).unwrap();
        export_trajectory(dir.path(), 7, &fused, &[]).unwrap();

        let content = fs::read_to_string(dir.path().join("estimation_7.csv")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_set_fused_replaces_path() {
        let mut recorder = TrajectoryRecorder::new();
        recorder.record_fused(pose(1.0, 0.0, 0.0, 0.0));
        recorder.set_fused(vec![pose(1.0, 5.0, 0.0, 0.0), pose(2.0, 6.0, 0.0, 0.0)]);
        assert_eq!(recorder.fused().len(), 2);
        assert_eq!(recorder.fused()[0].translation.x, 5.0);
    }
}
