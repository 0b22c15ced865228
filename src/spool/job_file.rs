//! One spooled job on disk: payload file plus state markers.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::task::Job;
use crate::types::JobId;

use super::fsync::{fsync_dir, fsync_file};
use super::Result;

/// Errors from spool file operations.
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A job with this ID is already spooled (or done and not yet cleaned).
    #[error("duplicate job ID: {0}")]
    DuplicateJob(JobId),

    /// The ID cannot be used as a filename.
    #[error("invalid job ID: {0}")]
    InvalidJobId(JobId),
}

/// Rejects IDs that would escape the spool directory or collide with the
/// marker scheme: path separators, null bytes, empty IDs and anything
/// starting with a dot.
fn validate_job_id(id: &JobId) -> Result<()> {
    let s = id.as_str();
    if s.is_empty()
        || s.contains('/')
        || s.contains('\\')
        || s.contains('\0')
        || s.starts_with('.')
    {
        return Err(SpoolError::InvalidJobId(id.clone()));
    }
    Ok(())
}

/// Handle to one job in the spool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpooledJob {
    pub id: JobId,

    /// Path to the payload file, `<id>.json`.
    pub payload_path: PathBuf,

    pub spool_dir: PathBuf,
}

impl SpooledJob {
    pub fn new(spool_dir: &Path, id: JobId) -> Self {
        let payload_path = spool_dir.join(format!("{}.json", id.as_str()));
        SpooledJob {
            id,
            payload_path,
            spool_dir: spool_dir.to_path_buf(),
        }
    }

    pub fn proc_marker_path(&self) -> PathBuf {
        self.payload_path.with_extension("json.proc")
    }

    pub fn done_marker_path(&self) -> PathBuf {
        self.payload_path.with_extension("json.done")
    }

    pub fn temp_path(&self) -> PathBuf {
        self.payload_path.with_extension("json.tmp")
    }

    /// Payload exists and no done marker.
    pub fn is_pending(&self) -> bool {
        self.payload_path.exists() && !self.done_marker_path().exists()
    }

    /// A worker has claimed the job and not finished it.
    pub fn is_processing(&self) -> bool {
        self.proc_marker_path().exists() && !self.done_marker_path().exists()
    }

    pub fn is_done(&self) -> bool {
        self.done_marker_path().exists()
    }

    /// Reads and deserializes the job payload.
    pub fn read_job(&self) -> Result<Job> {
        let bytes = std::fs::read(&self.payload_path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Writes a job to the spool atomically.
///
/// Sequence: serialize, write `<id>.json.tmp`, fsync the file, rename to
/// `<id>.json`, fsync the directory. A crash anywhere in between leaves at
/// worst an orphaned temp file, which the drain ignores.
pub fn spool_job(spool_dir: &Path, id: &JobId, job: &Job) -> Result<SpooledJob> {
    validate_job_id(id)?;
    std::fs::create_dir_all(spool_dir)?;

    let spooled = SpooledJob::new(spool_dir, id.clone());
    if spooled.payload_path.exists() || spooled.done_marker_path().exists() {
        return Err(SpoolError::DuplicateJob(id.clone()));
    }

    let payload = serde_json::to_vec(job)?;
    let temp_path = spooled.temp_path();
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&payload)?;
        fsync_file(&file)?;
    }
    std::fs::rename(&temp_path, &spooled.payload_path)?;
    fsync_dir(spool_dir)?;

    Ok(spooled)
}

/// Claims a job by creating its `.proc` marker. Idempotent.
pub fn mark_processing(job: &SpooledJob) -> Result<()> {
    create_marker(&job.proc_marker_path(), &job.spool_dir)
}

/// Finishes a job by creating its `.done` marker. Idempotent.
///
/// Call only after the job's effects are fully applied.
pub fn mark_done(job: &SpooledJob) -> Result<()> {
    create_marker(&job.done_marker_path(), &job.spool_dir)
}

fn create_marker(path: &Path, spool_dir: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    // Markers are empty, so a partially created marker is indistinguishable
    // from a complete one.
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    drop(file);
    fsync_dir(spool_dir)?;
    Ok(())
}

/// Removes a job's payload and all its markers. Missing files are fine.
pub fn remove_job(job: &SpooledJob) -> Result<()> {
    let _ = std::fs::remove_file(job.done_marker_path());
    let _ = std::fs::remove_file(job.proc_marker_path());
    let _ = std::fs::remove_file(&job.payload_path);
    let _ = std::fs::remove_file(job.temp_path());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PostId, UserId};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn sample_job() -> Job {
        Job::ScoreSpam { post: PostId(42) }
    }

    fn arb_job() -> impl Strategy<Value = Job> {
        prop_oneof![
            any::<u64>().prop_map(|n| Job::ScoreSpam { post: PostId(n) }),
            any::<u64>().prop_map(|n| Job::IndexSpam { post: PostId(n) }),
            any::<u64>().prop_map(|n| Job::ComputeAwards { user: UserId(n) }),
        ]
    }

    fn arb_job_id() -> impl Strategy<Value = JobId> {
        "[0-9]{13}-[0-9]{5}-[0-9]{6}".prop_map(JobId::new)
    }

    proptest! {
        #[test]
        fn spooled_job_reads_back_identical(id in arb_job_id(), job in arb_job()) {
            let dir = tempdir().unwrap();
            let spooled = spool_job(dir.path(), &id, &job).unwrap();

            prop_assert_eq!(spooled.read_job().unwrap(), job);
            prop_assert!(spooled.is_pending());
            prop_assert!(!spooled.is_processing());
            prop_assert!(!spooled.is_done());
            prop_assert!(!spooled.temp_path().exists());
        }

        #[test]
        fn markers_track_the_job_lifecycle(id in arb_job_id(), job in arb_job()) {
            let dir = tempdir().unwrap();
            let spooled = spool_job(dir.path(), &id, &job).unwrap();

            mark_processing(&spooled).unwrap();
            mark_processing(&spooled).unwrap();
            prop_assert!(spooled.is_processing());
            prop_assert!(!spooled.is_done());

            mark_done(&spooled).unwrap();
            mark_done(&spooled).unwrap();
            prop_assert!(spooled.is_done());
            prop_assert!(!spooled.is_pending());
            prop_assert!(!spooled.is_processing());
        }

        #[test]
        fn duplicate_ids_are_rejected(id in arb_job_id(), job in arb_job()) {
            let dir = tempdir().unwrap();
            spool_job(dir.path(), &id, &job).unwrap();
            let result = spool_job(dir.path(), &id, &job);
            prop_assert!(matches!(result, Err(SpoolError::DuplicateJob(_))));
        }

        /// A crash between temp write and rename leaves only the temp file;
        /// the job is not pending and the ID can be reused.
        #[test]
        fn crash_before_rename_is_recoverable(id in arb_job_id(), job in arb_job()) {
            let dir = tempdir().unwrap();
            let spooled = SpooledJob::new(dir.path(), id.clone());
            std::fs::write(spooled.temp_path(), b"{partial").unwrap();

            prop_assert!(!spooled.is_pending());
            prop_assert!(spool_job(dir.path(), &id, &job).is_ok());
        }

        /// A crash mid-processing leaves payload plus `.proc`; the job is
        /// still pending once startup cleanup removes the marker.
        #[test]
        fn crash_during_processing_keeps_payload(id in arb_job_id(), job in arb_job()) {
            let dir = tempdir().unwrap();
            let spooled = spool_job(dir.path(), &id, &job).unwrap();
            mark_processing(&spooled).unwrap();

            prop_assert!(spooled.is_pending());
            prop_assert!(spooled.is_processing());
            prop_assert_eq!(spooled.read_job().unwrap(), job);
        }
    }

    #[test]
    fn remove_job_deletes_everything() {
        let dir = tempdir().unwrap();
        let spooled = spool_job(dir.path(), &JobId::new("job-1"), &sample_job()).unwrap();
        mark_processing(&spooled).unwrap();
        mark_done(&spooled).unwrap();

        remove_job(&spooled).unwrap();
        assert!(!spooled.payload_path.exists());
        assert!(!spooled.proc_marker_path().exists());
        assert!(!spooled.done_marker_path().exists());
    }

    #[test]
    fn done_marker_blocks_respooling_even_without_payload() {
        let dir = tempdir().unwrap();
        let id = JobId::new("job-2");
        let spooled = spool_job(dir.path(), &id, &sample_job()).unwrap();
        mark_done(&spooled).unwrap();
        std::fs::remove_file(&spooled.payload_path).unwrap();

        let result = spool_job(dir.path(), &id, &sample_job());
        assert!(matches!(result, Err(SpoolError::DuplicateJob(_))));
    }

    #[test]
    fn spool_creates_the_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("spool").join("jobs");
        let spooled = spool_job(&nested, &JobId::new("job-3"), &sample_job()).unwrap();
        assert!(spooled.payload_path.exists());
    }

    #[test]
    fn unsafe_job_ids_are_rejected() {
        let dir = tempdir().unwrap();
        for bad in ["", "../../etc/passwd", "a\\b", "a\0b", ".hidden", ".", ".."] {
            let result = spool_job(dir.path(), &JobId::new(bad), &sample_job());
            assert!(
                matches!(result, Err(SpoolError::InvalidJobId(_))),
                "accepted {bad:?}"
            );
        }
    }
}
