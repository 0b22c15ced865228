//! Finding work in the spool directory.

use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::types::JobId;

use super::fsync::fsync_dir;
use super::job_file::{remove_job, SpooledJob};
use super::Result;

/// Returns every pending job, sorted by ID.
///
/// In-progress jobs (with a live `.proc` marker) are excluded; returning
/// them while a worker holds the claim would double-process. Orphaned
/// `.proc` markers from a crashed run are put back into rotation by
/// [`cleanup_interrupted`], which must run before workers start.
pub fn drain_pending(spool_dir: &Path) -> Result<Vec<SpooledJob>> {
    if !spool_dir.exists() {
        return Ok(Vec::new());
    }

    let mut pending = Vec::new();
    for entry in std::fs::read_dir(spool_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            if let Some(id) = job_id_from_payload(&path) {
                let job = SpooledJob::new(spool_dir, id);
                if job.is_pending() && !job.is_processing() {
                    pending.push(job);
                }
            }
        }
    }

    // Sorted for deterministic replay order; IDs embed the submission time.
    pending.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    Ok(pending)
}

/// Removes `.proc` markers left by a crashed run, making those jobs pending
/// again.
///
/// Must run exactly once at startup, before any worker claims jobs. While
/// workers are live, a `.proc` without `.done` means in progress, not
/// crashed.
pub fn cleanup_interrupted(spool_dir: &Path) -> Result<()> {
    if !spool_dir.exists() {
        return Ok(());
    }

    let mut removed_any = false;
    for entry in std::fs::read_dir(spool_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "proc")
            && !path.with_extension("done").exists()
            && std::fs::remove_file(&path).is_ok()
        {
            removed_any = true;
        }
    }

    // The deletions themselves must survive a crash, or the markers come
    // back and block reprocessing.
    if removed_any {
        fsync_dir(spool_dir)?;
    }
    Ok(())
}

/// Number of pending jobs, without reading any payloads.
pub fn count_pending(spool_dir: &Path) -> Result<usize> {
    Ok(drain_pending(spool_dir)?.len())
}

/// Deletes done jobs whose `.done` marker is older than the grace period.
/// Returns the number removed.
///
/// The grace period keeps recently finished jobs around so their IDs still
/// block accidental resubmission.
pub fn cleanup_done_jobs(spool_dir: &Path, grace_period: Duration) -> Result<usize> {
    if !spool_dir.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(grace_period)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0;
    for entry in std::fs::read_dir(spool_dir)? {
        let path = entry?.path();
        if !path.extension().is_some_and(|e| e == "done") {
            continue;
        }
        let old_enough = path
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);
        if !old_enough {
            continue;
        }
        // The marker is <id>.json.done; strip both extensions.
        let id = path
            .file_stem()
            .map(Path::new)
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str());
        if let Some(id) = id {
            remove_job(&SpooledJob::new(spool_dir, JobId::new(id)))?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn job_id_from_payload(path: &Path) -> Option<JobId> {
    let stem = path.file_stem()?.to_str()?;
    Some(JobId::new(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::job_file::{mark_done, mark_processing, spool_job};
    use crate::task::Job;
    use crate::types::PostId;
    use tempfile::tempdir;

    fn job(n: u64) -> Job {
        Job::ScoreSpam { post: PostId(n) }
    }

    #[test]
    fn drain_of_missing_or_empty_directory_is_empty() {
        let dir = tempdir().unwrap();
        assert!(drain_pending(dir.path()).unwrap().is_empty());
        assert!(drain_pending(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn drain_returns_pending_jobs_in_id_order() {
        let dir = tempdir().unwrap();
        spool_job(dir.path(), &JobId::new("job-b"), &job(2)).unwrap();
        spool_job(dir.path(), &JobId::new("job-a"), &job(1)).unwrap();
        spool_job(dir.path(), &JobId::new("job-c"), &job(3)).unwrap();

        let pending = drain_pending(dir.path()).unwrap();
        let ids: Vec<&str> = pending.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["job-a", "job-b", "job-c"]);
    }

    #[test]
    fn drain_excludes_done_and_in_progress_jobs() {
        let dir = tempdir().unwrap();
        let done = spool_job(dir.path(), &JobId::new("done"), &job(1)).unwrap();
        mark_done(&done).unwrap();
        let claimed = spool_job(dir.path(), &JobId::new("claimed"), &job(2)).unwrap();
        mark_processing(&claimed).unwrap();
        spool_job(dir.path(), &JobId::new("waiting"), &job(3)).unwrap();

        let pending = drain_pending(dir.path()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "waiting");
    }

    #[test]
    fn drain_ignores_temp_and_unrelated_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("orphan.json.tmp"), b"{partial").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"scratch").unwrap();
        spool_job(dir.path(), &JobId::new("real"), &job(1)).unwrap();

        let pending = drain_pending(dir.path()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "real");
    }

    #[test]
    fn startup_cleanup_requeues_interrupted_jobs() {
        let dir = tempdir().unwrap();
        let interrupted = spool_job(dir.path(), &JobId::new("mid"), &job(1)).unwrap();
        mark_processing(&interrupted).unwrap();
        let finished = spool_job(dir.path(), &JobId::new("fin"), &job(2)).unwrap();
        mark_processing(&finished).unwrap();
        mark_done(&finished).unwrap();

        assert!(drain_pending(dir.path()).unwrap().is_empty());

        cleanup_interrupted(dir.path()).unwrap();

        let pending = drain_pending(dir.path()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "mid");
        // The finished job keeps its markers.
        assert!(finished.is_done());
    }

    #[test]
    fn count_pending_matches_drain() {
        let dir = tempdir().unwrap();
        spool_job(dir.path(), &JobId::new("one"), &job(1)).unwrap();
        let two = spool_job(dir.path(), &JobId::new("two"), &job(2)).unwrap();
        mark_done(&two).unwrap();

        assert_eq!(count_pending(dir.path()).unwrap(), 1);
    }

    #[test]
    fn done_cleanup_respects_the_grace_period() {
        let dir = tempdir().unwrap();
        let spooled = spool_job(dir.path(), &JobId::new("old"), &job(1)).unwrap();
        mark_done(&spooled).unwrap();

        let removed = cleanup_done_jobs(dir.path(), Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);
        assert!(spooled.payload_path.exists());

        let removed = cleanup_done_jobs(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(!spooled.payload_path.exists());
        assert!(!spooled.done_marker_path().exists());
    }
}
