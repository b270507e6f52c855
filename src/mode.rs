//! Script invocation modes.
//!
//! The host tells a script what it is being run as purely through which
//! prefixed variables it injects. Instead of one wrapper class per mode, a
//! context carries a single [`Mode`] value: an enum with the mode-specific
//! payload attached, dispatched with an ordinary `match`.

use nzbkit_env::{Snapshot, parse_bool};
use serde::Serialize;

/// Environment prefix identifying a post-processing invocation.
pub const POSTPROCESS_PREFIX: &str = "NZBPP_";
/// Environment prefix identifying a queue-scan invocation.
pub const SCAN_PREFIX: &str = "NZBNP_";
/// Environment prefix identifying a scheduler invocation.
pub const SCHEDULER_PREFIX: &str = "NZBSP_";

/// What the host invoked this script as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// Called after a download finished, with the unpacked result on disk.
    PostProcess(PostProcessJob),
    /// Called while an nzb file is being picked up from the scan directory.
    Scan(ScanJob),
    /// Called on a configured schedule.
    Scheduler(SchedulerTask),
    /// Started by hand or by a caller this library doesn't recognize.
    #[default]
    None,
}

impl Mode {
    /// Detect the invocation mode from the current process environment.
    pub fn from_env() -> Self {
        Self::detect(
            &Snapshot::from_env(POSTPROCESS_PREFIX),
            &Snapshot::from_env(SCAN_PREFIX),
            &Snapshot::from_env(SCHEDULER_PREFIX),
        )
    }

    /// Detect the invocation mode from pre-built snapshots of the three mode
    /// prefixes.
    ///
    /// When a caller defines the marker variables of several modes at once,
    /// post-processing wins over scanning, and scanning over scheduling.
    pub fn detect(postprocess: &Snapshot, scan: &Snapshot, scheduler: &Snapshot) -> Self {
        if let Some(job) = PostProcessJob::from_snapshot(postprocess) {
            return Mode::PostProcess(job);
        }
        if let Some(job) = ScanJob::from_snapshot(scan) {
            return Mode::Scan(job);
        }
        if let Some(task) = SchedulerTask::from_snapshot(scheduler) {
            return Mode::Scheduler(task);
        }
        Mode::None
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Mode::None)
    }
}

/// Payload of a post-processing invocation (`NZBPP_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostProcessJob {
    /// Directory the download was unpacked into. The marker variable; always
    /// present.
    pub directory: String,
    /// Final directory, when the host already moved the result.
    pub final_directory: Option<String>,
    /// Display name of the job.
    pub nzb_name: Option<String>,
    /// Unique filename of the queued nzb; the usual container id.
    pub nzb_filename: Option<String>,
    /// Download category the job was queued under.
    pub category: Option<String>,
    /// Aggregated status of the whole job (e.g. `SUCCESS`, `FAILURE`).
    pub total_status: Option<String>,
    /// Detailed status string (e.g. `SUCCESS/UNPACK`).
    pub status: Option<String>,
    /// Status of earlier scripts in the chain.
    pub script_status: Option<String>,
}

impl PostProcessJob {
    fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
        Some(Self {
            directory: snapshot.get("DIRECTORY")?.to_string(),
            final_directory: snapshot.get("FINALDIR").map(str::to_string),
            nzb_name: snapshot.get("NZBNAME").map(str::to_string),
            nzb_filename: snapshot.get("NZBFILENAME").map(str::to_string),
            category: snapshot.get("CATEGORY").map(str::to_string),
            total_status: snapshot.get("TOTALSTATUS").map(str::to_string),
            status: snapshot.get("STATUS").map(str::to_string),
            script_status: snapshot.get("SCRIPTSTATUS").map(str::to_string),
        })
    }
}

/// Payload of a queue-scan invocation (`NZBNP_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanJob {
    /// Directory the nzb file was found in. The marker variable; always
    /// present.
    pub directory: String,
    /// Display name of the job being queued.
    pub nzb_name: Option<String>,
    /// Filename of the nzb being picked up.
    pub filename: Option<String>,
    /// Download category the file will be queued under.
    pub category: Option<String>,
    /// Queue priority.
    pub priority: Option<i64>,
    /// Whether the file is being added to the top of the queue.
    pub top: bool,
    /// Whether the file is being added in a paused state.
    pub paused: bool,
}

impl ScanJob {
    fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
        Some(Self {
            directory: snapshot.get("DIRECTORY")?.to_string(),
            nzb_name: snapshot.get("NZBNAME").map(str::to_string),
            filename: snapshot.get("FILENAME").map(str::to_string),
            category: snapshot.get("CATEGORY").map(str::to_string),
            priority: snapshot.get("PRIORITY").and_then(|raw| raw.parse().ok()),
            top: snapshot.get("TOP").and_then(parse_bool).unwrap_or(false),
            paused: snapshot.get("PAUSED").and_then(parse_bool).unwrap_or(false),
        })
    }
}

/// Payload of a scheduler invocation (`NZBSP_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerTask {
    /// Identifier of the scheduled task being run. The marker variable;
    /// always present.
    pub task_id: String,
}

impl SchedulerTask {
    fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
        Some(Self { task_id: snapshot.get("TASKID")?.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_detect_nothing() {
        let empty = Snapshot::default();
        assert_eq!(Mode::detect(&empty, &empty, &empty), Mode::None);
        assert!(Mode::detect(&empty, &empty, &empty).is_none());
    }

    #[test]
    fn test_detect_postprocess() {
        let pp = snapshot(&[
            ("DIRECTORY", "/downloads/complete/job"),
            ("NZBNAME", "A Job"),
            ("NZBFILENAME", "a.job.nzb"),
            ("CATEGORY", "tv"),
            ("TOTALSTATUS", "SUCCESS"),
            ("STATUS", "SUCCESS/UNPACK"),
        ]);
        let empty = Snapshot::default();
        let Mode::PostProcess(job) = Mode::detect(&pp, &empty, &empty) else {
            panic!("expected a post-process mode");
        };
        assert_eq!(job.directory, "/downloads/complete/job");
        assert_eq!(job.nzb_filename.as_deref(), Some("a.job.nzb"));
        assert_eq!(job.total_status.as_deref(), Some("SUCCESS"));
        assert_eq!(job.final_directory, None);
    }

    #[test]
    fn test_detect_scan() {
        let scan = snapshot(&[
            ("DIRECTORY", "/downloads/nzb"),
            ("FILENAME", "incoming.nzb"),
            ("PRIORITY", "50"),
            ("TOP", "1"),
            ("PAUSED", "0"),
        ]);
        let empty = Snapshot::default();
        let Mode::Scan(job) = Mode::detect(&empty, &scan, &empty) else {
            panic!("expected a scan mode");
        };
        assert_eq!(job.filename.as_deref(), Some("incoming.nzb"));
        assert_eq!(job.priority, Some(50));
        assert!(job.top);
        assert!(!job.paused);
    }

    #[test]
    fn test_detect_scheduler() {
        let sched = snapshot(&[("TASKID", "3")]);
        let empty = Snapshot::default();
        assert_eq!(
            Mode::detect(&empty, &empty, &sched),
            Mode::Scheduler(SchedulerTask { task_id: "3".to_string() })
        );
    }

    #[test]
    fn test_postprocess_wins_over_scan_and_scheduler() {
        let pp = snapshot(&[("DIRECTORY", "/complete")]);
        let scan = snapshot(&[("DIRECTORY", "/nzb")]);
        let sched = snapshot(&[("TASKID", "3")]);
        assert!(matches!(Mode::detect(&pp, &scan, &sched), Mode::PostProcess(_)));
        assert!(matches!(Mode::detect(&Snapshot::default(), &scan, &sched), Mode::Scan(_)));
    }

    #[test]
    fn test_marker_variable_is_required() {
        // A stray NZBNP_CATEGORY without a DIRECTORY is not a scan invocation
        let scan = snapshot(&[("CATEGORY", "tv")]);
        let empty = Snapshot::default();
        assert_eq!(Mode::detect(&empty, &scan, &empty), Mode::None);
    }
}
