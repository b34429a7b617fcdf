//! Job status and the transition rules of the processing state machine.

use serde::{Deserialize, Serialize};

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Queued,
    /// Job is actively being processed
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Error,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// Parse a status from its string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no more transitions permitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Check whether a transition to `next` is legal.
    ///
    /// Legal edges:
    /// - `Queued -> Processing` (worker picks the job up)
    /// - `Processing -> Completed` / `Processing -> Error`
    /// - `Queued -> Error` (submission-side failure before any worker ran)
    /// - `Processing -> Processing` (at-least-once redelivery of an
    ///   in-flight job after a worker crash)
    ///
    /// Terminal states have no outgoing edges.
    pub fn can_transition(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Processing) => true,
            (JobStatus::Queued, JobStatus::Error) => true,
            (JobStatus::Processing, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [JobStatus::Completed, JobStatus::Error] {
            for to in [
                JobStatus::Queued,
                JobStatus::Processing,
                JobStatus::Completed,
                JobStatus::Error,
            ] {
                assert!(!from.can_transition(to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(JobStatus::Queued.can_transition(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition(JobStatus::Error));
    }

    #[test]
    fn redelivery_self_edge_is_legal() {
        assert!(JobStatus::Processing.can_transition(JobStatus::Processing));
        assert!(!JobStatus::Queued.can_transition(JobStatus::Queued));
    }

    #[test]
    fn no_regression_edges() {
        assert!(!JobStatus::Processing.can_transition(JobStatus::Queued));
        assert!(!JobStatus::Completed.can_transition(JobStatus::Processing));
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("stale"), None);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
