//! The pipeline stage enum and its transition rules.
//!
//! A work item advances through a fixed forward-only order:
//!
//! ```text
//! Downloaded -> Processing -> Processed -> MetadataReady -> Queued -> Uploaded
//! ```
//!
//! `Processing` and `Queued` are in-flight markers recorded when a stage
//! processor reports that it has *started* work. They are optional: a
//! completion report is legal both from the marker and from the stable stage
//! immediately before it. `Failed` is a terminal stage reachable from any
//! non-terminal stage; the only way out is an explicit requeue.

use serde::{Deserialize, Serialize};

/// One named step in the fixed pipeline a work item passes through.
///
/// Variant order is pipeline order, so `Ord` sorts stages by progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Download engine has acquired the source clip.
    Downloaded,
    /// Process engine is working on the clip (in-flight marker).
    Processing,
    /// Process engine has written the transcoded artifact.
    Processed,
    /// Metadata generator has produced title/description/tags.
    MetadataReady,
    /// Upload scheduler has accepted the clip (in-flight marker).
    Queued,
    /// Upload finished. Terminal.
    Uploaded,
    /// Abandoned unless requeued. Terminal, reachable from any other stage.
    Failed,
}

impl Stage {
    /// Whether a transition from `self` to `next` follows the pipeline order.
    ///
    /// In-flight markers may be skipped: `Downloaded -> Processed` and
    /// `MetadataReady -> Uploaded` are legal. Transitions into `Failed` are
    /// not handled here; failing an item is a separate forced operation.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Downloaded, Processing)
                | (Downloaded, Processed)
                | (Processing, Processed)
                | (Processed, MetadataReady)
                | (MetadataReady, Queued)
                | (MetadataReady, Uploaded)
                | (Queued, Uploaded)
        )
    }

    /// Terminal stages accept no further transitions except requeue from `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Uploaded | Stage::Failed)
    }

    /// In-flight markers set on a stage *start* report rather than completion.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Stage::Processing | Stage::Queued)
    }

    /// The stable stage an in-flight marker falls back to if the session that
    /// set it never reported completion.
    pub fn settled(self) -> Stage {
        match self {
            Stage::Processing => Stage::Downloaded,
            Stage::Queued => Stage::MetadataReady,
            other => other,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloaded => write!(f, "downloaded"),
            Self::Processing => write!(f, "processing"),
            Self::Processed => write!(f, "processed"),
            Self::MetadataReady => write!(f, "metadata_ready"),
            Self::Queued => write!(f, "queued"),
            Self::Uploaded => write!(f, "uploaded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downloaded" => Ok(Self::Downloaded),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "metadata_ready" => Ok(Self::MetadataReady),
            "queued" => Ok(Self::Queued),
            "uploaded" => Ok(Self::Uploaded),
            "failed" => Ok(Self::Failed),
            _ => Err(crate::Error::invalid_input(format!("Invalid stage: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(Stage::Downloaded.can_advance_to(Stage::Processing));
        assert!(Stage::Downloaded.can_advance_to(Stage::Processed));
        assert!(Stage::Processing.can_advance_to(Stage::Processed));
        assert!(Stage::Processed.can_advance_to(Stage::MetadataReady));
        assert!(Stage::MetadataReady.can_advance_to(Stage::Queued));
        assert!(Stage::MetadataReady.can_advance_to(Stage::Uploaded));
        assert!(Stage::Queued.can_advance_to(Stage::Uploaded));
    }

    #[test]
    fn test_no_backward_or_skipping_transitions() {
        assert!(!Stage::Processed.can_advance_to(Stage::Downloaded));
        assert!(!Stage::Downloaded.can_advance_to(Stage::MetadataReady));
        assert!(!Stage::Downloaded.can_advance_to(Stage::Uploaded));
        assert!(!Stage::Processing.can_advance_to(Stage::MetadataReady));
        assert!(!Stage::Uploaded.can_advance_to(Stage::Downloaded));
        // Duplicate reports never advance
        for stage in [Stage::Downloaded, Stage::Processed, Stage::Uploaded] {
            assert!(!stage.can_advance_to(stage));
        }
    }

    #[test]
    fn test_failed_is_not_an_advance_target() {
        for stage in [Stage::Downloaded, Stage::Processing, Stage::Queued] {
            assert!(!stage.can_advance_to(Stage::Failed));
        }
    }

    #[test]
    fn test_terminal_and_in_flight() {
        assert!(Stage::Uploaded.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::Queued.is_terminal());

        assert!(Stage::Processing.is_in_flight());
        assert!(Stage::Queued.is_in_flight());
        assert!(!Stage::Processed.is_in_flight());
    }

    #[test]
    fn test_settled() {
        assert_eq!(Stage::Processing.settled(), Stage::Downloaded);
        assert_eq!(Stage::Queued.settled(), Stage::MetadataReady);
        assert_eq!(Stage::Uploaded.settled(), Stage::Uploaded);
    }

    #[test]
    fn test_string_round_trip() {
        for stage in [
            Stage::Downloaded,
            Stage::Processing,
            Stage::Processed,
            Stage::MetadataReady,
            Stage::Queued,
            Stage::Uploaded,
            Stage::Failed,
        ] {
            let parsed: Stage = stage.to_string().parse().unwrap();
            assert_eq!(parsed, stage);
        }
        assert!("encoding".parse::<Stage>().is_err());
    }

    #[test]
    fn test_ord_matches_pipeline_order() {
        assert!(Stage::Downloaded < Stage::Processed);
        assert!(Stage::Processed < Stage::Uploaded);
    }
}
