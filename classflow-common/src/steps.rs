//! Canonical import steps and the per-step status state machine
//!
//! The import pipeline progresses through seven fixed steps:
//! upload → extract → ai → plan → lessons → curriculum → finish
//!
//! `StepKey::ALL` is the shared contract between publisher and subscriber.
//! Both sides order steps by this constant; neither side infers the order
//! from payload contents.

use serde::{Deserialize, Serialize};

/// Canonical step key
///
/// Wire names are the lowercase variants used in snapshot payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKey {
    /// File upload accepted into storage
    Upload,
    /// Document text extraction
    Extract,
    /// AI-assisted curriculum parsing
    Ai,
    /// Study plan creation
    Plan,
    /// Lesson batch creation
    Lessons,
    /// Curriculum plan (KTP) generation
    Curriculum,
    /// Final bookkeeping
    Finish,
}

impl StepKey {
    /// Canonical step order, fixed at contract level
    pub const ALL: [StepKey; 7] = [
        StepKey::Upload,
        StepKey::Extract,
        StepKey::Ai,
        StepKey::Plan,
        StepKey::Lessons,
        StepKey::Curriculum,
        StepKey::Finish,
    ];

    /// Total number of canonical steps
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this key in canonical order
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|k| *k == self)
            .unwrap_or(usize::MAX)
    }

    /// Static human-readable description, derived from the key
    pub fn label(self) -> &'static str {
        match self {
            StepKey::Upload => "Uploading file",
            StepKey::Extract => "Extracting document text",
            StepKey::Ai => "Parsing curriculum with AI",
            StepKey::Plan => "Creating study plan",
            StepKey::Lessons => "Creating lessons",
            StepKey::Curriculum => "Generating curriculum plan",
            StepKey::Finish => "Finishing up",
        }
    }

    /// Wire name of this key (the serde representation)
    pub fn as_str(self) -> &'static str {
        match self {
            StepKey::Upload => "upload",
            StepKey::Extract => "extract",
            StepKey::Ai => "ai",
            StepKey::Plan => "plan",
            StepKey::Lessons => "lessons",
            StepKey::Curriculum => "curriculum",
            StepKey::Finish => "finish",
        }
    }
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-step status
///
/// State machine: `pending → active → done` or `active → error`.
/// A step never jumps straight from `pending` to a terminal status, so a
/// subscriber watching a live stream always sees an `active` snapshot for a
/// step before its `done`/`error` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Done,
    Error,
}

impl StepStatus {
    /// Monotonicity rank: `pending < active < {done, error}`
    ///
    /// A step's rank never decreases across the lifetime of a job.
    pub fn rank(self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::Active => 1,
            StepStatus::Done | StepStatus::Error => 2,
        }
    }

    /// Whether `next` is a legal direct transition from `self`
    pub fn can_transition_to(self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Active)
                | (StepStatus::Active, StepStatus::Done)
                | (StepStatus::Active, StepStatus::Error)
        )
    }

    /// Terminal per-step statuses
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_stable() {
        let keys: Vec<&str> = StepKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["upload", "extract", "ai", "plan", "lessons", "curriculum", "finish"]
        );
        for (i, key) in StepKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
        }
    }

    #[test]
    fn step_keys_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&StepKey::Ai).unwrap(), "\"ai\"");
        assert_eq!(
            serde_json::from_str::<StepKey>("\"curriculum\"").unwrap(),
            StepKey::Curriculum
        );
    }

    #[test]
    fn legal_transitions_only() {
        use StepStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Done));
        assert!(Active.can_transition_to(Error));

        // No skipping past active, no leaving a terminal status
        assert!(!Pending.can_transition_to(Done));
        assert!(!Pending.can_transition_to(Error));
        assert!(!Done.can_transition_to(Active));
        assert!(!Error.can_transition_to(Pending));
        assert!(!Done.can_transition_to(Error));
    }

    #[test]
    fn rank_orders_states() {
        use StepStatus::*;
        assert!(Pending.rank() < Active.rank());
        assert!(Active.rank() < Done.rank());
        assert_eq!(Done.rank(), Error.rank());
    }
}
