use std::fmt::Debug;

use derive_more::derive::{Deref, Display, From, Into};

/// Slurm account (`%a` in `squeue`). Taken verbatim from the queue listing, so comparisons are
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Display, From, Into)]
pub struct Account(pub String);

impl From<&str> for Account {
    fn from(value: &str) -> Self {
        Account(value.to_owned())
    }
}

/// The job states we count. Everything else (`COMPLETING`, `CONFIGURING`, `PREEMPTED`, ...) ends
/// up in [`JobState::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Other,
}

impl JobState {
    /// Classify a raw `%T` value by prefix, ignoring case.
    ///
    /// Matching on the prefix (and not the whole string) keeps states with a trailing qualifier
    /// (`RUNNING+`, `PENDING (Resources)`, ...) in their bucket.
    pub fn classify(raw: &str) -> Self {
        const PREFIXES: [(&str, JobState); 3] = [
            ("pending", JobState::Pending),
            ("running", JobState::Running),
            ("suspended", JobState::Suspended),
        ];

        let state = raw.to_lowercase();
        PREFIXES
            .iter()
            .find(|(prefix, _)| state.starts_with(prefix))
            .map_or(JobState::Other, |&(_, job_state)| job_state)
    }
}
