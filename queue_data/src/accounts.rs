use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::{
    job::QueueLine,
    slurm::{Account, JobState},
    FIELD_DELIMITER,
};

/// Per-account aggregate of one queue listing.
pub type AccountMap = BTreeMap<Account, JobMetrics>;

/// Job and resource counters of a single account. Memory is in megabytes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobMetrics {
    pub pending: u64,
    pub pending_cpus: u64,
    pub pending_memory: f64,
    pub running: u64,
    pub running_cpus: u64,
    pub running_memory: f64,
    pub suspended: u64,
}

impl JobMetrics {
    /// Count one job. Suspended jobs don't hold or wait for resources, so only the job count
    /// changes for them.
    ///
    /// Sums saturate: an absurd value from `squeue` must not take down the scrape.
    pub fn record(&mut self, state: JobState, cpus: u64, memory: f64) {
        match state {
            JobState::Pending => {
                self.pending = self.pending.saturating_add(1);
                self.pending_cpus = self.pending_cpus.saturating_add(cpus);
                self.pending_memory += memory;
            }
            JobState::Running => {
                self.running = self.running.saturating_add(1);
                self.running_cpus = self.running_cpus.saturating_add(cpus);
                self.running_memory += memory;
            }
            JobState::Suspended => self.suspended = self.suspended.saturating_add(1),
            JobState::Other => {}
        }
    }

    /// `true` if every counter is zero, i.e. nothing would be exported for this account.
    pub fn is_empty(&self) -> bool {
        *self == JobMetrics::default()
    }
}

/// Aggregate raw `squeue -o "%A|%a|%T|%C|%m"` output per account.
///
/// Lines without a `|` are noise and skipped silently. Lines with too few fields are skipped with
/// a warning and don't create an account. Every other line creates its account, even if the job's
/// state isn't one we count.
pub fn parse_accounts_metrics(input: &[u8]) -> AccountMap {
    let input = String::from_utf8_lossy(input);
    let mut accounts = AccountMap::new();

    for (i, line) in input.split('\n').enumerate() {
        let line = line.trim_end_matches('\r');
        if !line.contains(FIELD_DELIMITER) {
            continue;
        }
        let job = match QueueLine::parse(line) {
            Ok(job) => job,
            Err(e) => {
                warn!(line = i + 1, "skipping malformed queue line: {e}");
                continue;
            }
        };
        trace!(?job, "queue line");

        accounts
            .entry(Account::from(job.account))
            .or_default()
            .record(JobState::classify(job.state), job.cpus, job.memory);
    }

    accounts
}
