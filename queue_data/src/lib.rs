//! Reading the Slurm job queue and aggregating it per account.
//!
//! Everything here is synchronous: [`QueueSource::fetch`] blocks until the listing is available,
//! [`parse_accounts_metrics`] is a pure function over the raw bytes.
pub mod accounts;
pub mod job;
pub mod slurm;
pub mod squeue;

pub use accounts::{parse_accounts_metrics, AccountMap, JobMetrics};
pub use slurm::{Account, JobState};
pub use squeue::{FetchError, FileSource, QueueSource, Squeue, StaticSource};

pub const FIELD_DELIMITER: char = '|';
/// Memory is always requested in megabytes (`--noconvert`)
pub const MEMORY_UNIT_SUFFIX: char = 'M';
