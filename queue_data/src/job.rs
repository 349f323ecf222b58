use itertools::Itertools as _;

use crate::{FIELD_DELIMITER, MEMORY_UNIT_SUFFIX};

/// Number of `|`-separated fields per line (`%A|%a|%T|%C|%m`).
pub const FIELD_COUNT: usize = 5;

/// One job as listed by `squeue`, borrowed from the raw output.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueLine<'a> {
    pub id: &'a str,
    pub account: &'a str,
    pub state: &'a str,
    pub cpus: u64,
    /// megabytes
    pub memory: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("expected {} `|`-separated fields, got {}", FIELD_COUNT, .0)]
    MissingFields(usize),
}

impl<'a> QueueLine<'a> {
    /// Parse `id|account|state|cpus|memoryM`.
    ///
    /// Only a missing field is an error. Numbers that don't parse count as `0`, since a single
    /// odd value shouldn't hide the rest of the queue.
    pub fn parse(line: &'a str) -> Result<Self, LineError> {
        let fields = line.split(FIELD_DELIMITER).collect_vec();
        match fields.as_slice() {
            &[id, account, state, cpus, memory, ..] => Ok(QueueLine {
                id,
                account,
                state,
                cpus: parse_cpus(cpus),
                memory: parse_memory(memory),
            }),
            _ => Err(LineError::MissingFields(fields.len())),
        }
    }
}

/// Slurm prints whole numbers, but `4.0` still means four cpus. Fractions are truncated, values
/// beyond `u64::MAX` clamp to it.
fn parse_cpus(raw: &str) -> u64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|cpus| cpus.is_finite() && *cpus >= 0.0)
        .map_or(0, |cpus| cpus as u64)
}

/// `--noconvert` makes slurm always print megabytes with a trailing `M`. Any other unit is not
/// converted and ends up as `0`.
fn parse_memory(raw: &str) -> f64 {
    let raw = raw.trim();
    raw.strip_suffix(MEMORY_UNIT_SUFFIX)
        .unwrap_or(raw)
        .parse::<f64>()
        .ok()
        .filter(|mb| mb.is_finite() && *mb >= 0.0)
        .unwrap_or(0.0)
}
