use std::{collections::HashMap, sync::Arc};

use prometheus::{
    core::{Collector as _, Desc},
    proto::MetricFamily,
    Gauge, GaugeVec, IntCounter, Opts, Registry,
};
use queue_data::{parse_accounts_metrics, AccountMap, FetchError, JobMetrics, QueueSource};
use tracing::debug;

pub const ACCOUNT_LABEL: &str = "account";

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("fetching the job queue")]
    Fetch(#[from] FetchError),
    #[error("building metrics")]
    Metrics(#[from] prometheus::Error),
}

/// One exported counter of [`JobMetrics`].
struct AccountMetric {
    name: &'static str,
    help: &'static str,
    value: fn(&JobMetrics) -> f64,
}

const ACCOUNT_METRICS: [AccountMetric; 7] = [
    AccountMetric {
        name: "slurm_account_jobs_pending",
        help: "Pending jobs for account",
        value: |m| m.pending as f64,
    },
    AccountMetric {
        name: "slurm_account_cpus_pending",
        help: "Pending cpus for account",
        value: |m| m.pending_cpus as f64,
    },
    AccountMetric {
        name: "slurm_account_memory_pending",
        help: "Pending memory for account in megabytes",
        value: |m| m.pending_memory,
    },
    AccountMetric {
        name: "slurm_account_jobs_running",
        help: "Running jobs for account",
        value: |m| m.running as f64,
    },
    AccountMetric {
        name: "slurm_account_cpus_running",
        help: "Running cpus for account",
        value: |m| m.running_cpus as f64,
    },
    AccountMetric {
        name: "slurm_account_memory_running",
        help: "Running memory for account in megabytes",
        value: |m| m.running_memory,
    },
    AccountMetric {
        name: "slurm_account_jobs_suspended",
        help: "Suspended jobs for account",
        value: |m| m.suspended as f64,
    },
];

/// The seven per-account descriptors, in [`ACCOUNT_METRICS`] order. Built once, never changed.
#[derive(Debug, Clone)]
pub struct AccountDescs {
    descs: Vec<Desc>,
}

impl AccountDescs {
    pub fn new() -> prometheus::Result<Self> {
        let descs = ACCOUNT_METRICS
            .iter()
            .map(|metric| {
                Desc::new(
                    metric.name.to_owned(),
                    metric.help.to_owned(),
                    vec![ACCOUNT_LABEL.to_owned()],
                    HashMap::new(),
                )
            })
            .collect::<prometheus::Result<Vec<_>>>()?;
        Ok(AccountDescs { descs })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Desc> {
        self.descs.iter()
    }
}

/// Exports the job queue per account, fetching it fresh on every scrape.
#[derive(Clone)]
pub struct AccountsCollector {
    source: Arc<dyn QueueSource>,
    descs: AccountDescs,
}

impl AccountsCollector {
    pub fn new(source: Arc<dyn QueueSource>, descs: AccountDescs) -> Self {
        AccountsCollector { source, descs }
    }

    /// The seven descriptors. Never fetches.
    pub fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    /// fetch → aggregate → observe. A fetch error fails the whole scrape.
    ///
    /// Not a `prometheus::core::Collector`: its `collect` can't report a failed fetch, and an empty
    /// answer would look like an empty queue.
    pub fn try_collect(&self) -> Result<Vec<MetricFamily>, ScrapeError> {
        let raw = self.source.fetch()?;
        let accounts = parse_accounts_metrics(&raw);
        debug!(accounts = accounts.len(), "aggregated job queue");
        Ok(self.observe(&accounts)?)
    }

    /// One gauge per account and counter, skipping zeros. Metrics without any non-zero value are
    /// left out entirely.
    pub fn observe(&self, accounts: &AccountMap) -> prometheus::Result<Vec<MetricFamily>> {
        let mut families = Vec::new();
        for (metric, desc) in ACCOUNT_METRICS.iter().zip(self.descs.iter()) {
            let gauges = GaugeVec::new(Opts::new(desc.fq_name.clone(), desc.help.clone()), &[ACCOUNT_LABEL])?;
            let mut observed = false;
            for (account, job_metrics) in accounts {
                let value = (metric.value)(job_metrics);
                if value > 0.0 {
                    gauges.with_label_values(&[account.as_str()]).set(value);
                    observed = true;
                }
            }
            if observed {
                families.extend(gauges.collect());
            }
        }
        Ok(families)
    }
}

/// Metrics about the exporter itself.
#[derive(Clone)]
pub struct ExporterMetrics {
    pub registry: Registry,
    pub scrapes: IntCounter,
    pub scrape_errors: IntCounter,
    pub scrape_duration: Gauge,
}

impl ExporterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let scrapes = IntCounter::new("slurm_exporter_scrapes_total", "Scrapes of the job queue")?;
        let scrape_errors =
            IntCounter::new("slurm_exporter_scrape_errors_total", "Scrapes that failed to fetch the job queue")?;
        let scrape_duration = Gauge::new(
            "slurm_exporter_scrape_duration_seconds",
            "Duration of the last fetch and aggregation of the job queue",
        )?;
        registry.register(Box::new(scrapes.clone()))?;
        registry.register(Box::new(scrape_errors.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(ExporterMetrics { registry, scrapes, scrape_errors, scrape_duration })
    }
}
