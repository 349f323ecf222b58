pub mod config;
pub mod metrics;
pub mod server;

pub use metrics::{AccountDescs, AccountsCollector, ExporterMetrics, ScrapeError};
pub use server::{app, AppState};
