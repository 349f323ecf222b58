use std::{sync::Arc, time::Instant};

use itertools::Itertools as _;
use poem::{
    get, handler,
    http::StatusCode,
    web::{Data, Html},
    Endpoint, EndpointExt as _, Response, Route,
};
use prometheus::{Encoder as _, TextEncoder};
use queue_data::QueueSource;
use tracing::{debug, error};

use crate::{
    config::FetchErrorPolicy,
    metrics::{AccountDescs, AccountsCollector, ExporterMetrics, ScrapeError},
};

/// Everything a scrape needs. Immutable apart from the (atomic) self-metrics.
pub struct AppState {
    pub accounts: AccountsCollector,
    pub exporter: ExporterMetrics,
    pub on_fetch_error: FetchErrorPolicy,
}

impl AppState {
    pub fn new(source: Arc<dyn QueueSource>, on_fetch_error: FetchErrorPolicy) -> prometheus::Result<Self> {
        Ok(AppState {
            accounts: AccountsCollector::new(source, AccountDescs::new()?),
            exporter: ExporterMetrics::new()?,
            on_fetch_error,
        })
    }

    /// Run one fetch + aggregate cycle and encode it, followed by the exporter's own metrics.
    /// Blocks until the queue listing is available.
    pub fn scrape(&self) -> Result<String, ScrapeError> {
        let start = Instant::now();
        self.exporter.scrapes.inc();
        let accounts = self.accounts.try_collect().inspect_err(|_| self.exporter.scrape_errors.inc())?;
        self.exporter.scrape_duration.set(start.elapsed().as_secs_f64());

        let families = accounts.into_iter().chain(self.exporter.registry.gather()).collect_vec();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        // the text format is always UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

pub fn app(state: Arc<AppState>) -> impl Endpoint {
    Route::new()
        .at("/", get(index))
        .at("/metrics", get(metrics))
        .data(state)
        .around(|route, request| async move {
            debug!(?request, "received request");
            route.call(request).await
        })
}

fn err_into_500(error: impl std::fmt::Display) -> poem::Error {
    error!("Error during scrape: {error:#}");
    poem::Error::from_string(format!("{error:#}"), StatusCode::INTERNAL_SERVER_ERROR)
}

#[handler]
fn index() -> Html<&'static str> {
    Html(
        "<html><head><title>Slurm Account Exporter</title></head>\
         <body><h1>Slurm Account Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body></html>",
    )
}

#[handler]
async fn metrics(Data(state): Data<&Arc<AppState>>) -> poem::Result<Response> {
    let state = Arc::clone(state);
    let policy = state.on_fetch_error;
    let scrape = tokio::task::spawn_blocking(move || state.scrape()).await.map_err(err_into_500)?;

    match scrape {
        Ok(body) => Ok(Response::builder().content_type(TextEncoder::new().format_type()).body(body)),
        Err(e) => match on_scrape_error(policy, &e) {
            OnScrapeError::Exit => {
                error!("{:#}, exiting", color_eyre::Report::new(e));
                std::process::exit(1)
            }
            OnScrapeError::InternalServerError => Err(err_into_500(color_eyre::Report::new(e))),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnScrapeError {
    InternalServerError,
    Exit,
}

/// Only a failed fetch can end the process; encoding errors are always answered with a 500.
pub fn on_scrape_error(policy: FetchErrorPolicy, error: &ScrapeError) -> OnScrapeError {
    match (policy, error) {
        (FetchErrorPolicy::Exit, ScrapeError::Fetch(_)) => OnScrapeError::Exit,
        _ => OnScrapeError::InternalServerError,
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use std::io;

    use queue_data::FetchError;

    use super::*;

    fn fetch_error() -> ScrapeError {
        ScrapeError::Fetch(FetchError::Spawn { program: "squeue".to_owned(), source: io::Error::from(io::ErrorKind::NotFound) })
    }

    #[test]
    fn on_scrape_error__fetch_error() {
        assert_eq!(on_scrape_error(FetchErrorPolicy::Exit, &fetch_error()), OnScrapeError::Exit);
        assert_eq!(on_scrape_error(FetchErrorPolicy::FailScrape, &fetch_error()), OnScrapeError::InternalServerError);
    }

    #[test]
    fn on_scrape_error__metrics_error_never_exits() {
        let error = ScrapeError::Metrics(prometheus::Error::Msg("bad metric".to_owned()));
        assert_eq!(on_scrape_error(FetchErrorPolicy::Exit, &error), OnScrapeError::InternalServerError);
        assert_eq!(on_scrape_error(FetchErrorPolicy::FailScrape, &error), OnScrapeError::InternalServerError);
    }
}
