mod cli;

use std::sync::Arc;

use clap::Parser as _;
use cli::Args;
use color_eyre::{eyre::WrapErr as _, Result};
use exporter::{app, config::Settings, AppState};
use poem::{listener::TcpListener, Server};
use queue_data::{FileSource, QueueSource, Squeue};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    register_logging(args.log_level)?;

    info!("Loading config");
    let settings = Settings::new(args.config.as_deref()).wrap_err("parsing config")?;
    let listen_address = args.listen_address(&settings);

    let source: Arc<dyn QueueSource> = match args.from_file {
        Some(path) => {
            info!(?path, "reading queue listing from file");
            Arc::new(FileSource { path })
        }
        None => Arc::new(Squeue::new(settings.squeue)),
    };
    let state = AppState::new(source, settings.on_fetch_error).wrap_err("building metric descriptors")?;

    info!(%listen_address, policy = ?settings.on_fetch_error, "serving /metrics");
    Server::new(TcpListener::bind(listen_address))
        .run(app(Arc::new(state)))
        .await
        .wrap_err("running http server")
}

fn register_logging(level: Level) -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder().with_max_level(level).finish();

    tracing::subscriber::set_global_default(subscriber).wrap_err("setting default subscriber failed")
}
