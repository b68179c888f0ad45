//! Server assembly: runtime, logging, route composition and startup.

use snafu::{ResultExt, Snafu};
use std::net::ToSocketAddrs;
use tokio::runtime;
use tracing::{info, instrument};
use warp::Filter;

use crate::client::{self, ElasticsearchClient};
use crate::routes;
use crate::settings::{Error as SettingsError, Opts, Settings};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not generate settings: {}", source))]
    SettingsProcessing { source: SettingsError },

    #[snafu(display("Could not create the Elasticsearch client: {}", source))]
    Backend { source: client::Error },

    #[snafu(display("Socket Addr Error with host {} / port {}: {}", host, port, source))]
    SockAddr {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[snafu(display("Addr Resolution Error: {}", msg))]
    AddrResolution { msg: String },
}

pub fn run(opts: &Opts) -> Result<(), Error> {
    let settings = Settings::new(opts).context(SettingsProcessingSnafu)?;
    init_logging();

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(settings.nb_threads.unwrap_or_else(num_cpus::get))
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime.");

    runtime.block_on(run_server(settings))
}

pub fn config(opts: &Opts) -> Result<(), Error> {
    let settings = Settings::new(opts).context(SettingsProcessingSnafu)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&settings).expect("Could not serialize settings")
    );
    Ok(())
}

fn init_logging() {
    // Filter traces based on the RUST_LOG env var, with a sensible default
    // when it is not set.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("doe_search=info,warp=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[instrument(skip(settings))]
pub async fn run_server(settings: Settings) -> Result<(), Error> {
    info!(
        "Sending index queries to {}",
        settings.elasticsearch.index_endpoint
    );

    let backend = ElasticsearchClient::new(&settings.elasticsearch).context(BackendSnafu)?;

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST", "OPTIONS"]);

    let api = routes::search(backend)
        .or(routes::version())
        .recover(routes::report_invalid)
        .with(cors)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "request",
                method = %info.method(),
                path = %info.path(),
            )
        }));

    let host = settings.service.host;
    let port = settings.service.port;
    let addr = (host.as_str(), port)
        .to_socket_addrs()
        .context(SockAddrSnafu {
            host: host.clone(),
            port,
        })?
        .next()
        .ok_or(Error::AddrResolution {
            msg: String::from("Cannot resolve doe-search addr."),
        })?;

    info!("Serving doe-search on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
