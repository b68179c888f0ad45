//! Configuration: command line options and the layered settings read at
//! startup. Settings are resolved once and treated as immutable for the
//! process lifetime.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::env;
use std::path::PathBuf;
use structopt::StructOpt;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Environment variables overriding the Elasticsearch settings, whatever
/// the config files say.
const ENV_OVERRIDES: [(&str, &str); 3] = [
    ("elasticsearch.user", "ELASTIC_USER"),
    ("elasticsearch.password", "ELASTIC_PASSWORD"),
    ("elasticsearch.index_endpoint", "ELASTIC_INDEX_ENDPOINT"),
];

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Config Merge Error: {} [{}]", msg, source))]
    ConfigMerge {
        msg: String,
        source: config::ConfigError,
    },
    #[snafu(display("Config Extract Error: {} [{}]", msg, source))]
    ConfigExtract {
        msg: String,
        source: config::ConfigError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Host on which we expose the service. Example: '0.0.0.0'
    pub host: String,
    /// Port on which we expose the service.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Elasticsearch {
    /// Basic-auth user for the index endpoint.
    pub user: String,
    /// Basic-auth password for the index endpoint.
    pub password: String,
    /// Full URL of the index search endpoint, eg
    /// 'http://localhost:9200/doe/_search'.
    pub index_endpoint: String,
    /// Upper bound on the outbound call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub mode: String,
    pub service: Service,
    pub elasticsearch: Elasticsearch,
    pub nb_threads: Option<usize>,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "doe-search",
    about = "REST API for querying a DOE gazette Elasticsearch index",
    version = VERSION,
    author = AUTHORS
)]
pub struct Opts {
    /// Defines the config directory
    #[structopt(parse(from_os_str), short = "c", long = "config-dir")]
    pub config_dir: PathBuf,

    /// Defines the run mode in {testing, dev, prod, ...}
    #[structopt(short = "m", long = "run-mode", default_value = "dev")]
    pub run_mode: String,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Runs the web server
    Run,
    /// Prints the resolved configuration
    Config,
}

impl Settings {
    // Configuration is merged from, in increasing priority:
    // * '<config-dir>/default.toml'
    // * '<config-dir>/<run-mode>.toml', where the run mode comes from the
    //   RUN_MODE environment variable or the command line,
    // * environment variables with the DOE prefix,
    // * the dedicated ELASTIC_USER / ELASTIC_PASSWORD /
    //   ELASTIC_INDEX_ENDPOINT variables.
    // Missing credentials or endpoint make the final deserialization fail,
    // so an incomplete configuration is a startup error, never a
    // per-request one.
    pub fn new(opts: &Opts) -> Result<Self, Error> {
        let default_path = opts.config_dir.join("default").with_extension("toml");
        let mut builder = Config::builder().add_source(File::from(default_path));

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| opts.run_mode.clone());
        let mode_path = opts.config_dir.join(&run_mode).with_extension("toml");
        builder = builder.add_source(File::from(mode_path).required(false));

        builder = builder.add_source(Environment::with_prefix("DOE").separator("_"));

        for (key, var) in ENV_OVERRIDES.iter() {
            if let Ok(value) = env::var(var) {
                builder = builder
                    .set_override(*key, value)
                    .context(ConfigExtractSnafu {
                        msg: format!("Could not override {} from {}", key, var),
                    })?;
            }
        }

        let config = builder.build().context(ConfigMergeSnafu {
            msg: String::from("Could not merge doe-search settings"),
        })?;

        config.try_deserialize().context(ConfigExtractSnafu {
            msg: String::from("Could not generate doe-search settings"),
        })
    }
}
