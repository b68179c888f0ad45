use snafu::{ResultExt, Snafu};
use structopt::StructOpt;

use doe_search::server;
use doe_search::settings::{Command, Opts};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Server Error: {}", source))]
    Server { source: server::Error },
}

fn main() -> Result<(), Error> {
    let opts = Opts::from_args();
    match opts.cmd {
        Command::Run => server::run(&opts).context(ServerSnafu),
        Command::Config => server::config(&opts).context(ServerSnafu),
    }
}
