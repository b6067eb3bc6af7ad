mod common_args;
mod subcommands;

use clap::{ArgMatches, Command};
use hubcache_client::HubConfig;

pub use subcommands::*;

pub fn get_subcommands() -> Vec<Command> {
    vec![download::cli(), snapshot::cli(), env::cli()]
}

pub async fn exec_subcommand(config: HubConfig, cmd: &str, args: &ArgMatches) -> Result<(), anyhow::Error> {
    match cmd {
        "download" => download::exec(config, args).await,
        "snapshot" => snapshot::exec(config, args).await,
        "env" => env::exec(config, args).await,
        unknown => Err(anyhow::anyhow!("Invalid subcommand: {}", unknown)),
    }
}
