use clap::{ArgMatches, Command};
use hubcache_client::HubConfig;

use crate::common_args;
use crate::subcommands::apply_overrides;

pub fn cli() -> Command {
    Command::new("env")
        .about("Show the resolved endpoint, cache root, and token status")
        .arg(common_args::cache_dir())
        .arg(common_args::endpoint())
}

pub async fn exec(config: HubConfig, args: &ArgMatches) -> Result<(), anyhow::Error> {
    let config = apply_overrides(config, args);
    println!("endpoint:   {}", config.endpoint());
    println!("cache root: {}", config.cache_root().display());
    println!(
        "token:      {}",
        if config.token().is_some() { "set" } else { "not set" }
    );
    Ok(())
}
