use clap::Command;
use hubcache_cli::*;
use hubcache_client::HubConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = get_command().get_matches();
    let (cmd, subcommand_args) = matches.subcommand().expect("subcommand_required is set");

    let config = HubConfig::from_env();
    exec_subcommand(config, cmd, subcommand_args).await?;

    Ok(())
}

fn get_command() -> Command {
    Command::new("hubcache")
        .about("Download files from the hub through the shared local cache")
        .args_conflicts_with_subcommands(true)
        .subcommand_required(true)
        .subcommands(get_subcommands())
        .help_expected(true)
}
