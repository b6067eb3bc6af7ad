use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use hubcache_client::{HubClient, HubConfig, SnapshotOptions, TransferProgress};

use crate::common_args;
use crate::subcommands::{apply_overrides, cancel_on_ctrl_c, repo_args, with_progress_bar};

pub fn cli() -> Command {
    Command::new("snapshot")
        .about("Download a whole revision into a directory")
        .arg(common_args::repo())
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(".")
                .help("Directory receiving the snapshot tree"),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .action(ArgAction::Append)
                .help("Keep only paths matching this glob; may be repeated. All files when omitted"),
        )
        .arg(common_args::kind())
        .arg(common_args::revision())
        .arg(common_args::cache_dir())
        .arg(common_args::endpoint())
}

pub async fn exec(config: HubConfig, args: &ArgMatches) -> Result<(), anyhow::Error> {
    let config = apply_overrides(config, args);
    let (kind, repo, revision) = repo_args(args)?;
    let destination = args.get_one::<PathBuf>("output").unwrap().clone();
    let globs: Vec<String> = args
        .get_many::<String>("include")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let client = HubClient::new(config);
    let progress = TransferProgress::new();
    let options = SnapshotOptions {
        globs,
        progress: Some(progress.clone()),
        cancel: cancel_on_ctrl_c(),
        ..Default::default()
    };

    let downloaded = with_progress_bar(
        progress,
        client.download_snapshot(kind, &repo, &revision, &destination, &options),
    )
    .await
    .with_context(|| format!("downloading snapshot of {repo}@{revision}"))?;

    println!(
        "{} {} files into {}",
        "Downloaded".green().bold(),
        downloaded.len(),
        destination.display()
    );
    Ok(())
}
