use std::path::PathBuf;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use hubcache_client::{DownloadOptions, HubClient, HubConfig, TransferProgress};

use crate::common_args;
use crate::subcommands::{apply_overrides, cancel_on_ctrl_c, repo_args, with_progress_bar};

pub fn cli() -> Command {
    Command::new("download")
        .about("Download one file through the shared cache")
        .arg(common_args::repo())
        .arg(
            Arg::new("filename")
                .required(true)
                .help("Path of the file inside the repository"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(clap::value_parser!(PathBuf))
                .help("Destination path; defaults to the file name in the current directory"),
        )
        .arg(common_args::kind())
        .arg(common_args::revision())
        .arg(
            Arg::new("force")
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Re-fetch even when the file is already cached"),
        )
        .arg(common_args::cache_dir())
        .arg(common_args::endpoint())
}

pub async fn exec(config: HubConfig, args: &ArgMatches) -> Result<(), anyhow::Error> {
    let config = apply_overrides(config, args);
    let (kind, repo, revision) = repo_args(args)?;
    let filename = args.get_one::<String>("filename").unwrap();
    let destination = match args.get_one::<PathBuf>("output") {
        Some(path) => path.clone(),
        None => PathBuf::from(filename.rsplit('/').next().unwrap_or(filename)),
    };

    let client = HubClient::new(config);
    let progress = TransferProgress::new();
    let options = DownloadOptions {
        force: args.get_flag("force"),
        progress: Some(progress.clone()),
        cancel: cancel_on_ctrl_c(),
        ..Default::default()
    };

    let delivered = with_progress_bar(
        progress,
        client.download(kind, &repo, &revision, filename, &destination, &options),
    )
    .await
    .with_context(|| format!("downloading {repo}@{revision}:{filename}"))?;

    println!("{} {}", "Downloaded".green().bold(), delivered.display());
    Ok(())
}
