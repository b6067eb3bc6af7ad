pub mod download;
pub mod env;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;
use hubcache_client::paths::{RepoId, RepoKind};
use hubcache_client::{HubConfig, TransferProgress};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

/// A token that flips to cancelled on Ctrl-C, so an interrupted download
/// leaves a resumable staging file instead of being killed mid-write.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });
    token
}

/// Apply `--endpoint` and `--cache-dir` overrides to the resolved config.
pub(crate) fn apply_overrides(mut config: HubConfig, args: &ArgMatches) -> HubConfig {
    if let Some(endpoint) = args.get_one::<String>("endpoint") {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(dir) = args.get_one::<std::path::PathBuf>("cache_dir") {
        config = config.with_cache_root(dir);
    }
    config
}

pub(crate) fn repo_args(args: &ArgMatches) -> Result<(RepoKind, RepoId, String), anyhow::Error> {
    let kind: RepoKind = args.get_one::<String>("kind").unwrap().parse()?;
    let repo: RepoId = args.get_one::<String>("repo").unwrap().parse()?;
    let revision = args.get_one::<String>("revision").unwrap().clone();
    Ok((kind, repo, revision))
}

/// Mirror a [`TransferProgress`] into an indicatif bar until `transfer`
/// resolves.
pub(crate) async fn with_progress_bar<T>(
    progress: Arc<TransferProgress>,
    transfer: impl std::future::Future<Output = T>,
) -> T {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} {msg}")
            .expect("static progress template"),
    );

    tokio::pin!(transfer);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let result = loop {
        tokio::select! {
            result = &mut transfer => break result,
            _ = ticker.tick() => {
                let snapshot = progress.snapshot();
                bar.set_length(snapshot.total);
                bar.set_position(snapshot.completed);
                if let Some(throughput) = snapshot.user_info.get(hubcache_client::THROUGHPUT_KEY) {
                    bar.set_message(format!("{:.0} B/s", throughput));
                }
            }
        }
    };
    bar.finish_and_clear();
    result
}
