use std::path::PathBuf;

use clap::Arg;

pub fn repo() -> Arg {
    Arg::new("repo")
        .required(true)
        .help("The repository id, as `namespace/name`")
}

pub fn kind() -> Arg {
    Arg::new("kind")
        .long("kind")
        .short('k')
        .value_parser(["model", "dataset", "space"])
        .default_value("model")
        .help("The kind of repository")
}

pub fn revision() -> Arg {
    Arg::new("revision")
        .long("revision")
        .short('r')
        .default_value("main")
        .help("A branch, tag, PR ref, or 40-hex commit hash")
}

pub fn cache_dir() -> Arg {
    Arg::new("cache_dir")
        .long("cache-dir")
        .value_parser(clap::value_parser!(PathBuf))
        .help("Cache root to use instead of the resolved default")
}

pub fn endpoint() -> Arg {
    Arg::new("endpoint")
        .long("endpoint")
        .help("Base URL of the hub, overriding HF_ENDPOINT")
}
