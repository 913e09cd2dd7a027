use std::{
    fs,
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use assetfs::{
    config::{ENV_API_KEY, ENV_API_SECRET, ENV_CAFILE, ENV_CLOUD_NAME},
    logging::TracingLogger,
    Adapter, AssetError, AssetStore, Config,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info, span, Level};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let key = || Arg::new("KEY").required(true).index(1);

    Command::new("assetfs")
        .about("Filesystem-style access to a remote asset store")
        .subcommand_required(true)
        .arg(Arg::new("cloud-name").long("cloud-name").env(ENV_CLOUD_NAME).global(true))
        .arg(Arg::new("api-key").long("api-key").env(ENV_API_KEY).global(true))
        .arg(
            Arg::new("api-secret")
                .long("api-secret")
                .env(ENV_API_SECRET)
                .hide_env_values(true)
                .global(true),
        )
        .arg(Arg::new("ca-file").long("ca-file").env(ENV_CAFILE).global(true))
        .arg(Arg::new("api-url").long("api-url").global(true))
        .subcommand(
            Command::new("read")
                .arg(key())
                .arg(Arg::new("output").short('o').long("output")),
        )
        .subcommand(
            Command::new("write")
                .arg(key())
                .arg(Arg::new("FILE").required(true).index(2)),
        )
        .subcommand(Command::new("exists").arg(key()))
        .subcommand(Command::new("keys"))
        .subcommand(Command::new("mtime").arg(key()))
        .subcommand(Command::new("delete").arg(key()))
        .subcommand(
            Command::new("rename")
                .arg(Arg::new("SOURCE").required(true).index(1))
                .arg(Arg::new("TARGET").required(true).index(2)),
        )
        .subcommand(Command::new("is-dir").arg(key()))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true),
        )
}

fn build_config(matches: &ArgMatches) -> Result<Config, AssetError> {
    let arg = |name: &str| matches.get_one::<String>(name).filter(|v| !v.is_empty());

    let mut config = match (arg("cloud-name"), arg("api-key"), arg("api-secret")) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => {
            Config::new(cloud_name, api_key, api_secret, None)
        }
        _ => Config::from_env()?,
    };

    if let Some(ca_file) = arg("ca-file") {
        config.ca_file = Some(ca_file.into());
    }
    if let Some(url) = arg("api-url") {
        config = config.with_api_base_url(url);
    }

    config.validate()?;
    Ok(config)
}

fn print_outcome<T: std::fmt::Display>(outcome: Option<T>) -> ExitCode {
    match outcome {
        Some(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}

fn print_flag(flag: bool) -> ExitCode {
    println!("{}", flag);
    if flag {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(store: &AssetStore, matches: &ArgMatches) -> io::Result<ExitCode> {
    let key = |m: &ArgMatches| m.get_one::<String>("KEY").cloned().unwrap_or_default();

    let code = match matches.subcommand() {
        Some(("read", m)) => match store.read(&key(m)) {
            Some(content) => {
                match m.get_one::<String>("output") {
                    Some(path) => fs::write(path, &content)?,
                    None => io::stdout().write_all(&content)?,
                }
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },
        Some(("write", m)) => {
            let file = m.get_one::<String>("FILE").cloned().unwrap_or_default();
            let content = fs::read(&file)?;
            print_outcome(store.write(&key(m), &content))
        }
        Some(("exists", m)) => print_flag(store.exists(&key(m))),
        Some(("keys", _)) => {
            let mut out = io::stdout().lock();
            for k in store.keys() {
                writeln!(out, "{}", k)?;
            }
            ExitCode::SUCCESS
        }
        Some(("mtime", m)) => print_outcome(store.mtime(&key(m))),
        Some(("delete", m)) => print_flag(store.delete(&key(m))),
        Some(("rename", m)) => {
            let source = m.get_one::<String>("SOURCE").cloned().unwrap_or_default();
            let target = m.get_one::<String>("TARGET").cloned().unwrap_or_default();
            print_flag(store.rename(&source, &target))
        }
        Some(("is-dir", m)) => print_flag(store.is_directory(&key(m))),
        _ => ExitCode::FAILURE,
    };

    Ok(code)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .json()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let config = match build_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            error!(error_message = %err, error_group = "config");
            eprintln!("assetfs: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(cloud_name = %config.cloud_name, secure = config.ca_file.is_some(), "config");

    let mut store = match AssetStore::connect(config) {
        Ok(store) => store,
        Err(err) => {
            error!(error_message = %err, error_group = "connect");
            eprintln!("assetfs: {}", err);
            return ExitCode::FAILURE;
        }
    };
    store.set_logger(Arc::new(TracingLogger));

    match run(&store, &matches) {
        Ok(code) => code,
        Err(err) => {
            error!(error_message = %err, error_group = "io");
            eprintln!("assetfs: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cases = vec![
            vec!["assetfs", "read", "a/b.jpg", "-o", "out.jpg"],
            vec!["assetfs", "write", "a/b.jpg", "local.jpg"],
            vec!["assetfs", "exists", "a/b.jpg"],
            vec!["assetfs", "keys"],
            vec!["assetfs", "mtime", "a/b.jpg"],
            vec!["assetfs", "delete", "a/b.jpg"],
            vec!["assetfs", "rename", "a.jpg", "b.jpg"],
            vec!["assetfs", "is-dir", "a"],
        ];

        for args in cases {
            assert!(cli().try_get_matches_from(args.clone()).is_ok(), "failed for case: {:?}", args);
        }
    }

    #[test]
    fn test_cli_rejects_missing_key() {
        assert!(cli().try_get_matches_from(["assetfs", "read"]).is_err());
        assert!(cli().try_get_matches_from(["assetfs", "rename", "a.jpg"]).is_err());
        assert!(cli().try_get_matches_from(["assetfs"]).is_err());
    }

    #[test]
    fn test_build_config_from_args() {
        let matches = cli()
            .try_get_matches_from([
                "assetfs",
                "--cloud-name",
                "demo",
                "--api-key",
                "key",
                "--api-secret",
                "secret",
                "--ca-file",
                "/etc/ssl/ca.pem",
                "--api-url",
                "http://localhost:9000",
                "keys",
            ])
            .unwrap();

        let config = build_config(&matches).unwrap();
        assert_eq!(config.cloud_name, "demo");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.api_secret, "secret");
        assert_eq!(config.ca_file, Some("/etc/ssl/ca.pem".into()));
        assert_eq!(config.api_base_url, "http://localhost:9000");
    }
}
