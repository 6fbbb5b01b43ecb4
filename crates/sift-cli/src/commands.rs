use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use sift_server::{ServerConfig, SiftServer};
use sift_store::{BackendConfig, DocumentStore, LogConfig, LogStore, RetryPolicy, SyncMode};
use sift_types::Document;
use tracing::{debug, info};

use crate::cli::*;

/// How a successful command ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The requested document does not exist.
    NotFound,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::NotFound => ExitCode::from(1),
        }
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<Outcome> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Put(args) => cmd_put(args, &cli.format),
        Command::Get(args) => cmd_get(args, &cli.format),
        Command::Compact(args) => cmd_compact(args, &cli.format),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

/// Resolve the config `serve` runs with: file (or defaults), then flags.
pub fn effective_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        debug!(%bind, "bind address overridden on the command line");
        config.bind_addr = bind;
    }
    if let Some(dir) = &args.data_dir {
        debug!(dir = %dir.display(), "data directory overridden on the command line");
        config.store.backend = match config.store.backend {
            BackendConfig::Log { sync_mode, retry, .. } => BackendConfig::Log {
                dir: dir.clone(),
                sync_mode,
                retry,
            },
            BackendConfig::Memory => BackendConfig::Log {
                dir: dir.clone(),
                sync_mode: SyncMode::default(),
                retry: RetryPolicy::default(),
            },
        };
    }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<Outcome> {
    let config = effective_config(&args)?;
    let server = SiftServer::from_config(config).context("opening document store")?;
    println!(
        "{} Sift serving on {} ({} backend)",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold(),
        server.store().backend_name().cyan()
    );
    server.serve().await.context("server failed")?;
    Ok(Outcome::Done)
}

fn open_log(dir: &Path) -> anyhow::Result<LogStore> {
    debug!(dir = %dir.display(), "opening log store");
    LogStore::open(dir, LogConfig::default())
        .with_context(|| format!("opening log store in {}", dir.display()))
}

fn cmd_put(args: PutArgs, format: &OutputFormat) -> anyhow::Result<Outcome> {
    let document = Document::from_json_slice(args.document.as_bytes())
        .context("document is not valid JSON")?;
    let store = open_log(&args.data_dir)?;
    store.put(&args.namespace, &args.id, document)?;
    info!(namespace = %args.namespace, id = %args.id, "document stored");

    match format {
        OutputFormat::Text => println!(
            "{} Stored {}/{}",
            "✓".green().bold(),
            args.namespace.yellow(),
            args.id.yellow()
        ),
        OutputFormat::Json => println!(
            "{}",
            json!({ "namespace": args.namespace, "id": args.id, "stored": true })
        ),
    }
    Ok(Outcome::Done)
}

fn cmd_get(args: GetArgs, format: &OutputFormat) -> anyhow::Result<Outcome> {
    let store = open_log(&args.data_dir)?;
    match store.get(&args.namespace, &args.id)? {
        Some(document) => {
            let rendered = match format {
                OutputFormat::Text => serde_json::to_string_pretty(document.as_value())?,
                OutputFormat::Json => serde_json::to_string(document.as_value())?,
            };
            println!("{rendered}");
            Ok(Outcome::Done)
        }
        None => {
            match format {
                OutputFormat::Text => eprintln!(
                    "{} {}/{} not found",
                    "✗".red().bold(),
                    args.namespace.yellow(),
                    args.id.yellow()
                ),
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "namespace": args.namespace, "id": args.id, "found": false })
                ),
            }
            Ok(Outcome::NotFound)
        }
    }
}

fn cmd_compact(args: CompactArgs, format: &OutputFormat) -> anyhow::Result<Outcome> {
    let store = open_log(&args.data_dir)?;
    let before = store.log_len()?;
    let records = store.compact()?;
    let after = store.log_len()?;
    info!(records, before, after, "compaction finished");

    match format {
        OutputFormat::Text => println!(
            "{} Compacted {} documents: {} → {} bytes",
            "✓".green().bold(),
            records.to_string().bold(),
            before,
            after
        ),
        OutputFormat::Json => println!(
            "{}",
            json!({ "records": records, "bytes_before": before, "bytes_after": after })
        ),
    }
    Ok(Outcome::Done)
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<Outcome> {
    let config = ServerConfig::load(&args.path)
        .with_context(|| format!("loading config {}", args.path.display()))?;
    println!("{} {} is valid", "✓".green().bold(), args.path.display());
    print!("{}", config.to_toml_string()?);
    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn serve_args(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> ServeArgs {
        ServeArgs {
            config,
            bind: None,
            data_dir,
        }
    }

    #[test]
    fn effective_config_defaults_to_memory() {
        let config = effective_config(&serve_args(None, None)).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn data_dir_switches_to_log_backend() {
        let config = effective_config(&serve_args(None, Some("/srv/sift".into()))).unwrap();
        match config.store.backend {
            BackendConfig::Log { dir, .. } => assert_eq!(dir, PathBuf::from("/srv/sift")),
            other => panic!("expected log backend, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_file_but_keep_log_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sift.toml");
        std::fs::write(
            &path,
            r#"
            bind_addr = "127.0.0.1:7000"

            [store.backend]
            type = "log"
            dir = "from-file"
            sync_mode = "every_write"
            "#,
        )
        .unwrap();

        let mut args = serve_args(Some(path), Some("from-flag".into()));
        args.bind = Some("0.0.0.0:9999".parse().unwrap());
        let config = effective_config(&args).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:9999".parse().unwrap());
        match config.store.backend {
            BackendConfig::Log { dir, sync_mode, .. } => {
                assert_eq!(dir, PathBuf::from("from-flag"));
                assert_eq!(sync_mode, SyncMode::EveryWrite);
            }
            other => panic!("expected log backend, got {other:?}"),
        }
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = serve_args(Some("/no/such/sift.toml".into()), None);
        let err = effective_config(&args).unwrap_err();
        assert!(err.to_string().contains("loading config"));
    }

    #[test]
    fn put_get_compact_against_a_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_path_buf();

        for doc in [r#"{"name":"widget"}"#, r#"{"name":"gadget"}"#] {
            let code = cmd_put(
                PutArgs {
                    data_dir: data_dir.clone(),
                    namespace: "products".into(),
                    id: "42".into(),
                    document: doc.into(),
                },
                &OutputFormat::Json,
            )
            .unwrap();
            assert_eq!(code, Outcome::Done);
        }

        let found = cmd_get(
            GetArgs {
                data_dir: data_dir.clone(),
                namespace: "products".into(),
                id: "42".into(),
            },
            &OutputFormat::Json,
        )
        .unwrap();
        assert_eq!(found, Outcome::Done);

        let missing = cmd_get(
            GetArgs {
                data_dir: data_dir.clone(),
                namespace: "products".into(),
                id: "999".into(),
            },
            &OutputFormat::Json,
        )
        .unwrap();
        assert_eq!(missing, Outcome::NotFound);

        cmd_compact(CompactArgs { data_dir: data_dir.clone() }, &OutputFormat::Json).unwrap();
        let store = open_log(&data_dir).unwrap();
        assert_eq!(
            store.get("products", "42").unwrap(),
            Some(Document::new(json!({"name": "gadget"})))
        );
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn put_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_put(
            PutArgs {
                data_dir: dir.path().to_path_buf(),
                namespace: "products".into(),
                id: "42".into(),
                document: "{".into(),
            },
            &OutputFormat::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
