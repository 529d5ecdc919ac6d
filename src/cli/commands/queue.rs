//! Offline queue commands.
//!
//! These work on the persisted queue directly. Replay needs the register
//! API and happens in the embedding app through `QueueController`.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::cli::args::OutputFormat;
use crate::config::{Config, Paths};
use crate::connectivity::{ConnectivityMonitor, NetworkState, TcpProbe};
use crate::error::QueueError;
use crate::output::{
    format_network_event, format_operation, format_operations, format_status, to_json,
};
use crate::storage::{Database, SqliteStore};
use crate::sync::{Mutation, QueueStore, QueuedOperation, RegisterPayload};

/// Queue store and settings shared by the commands.
pub struct QueueContext {
    pub store: QueueStore,
    pub config: Config,
}

impl QueueContext {
    /// Open the queue database under `paths`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(paths: &Paths, config: Config) -> Result<Self, QueueError> {
        let db = Database::open(paths)?;
        Ok(Self {
            store: QueueStore::new(Arc::new(SqliteStore::new(db))),
            config,
        })
    }
}

/// Show queue status, optionally probing connectivity.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn status(
    ctx: &QueueContext,
    probe: bool,
    format: OutputFormat,
) -> Result<String, QueueError> {
    let status = ctx.store.status().await?;

    let network = if probe {
        Some(TcpProbe::from_config(&ctx.config.connectivity).probe().await)
    } else {
        None
    };

    format_status(&status, network, format)
}

/// Poll connectivity and write one line per change to `out`.
///
/// The current state is written first. Polling uses the configured probe
/// address, timeout and interval. Stops after `changes` transitions, or runs
/// until interrupted when `changes` is `None`.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or `out` cannot be written.
pub async fn watch(
    ctx: &QueueContext,
    changes: Option<usize>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), QueueError> {
    let probe = Arc::new(TcpProbe::from_config(&ctx.config.connectivity));
    let mut rx = probe.subscribe();

    let initial = probe.probe().await;
    rx.borrow_and_update();
    write_network_event(ctx, initial, format, out).await?;

    let poller = probe.spawn_polling(ctx.config.connectivity.probe_interval());
    let result = watch_changes(ctx, &mut rx, changes, format, out).await;
    poller.abort();
    result
}

async fn watch_changes(
    ctx: &QueueContext,
    rx: &mut watch::Receiver<NetworkState>,
    changes: Option<usize>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), QueueError> {
    let mut seen = 0;
    while changes.map_or(true, |limit| seen < limit) {
        if rx.changed().await.is_err() {
            break;
        }
        let state = *rx.borrow_and_update();
        write_network_event(ctx, state, format, out).await?;
        seen += 1;
    }
    Ok(())
}

async fn write_network_event(
    ctx: &QueueContext,
    state: NetworkState,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), QueueError> {
    let pending = ctx.store.status().await?.count;
    writeln!(out, "{}", format_network_event(state, pending, Utc::now(), format)?)?;
    out.flush()?;
    Ok(())
}

/// List queued operations.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn list(ctx: &QueueContext, format: OutputFormat) -> Result<String, QueueError> {
    let status = ctx.store.status().await?;
    format_operations(&status.operations, ctx.config.queue.max_retries, format)
}

/// Show one queued operation.
///
/// # Errors
///
/// Returns `QueueError::NotFound` if no operation has this id.
pub async fn show(ctx: &QueueContext, id: &str, format: OutputFormat) -> Result<String, QueueError> {
    let operation = ctx
        .store
        .get(id)
        .await?
        .ok_or_else(|| QueueError::NotFound(format!("Operation {id}")))?;

    format_operation(&operation, format)
}

/// Queue a register read from a file or stdin.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, or the queue
/// cannot be written.
pub async fn add(
    ctx: &QueueContext,
    file: &str,
    update: Option<i64>,
    format: OutputFormat,
) -> Result<String, QueueError> {
    let payload: RegisterPayload = serde_json::from_str(&read_input(file)?)?;
    let attachments = payload.files.len();

    let mutation = match update {
        Some(registro_id) => Mutation::update_register(registro_id, payload),
        None => Mutation::create_register(payload),
    };

    let operation = QueuedOperation::new(mutation);
    let summary = operation.summary();
    let name = operation
        .mutation
        .operation_type()
        .map_or(summary.kind.as_str(), |kind| kind.display_name());
    let output = match format {
        OutputFormat::Json => to_json(&summary)?,
        OutputFormat::Pretty => {
            let mut output = format!("Queued {name} operation (ID: {})", summary.id);
            if attachments > 0 {
                output.push_str(&format!(
                    "\n{attachments} file attachment(s) dropped, metadata kept"
                ));
            }
            output
        },
    };

    ctx.store.append(operation).await?;
    Ok(output)
}

/// Discard the whole queue.
///
/// # Errors
///
/// Returns `QueueError::Config` without `--force`, or a storage error.
pub async fn clear(ctx: &QueueContext, force: bool, format: OutputFormat) -> Result<String, QueueError> {
    if !force {
        return Err(QueueError::Config(
            "Use --force to discard every queued operation".to_string(),
        ));
    }

    let count = ctx.store.status().await?.count;
    ctx.store.clear().await?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "cleared": count })),
        OutputFormat::Pretty => Ok(format!("Cleared {count} operations from queue")),
    }
}

fn read_input(file: &str) -> Result<String, QueueError> {
    if file == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }

    std::fs::read_to_string(Path::new(file)).map_err(|e| {
        QueueError::Config(format!("Failed to read {file}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::net::TcpListener;

    fn context() -> (TempDir, QueueContext) {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path().to_path_buf());
        let ctx = QueueContext::open(&paths, Config::default()).unwrap();
        (dir, ctx)
    }

    fn register_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (_dir, ctx) = context();
        let file = register_file(r#"{"imovel_numero": "12", "a1": 2}"#);

        let output = add(&ctx, file.path().to_str().unwrap(), None, OutputFormat::Json)
            .await
            .unwrap();
        let added: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(added["type"], "CREATE_REGISTER");

        let output = list(&ctx, OutputFormat::Json).await.unwrap();
        let listed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["items"][0]["id"], added["id"]);
    }

    #[tokio::test]
    async fn test_add_update_reports_dropped_files() {
        let (_dir, ctx) = context();
        let file = register_file(
            r#"{"imovel_numero": "7", "files": [{"uri": "file:///a.jpg", "type": "image/jpeg"}]}"#,
        );

        let output = add(&ctx, file.path().to_str().unwrap(), Some(42), OutputFormat::Pretty)
            .await
            .unwrap();

        assert!(output.contains("Queued Update Register operation"));
        assert!(output.contains("1 file attachment(s) dropped"));

        let stored = ctx.store.load().await.unwrap();
        assert_eq!(stored[0].mutation.registro_id(), Some(42));
        assert_eq!(stored[0].mutation.payload().unwrap().files_metadata.len(), 1);
    }

    #[tokio::test]
    async fn test_add_invalid_json() {
        let (_dir, ctx) = context();
        let file = register_file("not json");

        let err = add(&ctx, file.path().to_str().unwrap(), None, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Parse(_)));
    }

    #[tokio::test]
    async fn test_show_missing() {
        let (_dir, ctx) = context();
        let err = show(&ctx, "nope", OutputFormat::Json).await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_requires_force() {
        let (_dir, ctx) = context();
        let file = register_file(r#"{"imovel_numero": "1"}"#);
        add(&ctx, file.path().to_str().unwrap(), None, OutputFormat::Json)
            .await
            .unwrap();

        assert!(clear(&ctx, false, OutputFormat::Json).await.is_err());
        assert_eq!(ctx.store.status().await.unwrap().count, 1);

        let output = clear(&ctx, true, OutputFormat::Json).await.unwrap();
        assert!(output.contains("\"cleared\": 1"));
        assert_eq!(ctx.store.status().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_status_empty() {
        let (_dir, ctx) = context();
        let output = status(&ctx, false, OutputFormat::Json).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 0);
    }

    #[tokio::test]
    async fn test_watch_reports_state_then_changes() {
        let (dir, _) = context();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let mut config = Config::default();
        config.connectivity.probe_address = listener.local_addr().unwrap().to_string();
        config.connectivity.probe_interval_secs = 1;
        config.connectivity.probe_timeout_ms = 500;
        let ctx = QueueContext::open(&Paths::with_root(dir.path().to_path_buf()), config).unwrap();
        let file = register_file(r#"{"imovel_numero": "1"}"#);
        add(&ctx, file.path().to_str().unwrap(), None, OutputFormat::Json)
            .await
            .unwrap();

        let mut out = Vec::new();
        let closer = async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(listener);
        };
        let (result, ()) = tokio::time::timeout(
            Duration::from_secs(10),
            async { tokio::join!(watch(&ctx, Some(1), OutputFormat::Json, &mut out), closer) },
        )
        .await
        .unwrap();
        result.unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["online"], true);
        assert_eq!(lines[1]["online"], false);
        assert_eq!(lines[1]["pending"], 1);
    }
}
