// Binary entry point: stdio transport, stderr (or file) logging, exit code
// from the protocol state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use apex_indexer::OsFileSystem;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let _log_guard = init_tracing();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting Apex language server"
    );

    let fs = Arc::new(OsFileSystem);
    let code = match apex_lsp::server::run(tokio::io::stdin(), tokio::io::stdout(), fs).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "fatal server error");
            1
        }
    };
    std::process::exit(code);
}

/// Logging must stay off stdout, which carries protocol frames. Default is
/// stderr; `APEX_LSP_LOG_FILE` redirects to a file, `APEX_LSP_LOG` picks
/// the level.
fn init_tracing() -> Option<WorkerGuard> {
    let level = std::env::var("APEX_LSP_LOG")
        .ok()
        .and_then(|value| value.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    if let Ok(path) = std::env::var("APEX_LSP_LOG_FILE") {
        let path = PathBuf::from(path);
        let directory = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "apex-lsp.log".into());
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}
