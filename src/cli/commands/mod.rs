//! CLI command implementations
//!
//! Exit codes: 0 success, 1 completed with unresolved placeholders (strict
//! mode), 2 configuration error, 3 input error, 4 model service unreachable,
//! 5 fatal error, 130 interrupted before the input was read.

pub mod anonymize;
pub mod deanonymize;
pub mod init;
pub mod scan;
pub mod status;
pub mod validate;

use crate::config::{load_config, load_config_from_str, VeilConfig};
use crate::domain::VeilError;
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;

/// Exit code when shutdown is requested before the input has been read
pub const EXIT_INTERRUPTED: i32 = 130;

/// Load `config_path`, falling back to defaults when the file does not exist
pub fn load_config_or_default(config_path: &str) -> crate::domain::Result<VeilConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::warn!(
            config_path = %config_path,
            "Configuration file not found, using defaults (pattern detection only)"
        );
        load_config_from_str("")
    }
}

/// Read a UTF-8 document from `path`, or stdin when `path` is `None`
///
/// Returns `Ok(None)` if `shutdown` fires before the whole document has been read.
pub(crate) async fn read_input(
    path: Option<&Path>,
    shutdown: &mut watch::Receiver<bool>,
) -> crate::domain::Result<Option<String>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                VeilError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
            })?;
            read_document(file, shutdown).await
        }
        None => read_document(tokio::io::stdin(), shutdown).await,
    }
}

async fn read_document<R: AsyncRead + Unpin>(
    mut reader: R,
    shutdown: &mut watch::Receiver<bool>,
) -> crate::domain::Result<Option<String>> {
    if *shutdown.borrow() {
        return Ok(None);
    }

    let mut bytes = Vec::new();
    tokio::select! {
        read = reader.read_to_end(&mut bytes) => {
            read?;
        }
        _ = shutdown_requested(shutdown) => {
            tracing::info!("Shutdown requested while reading input");
            return Ok(None);
        }
    }

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| VeilError::InvalidInput("input is not valid UTF-8 text".to_string()))
}

/// Resolve once the shutdown flag is set; never resolve if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Write `content` to `path`, or stdout when `path` is `None`
pub(crate) fn write_output(path: Option<&Path>, content: &str) -> crate::domain::Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Flags selecting whether the contextual detector is consulted
#[derive(Args, Debug, Clone, Default)]
pub struct ContextualFlags {
    /// Consult the contextual detector regardless of configuration
    #[arg(long, conflicts_with = "no_contextual")]
    pub contextual: bool,

    /// Use pattern detection only regardless of configuration
    #[arg(long)]
    pub no_contextual: bool,
}

impl ContextualFlags {
    /// Resolve the flags against the configured default
    pub fn use_contextual(&self, configured: bool) -> bool {
        if self.contextual {
            true
        } else if self.no_contextual {
            false
        } else {
            configured
        }
    }
}

/// Input file option shared by the document commands
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Input file (reads stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}
