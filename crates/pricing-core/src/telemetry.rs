use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::error::{CoreError, Result};

/// Install the global subscriber: stdout always, plus a file when
/// `settings.log_file` is set. `RUST_LOG` overrides the dev-mode level.
///
/// The returned guard flushes the file writer on drop and must outlive `main`.
pub fn init_tracing(settings: &Settings, crate_targets: &[&str]) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(settings, crate_targets)));

    let (file_layer, guard) = match settings.log_file.as_deref() {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| CoreError::Config(format!("installing tracing subscriber: {}", e)))?;

    Ok(guard)
}

fn default_directives(settings: &Settings, crate_targets: &[&str]) -> String {
    let level = settings.log_level();
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        crate_targets
            .iter()
            .map(|target| format!("{}={}", target, level)),
    );
    directives.join(",")
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| CoreError::Config(format!("log_file {:?} has no file name", path)))?;
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
