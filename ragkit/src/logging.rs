use crate::{
    config::{LogFormat, LoggingConfig},
    error::{RagErr, RagError},
    map_err,
};
use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Command line switches that adjust logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Log at debug level regardless of configuration.
    pub verbose: bool,

    /// Disable logging entirely.
    pub quiet: bool,

    /// Skip the log file even if one is configured.
    pub no_file: bool,
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped and must be kept
/// alive for as long as the application runs. `None` means no file is written.
pub fn init(config: &LoggingConfig, options: LogOptions) -> Result<Option<WorkerGuard>, RagError> {
    if options.quiet || !config.enabled {
        return Ok(None);
    }

    let filter = if options.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(&config.level)))
    };

    let mut layers = vec![fmt_layer(
        config.format,
        std::io::stdout,
        std::io::stdout().is_terminal(),
    )];

    let mut guard = None;

    if let Some(path) = config.file_path.as_deref().filter(|_| !options.no_file) {
        map_err!(rotate_if_needed(path, config.max_file_size, config.backup_count));

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        map_err!(std::fs::create_dir_all(dir));

        let Some(file_name) = path.file_name() else {
            return Err(RagError::new(
                file!(),
                line!(),
                column!(),
                RagErr::InvalidFileName(path.display().to_string()),
            ));
        };

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);

        layers.push(fmt_layer(config.format, writer, false));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .map_err(|e| RagError::new(file!(), line!(), column!(), RagErr::Logging(e.to_string())))?;

    debug!("Logging initialized at level {}", config.level);

    Ok(guard)
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);

    match format {
        LogFormat::Full => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Map a configured level name to an [EnvFilter] directive.
fn directive(level: &str) -> String {
    match level.to_uppercase().as_str() {
        "WARNING" => "warn".to_string(),
        "CRITICAL" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Rotate `path` if it has grown to `max_size` bytes or more.
///
/// `path` becomes `path.1`, `path.1` becomes `path.2` and so on. Files past
/// `backups` are removed. Returns whether a rotation happened.
pub fn rotate_if_needed(path: &Path, max_size: u64, backups: usize) -> std::io::Result<bool> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Ok(false);
    };

    if max_size == 0 || meta.len() < max_size {
        return Ok(false);
    }

    if backups == 0 {
        std::fs::remove_file(path)?;
        return Ok(true);
    }

    let backup = |n: usize| {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    };

    let oldest = backup(backups);
    if oldest.exists() {
        std::fs::remove_file(oldest)?;
    }

    for n in (1..backups).rev() {
        let from = backup(n);
        if from.exists() {
            std::fs::rename(&from, backup(n + 1))?;
        }
    }

    std::fs::rename(path, backup(1))?;

    Ok(true)
}
