//! provides logging helpers

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::Layer;

/// Directory that receives rolling log files instead of stderr when set.
pub const LOG_PATH_ENV_VAR: &str = "FPGA_WEBHOOK_LOG_PATH";

const LOG_FILE_PREFIX: &str = "fpga-webhook";
const MAX_LOG_FILES: usize = 3;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Builds the formatting layer. Writes to a daily rolling file under
/// `log_dir` when given, stderr otherwise. The returned guard must live as
/// long as the subscriber or buffered lines are lost.
pub fn get_fmt_layer<S>(log_dir: Option<&Path>) -> anyhow::Result<(BoxedLayer<S>, Option<WorkerGuard>)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .max_log_files(MAX_LOG_FILES)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            Ok((layer, Some(guard)))
        }
        None => {
            let layer = layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed();
            Ok((layer, None))
        }
    }
}

/// initiate the global tracing subscriber
///
/// The filter defaults to `INFO` and honours `RUST_LOG`.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let (fmt_layer, guard) = get_fmt_layer(log_dir)?;

    registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()?;

    Ok(guard)
}

/// Reads [`LOG_PATH_ENV_VAR`] and initializes logging accordingly.
pub fn init_from_env() -> anyhow::Result<Option<WorkerGuard>> {
    let log_dir = std::env::var_os(LOG_PATH_ENV_VAR);
    init(log_dir.as_deref().map(Path::new))
}
