use crate::CliArgs;
use std::fs::OpenOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

///////////////////////////////////////////////////////////////////////////
pub fn init_logger(cli: &CliArgs) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG wins over --filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.filter));

    // logging to stderr, stdout is left to the tool's users
    let fmt_layer = (!cli.no_stdout_appender).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_span_events(FmtSpan::CLOSE)
    });

    // logging to fs
    let mut file_layer_guard = None;
    let file_layer = match cli.log_file.as_ref() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            file_layer_guard = Some(guard);

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
        }
        None => None,
    };

    // combined logger
    let logging_layer = tracing_subscriber::Layer::and_then(fmt_layer, file_layer);

    tracing_subscriber::registry()
        .with(logging_layer)
        .with(filter)
        .try_init()?;

    Ok(file_layer_guard)
}
