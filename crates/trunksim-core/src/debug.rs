use std::fs::OpenOptions;
use std::sync::Once;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt as tracingfmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Logs a warning that a branch intentionally has no behavior yet.
#[macro_export]
macro_rules! unimplemented_log {
    ( $($arg:tt)* ) => {{
        tracing::warn!("unimplemented: {}", format_args!($($arg)*));
    }};
}

/// If `cond` is false, logs a warning instead of panicking.
#[macro_export]
macro_rules! assert_warn {
    ($cond:expr, $($arg:tt)+) => {{
        if !$cond {
            tracing::warn!(
                target: module_path!(),
                "assertion warning: `{}` failed: {} at {}:{}",
                stringify!($cond),
                format_args!($($arg)+),
                file!(),
                line!(),
            );
        }
    }};
}

static INIT_LOG: Once = Once::new();

/// Maximum-verbosity logging, for unit tests.
pub fn setup_logging_verbose() {
    setup_logging(EnvFilter::new("trace"), None);
}

/// Default logging to stdout, and optionally a verbose log file.
/// Returns a guard that must be kept alive for file logging to keep working.
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let stdout_filter = get_default_stdout_filter();
    let logfile_and_filter = verbose_logfile.map(|file| (file, get_default_logfile_filter()));
    setup_logging(stdout_filter, logfile_and_filter)
}

pub fn get_default_filter() -> EnvFilter {
    EnvFilter::new("info")
}

pub fn get_default_stdout_filter() -> EnvFilter {
    EnvFilter::new("info")
        // The event queue ticks constantly; keep it quiet relative to the
        // decisions the controller and allocator make.
        .add_directive("trunksim_entities::clock=warn".parse().unwrap())
        .add_directive("trunksim_entities::event_bus=warn".parse().unwrap())
        .add_directive("trunksim_entities::rf_scan=debug".parse().unwrap())
        .add_directive("trunksim_entities::site=info".parse().unwrap())
        .add_directive("trunksim_entities::unit=info".parse().unwrap())
        .add_directive("trunksim_entities::zone_controller=debug".parse().unwrap())
        .add_directive("trunksim_entities::call=debug".parse().unwrap())
}

fn get_default_logfile_filter() -> EnvFilter {
    EnvFilter::new("debug")
}

fn setup_logging(
    stdout_filter: EnvFilter,
    outfile: Option<(String, EnvFilter)>,
) -> Option<WorkerGuard> {
    if let Some((outfile, outfile_filter)) = outfile {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(outfile)
            .expect("failed to open log file");
        let (file_writer, guard) = tracing_appender::non_blocking(file);

        INIT_LOG.call_once(|| {
            let file_layer = tracingfmt::layer().with_writer(file_writer).with_ansi(false);
            let stdout_layer = tracingfmt::layer();

            tracing_subscriber::registry()
                .with(file_layer.with_filter(outfile_filter))
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });

        Some(guard)
    } else {
        INIT_LOG.call_once(|| {
            let stdout_layer = tracingfmt::layer();
            tracing_subscriber::registry()
                .with(stdout_layer.with_filter(stdout_filter))
                .init();
        });
        None
    }
}
