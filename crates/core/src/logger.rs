use std::{
    io::{BufWriter, Stdout, Write},
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{
        format::{Format, Writer},
        time::FormatTime,
        MakeWriter,
    },
    EnvFilter,
};

static SHUTDOWN_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

fn shutting_down() -> bool {
    SHUTDOWN_IN_PROGRESS.load(Ordering::Relaxed)
}

/// Per-event writer. Buffered while serving; once shutdown starts events go straight to
/// stdout so outcomes of transactions still being tracked are not lost on exit.
enum LogWriter {
    Buffered(BufWriter<Stdout>),
    Direct(Stdout),
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            LogWriter::Buffered(writer) => writer.write(buf),
            LogWriter::Direct(stdout) => stdout.lock().write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            LogWriter::Buffered(writer) => writer.flush(),
            LogWriter::Direct(stdout) => stdout.lock().flush(),
        }
    }
}

struct LogWriterMaker;

impl<'a> MakeWriter<'a> for LogWriterMaker {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        if shutting_down() {
            LogWriter::Direct(std::io::stdout())
        } else {
            LogWriter::Buffered(BufWriter::new(std::io::stdout()))
        }
    }
}

/// "19 October - 14:03:07.123456", shortened to "14:03:07" during shutdown.
struct BundlerTimer;

impl FormatTime for BundlerTimer {
    fn format_time(&self, writer: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        if shutting_down() {
            write!(writer, "{}", now.format("%H:%M:%S"))
        } else {
            write!(writer, "{} - {}", now.format("%d %B"), now.format("%H:%M:%S%.6f"))
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` directives are layered on top of `log_level`.
/// A second call is a no-op.
pub fn setup_logger(log_level: LevelFilter) {
    let filter = EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy();

    let format = Format::default().with_timer(BundlerTimer).with_level(true).with_target(false);

    let subscriber = tracing_subscriber::fmt()
        .with_writer(LogWriterMaker)
        .with_env_filter(filter)
        .event_format(format)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn setup_info_logger() {
    setup_logger(LevelFilter::INFO);
}

pub fn mark_shutdown_started() {
    SHUTDOWN_IN_PROGRESS.store(true, Ordering::Relaxed);
}
