#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![doc = include_str!("../README.md")]

pub use dynval_testhelpers_macros::test;

mod counting;
pub use counting::{
    AllocStats, CountingAlloc, FailureGuard, assert_no_leaks, counting_active,
    fail_allocations_after, measure,
};

use std::sync::{LazyLock, Once};
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter variable read once, at first `setup()`.
pub const LOG_ENV: &str = "DYNVAL_LOG";

static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Event timestamps as seconds since the first test started.
struct SinceEpoch;

impl FormatTime for SinceEpoch {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        let t = EPOCH.elapsed();
        write!(w, "+{}.{:03}s", t.as_secs(), t.subsec_millis())
    }
}

/// Frames from libtest, std panicking and thread start-up.
fn is_harness_frame(name: &str) -> bool {
    const PREFIXES: &[&str] = &[
        "test::",
        "std::panicking::",
        "std::panic::",
        "core::panicking::",
        "std::sys::",
        "std::rt::",
        "core::ops::function::FnOnce::call_once",
        "__pthread",
    ];
    PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

fn install_panic_printer() {
    let verbosity = if cfg!(miri) {
        color_backtrace::Verbosity::Medium
    } else {
        color_backtrace::Verbosity::Full
    };
    color_backtrace::BacktracePrinter::new()
        .verbosity(verbosity)
        .add_frame_filter(Box::new(|frames| {
            frames.retain(|frame| frame.name.as_deref().is_none_or(|n| !is_harness_frame(n)))
        }))
        .install(Box::new(termcolor::StandardStream::stderr(
            termcolor::ColorChoice::AlwaysAnsi,
        )));
}

/// `DYNVAL_LOG` when it parses as a `Targets` list, else everything at DEBUG.
fn log_filter() -> Targets {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| directives.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(Level::DEBUG))
}

fn install_subscriber() {
    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_timer(SinceEpoch)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Another subscriber may already own the global slot; keep it
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(log_filter())
        .try_init();
}

/// Prepares the process for a test: colored panic backtraces with harness
/// frames hidden, and a tracing subscriber filtered by `DYNVAL_LOG`.
///
/// Every test may call this; only the first call in a process does work.
/// `#[dynval_testhelpers::test]` inserts the call for you.
pub fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        LazyLock::force(&EPOCH);
        install_panic_printer();
        install_subscriber();
    });
}
