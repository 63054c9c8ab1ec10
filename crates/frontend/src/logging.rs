//! Browser console logging

use tracing::Level;
use tracing_subscriber::fmt::format::Pretty;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_web::{MakeWebConsoleWriter, performance_layer};

/// Send `tracing` events to the browser console and report panics there.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_browser_logging(max_level: Level) {
    console_error_panic_hook::set_once();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new().with_max_level(max_level));
    let perf_layer = performance_layer().with_details_from_fields(Pretty::default());

    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(perf_layer)
        .try_init();
}
