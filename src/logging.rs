//! Process logger setup.
//!
//! Configuration and level selection are out of scope (§1): this always builds an INFO-and-above,
//! asynchronously-flushed, human-readable logger to stdout.
use slog::Drain;
use slog::Logger;

/// Build the process root logger.
pub fn configure() -> Logger {
    let decorator = slog_term::TermDecorator::new().stdout().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, slog::o!())
}
