//! Human-readable progress output

use tracing::debug;

/// Receives one line per meaningful event of a run
///
/// Sinks are fire-and-forget; nothing they do feeds back into control flow.
pub trait OutcomeSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Prints progress to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutcomeSink for ConsoleSink {
    fn emit(&self, line: &str) {
        debug!(target: "rent_reclaim::progress", "{}", line);
        println!("{}", line);
    }
}

/// Lamports to SOL for display
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}
