//! Per-phase error isolation (§4.4, §7): a phase failing must not prevent later phases of the
//! same data stream, nor the processing of other data streams, from running.
//!
//! Generalised from the teacher's per-node sync isolation
//! (`core-logic/task/orchestrate/src/sync/error.rs`'s `NodeSpecificCheck`) to "per data-stream
//! phase": every phase failure here is equally non-fatal, so the simpler shape is a catch-and-log
//! rather than a two-way classification.
use replicore_lifecycle_context::Context;

/// Run `phase`, logging (and swallowing) any error against `data_stream` rather than propagating
/// it to the caller.
pub async fn run_phase<F, Fut>(context: &Context, data_stream: &str, phase: &'static str, body: F)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    if let Err(error) = body().await {
        slog::error!(
            context.logger, "Lifecycle phase failed";
            "data_stream" => data_stream,
            "phase" => phase,
            "error" => %error,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::run_phase;
    use replicore_lifecycle_context::Context;

    #[tokio::test]
    async fn failure_is_swallowed() {
        let context = Context::fixture();
        run_phase(&context, "logs", "rollover", || async {
            anyhow::bail!("transport unavailable")
        })
        .await;
    }

    #[tokio::test]
    async fn success_is_a_noop() {
        let context = Context::fixture();
        let mut ran = false;
        run_phase(&context, "logs", "rollover", || async {
            ran = true;
            Ok(())
        })
        .await;
        assert!(ran);
    }
}
