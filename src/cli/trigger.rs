use super::{log_view, ui};
use crate::core::{AccountKind, LogSynchronizer, TriggerPhase};
use anyhow::{Result, bail};
use futures::future::join_all;
use tracing::warn;

/// Runs `count` flash loans and prints the resulting log.
///
/// The log is loaded once up front so a failed insert still shows what was
/// already recorded. With `count > 1` the triggers run concurrently without
/// any ordering between them.
pub async fn run(sync: &LogSynchronizer, kind: AccountKind, count: usize) -> Result<()> {
    if let Err(e) = sync.refresh().await {
        println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
    }

    let pb = ui::new_spinner(log_view::phase_message(TriggerPhase::Generating));
    let runs = (0..count).map(|_| {
        let pb = pb.clone();
        async move {
            sync.trigger_with(kind, |phase| pb.set_message(log_view::phase_message(phase)))
                .await
        }
    });
    let results = join_all(runs).await;
    pb.finish_and_clear();

    let mut failures = 0;
    for result in &results {
        let report = log_view::trigger_report(result);
        if report.failed {
            failures += 1;
        }
        println!("{}", report.text);
    }

    println!();
    println!("{}", log_view::render_log(&sync.state().log().await));

    if failures > 0 {
        warn!(failures, count, "Some flash loans failed");
        bail!("{failures} of {count} flash loan(s) failed");
    }
    Ok(())
}
