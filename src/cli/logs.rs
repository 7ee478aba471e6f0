use super::log_view;
use crate::core::LogSynchronizer;
use anyhow::Result;

/// Loads the full log and prints it.
pub async fn run(sync: &LogSynchronizer) -> Result<()> {
    let pb = super::ui::new_spinner("Fetching flash loans...");
    let result = sync.refresh().await;
    pb.finish_and_clear();

    let records = result?;
    println!("{}", log_view::render_log(&records));
    Ok(())
}
