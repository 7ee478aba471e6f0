use super::{log_view, ui};
use crate::core::{LogSynchronizer, TriggerPhase};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    ToggleMode,
    RunFlashLoan,
    Reload,
    Quit,
}

impl DashboardAction {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "t" | "toggle" => Some(DashboardAction::ToggleMode),
            "r" | "run" => Some(DashboardAction::RunFlashLoan),
            "l" | "logs" | "reload" => Some(DashboardAction::Reload),
            "q" | "quit" | "exit" => Some(DashboardAction::Quit),
            _ => None,
        }
    }
}

const PROMPT: &str = "[t] toggle smart account  [r] run flash loan  [l] reload logs  [q] quit";

/// Interactive dashboard session reading one command per line from `input`.
///
/// Each action is awaited before the next line is read. The session ends on
/// `q` or end of input.
pub async fn run<R>(sync: &LogSynchronizer, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let state = sync.state();
    if let Err(e) = sync.refresh().await {
        println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
    }

    let mut lines = input.lines();
    loop {
        println!(
            "{}",
            log_view::render_dashboard(state.mode().await, &state.log().await)
        );
        println!("\n{}", ui::style_text(PROMPT, ui::StyleType::Subtle));

        let Some(line) = lines.next_line().await? else {
            debug!("Input closed, leaving dashboard");
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        match DashboardAction::parse(&line) {
            Some(DashboardAction::ToggleMode) => {
                state.toggle_mode().await;
            }
            Some(DashboardAction::RunFlashLoan) => {
                let mode = state.mode().await;
                let pb = ui::new_spinner(log_view::phase_message(TriggerPhase::Generating));
                let result = sync
                    .trigger_with(mode, |phase| pb.set_message(log_view::phase_message(phase)))
                    .await;
                pb.finish_and_clear();
                println!("{}", log_view::trigger_report(&result).text);
            }
            Some(DashboardAction::Reload) => {
                if let Err(e) = sync.refresh().await {
                    println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                }
            }
            Some(DashboardAction::Quit) => break,
            None => println!(
                "{}",
                ui::style_text(&format!("Unknown command: {}", line.trim()), ui::StyleType::Error)
            ),
        }
        ui::print_separator();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AccountKind, DashboardState, LoanStore};
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    fn session(store: &MemoryStore) -> LogSynchronizer {
        LogSynchronizer::new(Arc::new(store.clone()), Arc::new(DashboardState::default()))
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(DashboardAction::parse("t"), Some(DashboardAction::ToggleMode));
        assert_eq!(DashboardAction::parse(" R \n"), Some(DashboardAction::RunFlashLoan));
        assert_eq!(DashboardAction::parse("reload"), Some(DashboardAction::Reload));
        assert_eq!(DashboardAction::parse("quit"), Some(DashboardAction::Quit));
        assert_eq!(DashboardAction::parse("borrow"), None);
        assert_eq!(DashboardAction::parse(""), None);
    }

    #[tokio::test]
    async fn test_session_toggles_and_runs() {
        let store = MemoryStore::new();
        let sync = session(&store);

        run(&sync, &b"r\n\nt\n  \nr\nx\nq\nr\n"[..]).await.unwrap();

        // The trailing "r" after quit is never read
        let log = sync.state().log().await;
        assert_eq!(log.len(), 2);
        assert!(log[0].is_smart_account());
        assert!(log[0].user_address().starts_with("smart_0x"));
        assert!(!log[1].is_smart_account());
        assert_eq!(sync.state().mode().await, AccountKind::Smart);
    }

    #[tokio::test]
    async fn test_session_loads_log_and_ends_on_eof() {
        let store = MemoryStore::new();
        let existing = crate::core::record::generate(AccountKind::Wallet);
        store.insert(&existing).await.unwrap();
        let sync = session(&store);

        run(&sync, &b""[..]).await.unwrap();

        assert_eq!(sync.state().log().await, vec![existing]);
    }
}
