use super::ui;
use crate::core::sync::Operation;
use crate::core::{AccountKind, LoanRecord, SyncError, TriggerPhase};
use chrono::{DateTime, Local, Utc};
use comfy_table::Cell;

pub const EMPTY_LOG_MESSAGE: &str = "No flash loans yet.";

/// Renders a timestamp in the local time zone.
pub fn format_local_time(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Renders the loan log as a table, or a placeholder when it is empty.
pub fn render_log(records: &[LoanRecord]) -> String {
    if records.is_empty() {
        return ui::style_text(EMPTY_LOG_MESSAGE, ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Account"),
        ui::header_cell("Address"),
        ui::header_cell("Amount (ETH)"),
        ui::header_cell("Time"),
    ]);

    for record in records {
        table.add_row(vec![
            ui::account_cell(record.kind()),
            Cell::new(record.user_address()),
            ui::amount_cell(record.amount_eth()),
            Cell::new(format_local_time(record.timestamp())),
        ]);
    }

    table.to_string()
}

/// Renders the whole dashboard: title, mode toggle and the log.
pub fn render_dashboard(mode: AccountKind, records: &[LoanRecord]) -> String {
    let checkbox = if mode.is_smart() { "[x]" } else { "[ ]" };
    let mut output = format!(
        "{}\n\n{} Use Smart Account\n\n",
        ui::style_text("⚡ FlashVault Dashboard", ui::StyleType::Title),
        checkbox
    );
    output.push_str(&ui::style_text("📜 Flash Loan Logs", ui::StyleType::Title));
    output.push('\n');
    output.push_str(&render_log(records));
    output
}

/// Spinner text for a trigger phase.
pub fn phase_message(phase: TriggerPhase) -> &'static str {
    match phase {
        TriggerPhase::Idle => "Done",
        TriggerPhase::Generating => "Generating loan record...",
        TriggerPhase::Inserting => "Saving flash loan...",
        TriggerPhase::InsertFailed => "Save failed",
        TriggerPhase::InsertOk => "Saved",
        TriggerPhase::Refreshing => "Refreshing log...",
        TriggerPhase::RefreshFailed => "Refresh failed",
        TriggerPhase::RefreshOk => "Log up to date",
    }
}

pub const TRIGGERED_MESSAGE: &str = "✅ Flash loan triggered!";

/// What to print once a trigger has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerReport {
    pub text: String,
    /// False when the loan was stored, even if the log could not be reloaded.
    pub failed: bool,
}

/// Describes the outcome of a trigger.
///
/// A failed refresh after an acknowledged insert is reported as a triggered
/// loan with a stale log notice.
pub fn trigger_report(result: &Result<LoanRecord, SyncError>) -> TriggerReport {
    match result {
        Ok(record) => TriggerReport {
            text: format!(
                "{} {} borrowed {:.2} ETH",
                ui::style_text(TRIGGERED_MESSAGE, ui::StyleType::Success),
                record.user_address(),
                record.amount_eth()
            ),
            failed: false,
        },
        Err(e) if e.operation() == Operation::Query => TriggerReport {
            text: format!(
                "{}\n{}",
                ui::style_text(TRIGGERED_MESSAGE, ui::StyleType::Success),
                ui::style_text(
                    &format!("Log may be out of date. {e}"),
                    ui::StyleType::Error
                )
            ),
            failed: false,
        },
        Err(e) => TriggerReport {
            text: ui::style_text(&e.to_string(), ui::StyleType::Error),
            failed: true,
        },
    }
}
