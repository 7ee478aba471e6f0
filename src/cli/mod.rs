pub mod dashboard;
pub mod log_view;
pub mod logs;
pub mod setup;
pub mod trigger;
pub mod ui;
