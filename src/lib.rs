//! termselect: inline single- and multi-choice menus for the terminal.

pub mod report;
pub mod terminal;
pub mod tui;
pub mod types;

#[cfg(unix)]
pub use tui::run::{multiselect, singleselect};
pub use tui::run::{run_multiselect, run_singleselect, Console};
pub use types::{MenuConfig, MenuError, OutputFormat};
