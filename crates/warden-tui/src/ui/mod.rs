//! UI rendering

pub mod layout;
pub mod screens;
pub mod theme;

pub use theme::Theme;

use ratatui::prelude::*;

use crate::app::{App, Screen};

/// Main render function - delegates to appropriate screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    match app.state.current_screen {
        Screen::PinSetup | Screen::PinEntry => screens::pin_entry::draw(frame, area, app),
        Screen::LedgerScan => screens::ledger_scan::draw(frame, area, app),
        Screen::Connected => screens::connected::draw(frame, area, app),
    }
}
