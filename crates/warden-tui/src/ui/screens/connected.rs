//! Shown once a Ledger is connected and the wallet app is open

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::App;
use crate::ui::layout::{centered_rect, render_footer, render_header, ScreenLayout};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let layout = ScreenLayout::new(area);

    render_header(frame, layout.header, "Accounts", theme);

    let dialog = centered_rect(60, 50, layout.content);
    let block = Block::default()
        .title(" Connected ")
        .title_style(theme.success())
        .borders(Borders::ALL)
        .border_style(theme.success());

    let lines = match &app.state.connected {
        Some((id, name)) => vec![
            Line::styled(format!("✓ {}", name), theme.success()),
            Line::from(""),
            Line::styled(format!("{} app is open", app.config.ledger_app), theme.text()),
            Line::styled(format!("Device: {}", id), theme.text_muted()),
        ],
        None => vec![Line::styled("No device", theme.text_muted())],
    };

    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(body, dialog);

    render_footer(
        frame,
        layout.footer,
        &[("b", "Back to devices"), ("q", "Quit")],
        theme,
    );
}
