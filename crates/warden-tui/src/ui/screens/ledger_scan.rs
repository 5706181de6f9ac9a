//! Ledger device list with per-device connection status

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use warden_core::device::ScanState;
use warden_core::Device;

use crate::app::App;
use crate::ui::layout::{centered_rect, render_footer, render_header, ScreenLayout};
use crate::ui::Theme;

/// Status suffix shown next to a device
fn device_status(state: &ScanState, device: &Device) -> Option<String> {
    if state.is_loading(&device.id) {
        return Some("connecting...".to_string());
    }
    state.error(&device.id).map(|e| e.to_string())
}

/// Draw the device list
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let layout = ScreenLayout::new(area);

    render_header(frame, layout.header, "Connect a Ledger", theme);

    let state = app.scan_snapshot().unwrap_or_default();

    let title = if state.refreshing {
        " Devices (scanning...) "
    } else {
        " Devices "
    };
    let block = Block::default()
        .title(title)
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border());

    let content = layout.content;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(content);

    let items: Vec<ListItem> = state
        .devices
        .iter()
        .enumerate()
        .map(|(i, device)| {
            let selected = i == app.state.device_index;
            let mut spans = vec![Span::styled(
                format!(" {} ", device.display_name()),
                theme.menu_item(selected),
            )];
            if let Some(status) = device_status(&state, device) {
                let style = if state.is_loading(&device.id) {
                    theme.text_secondary()
                } else {
                    theme.danger()
                };
                spans.push(Span::styled(format!("  {}", status), style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    if items.is_empty() {
        let hint = if state.refreshing {
            "Looking for devices. Plug in and unlock your Ledger."
        } else {
            "No device found. Press [s] to scan again."
        };
        let empty = Paragraph::new(hint)
            .style(theme.text_muted())
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, rows[0]);
    } else {
        frame.render_widget(List::new(items).block(block), rows[0]);
    }

    let problem = app.state.status.as_deref().or(state.scan_error.as_deref());
    if let Some(problem) = problem {
        let line = Paragraph::new(problem)
            .style(theme.danger())
            .alignment(Alignment::Center);
        frame.render_widget(line, rows[1]);
    }

    render_footer(
        frame,
        layout.footer,
        &[
            ("↑/↓", "Select"),
            ("Enter", "Connect"),
            ("s", "Scan"),
            ("Esc", "Quit"),
        ],
        theme,
    );

    if let Some(device) = &app.state.app_missing {
        draw_app_missing(frame, area, device, &app.config.ledger_app, theme);
    }
}

fn draw_app_missing(frame: &mut Frame, area: Rect, device: &Device, app_name: &str, theme: &Theme) {
    let dialog = centered_rect(60, 30, area);
    frame.render_widget(Clear, dialog);

    let block = Block::default()
        .title(format!(" {} app not found ", app_name))
        .title_style(theme.warning())
        .borders(Borders::ALL)
        .border_style(theme.warning());

    let text = vec![
        Line::from(format!(
            "Install or open the {} app on your {}.",
            app_name,
            device.display_name()
        )),
        Line::from(""),
        Line::styled("[r] Retry    [Esc] Dismiss", theme.text_muted()),
    ];

    let body = Paragraph::new(text)
        .style(theme.text())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(body, dialog);
}
