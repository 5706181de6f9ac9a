//! PIN entry and PIN creation screen

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use warden_core::PIN_LENGTH;

use crate::app::{App, Screen};
use crate::ui::layout::centered_rect;

/// Masked PIN slots, filled dots first
fn pin_dots(filled: usize) -> String {
    (0..PIN_LENGTH)
        .map(|i| if i < filled { '●' } else { '○' })
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Draw the PIN screen
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let snapshot = app.pin_snapshot();
    let locked = snapshot.locked_until.is_some();

    let dialog = centered_rect(50, 40, area);

    let (title, instructions) = match app.state.current_screen {
        Screen::PinSetup if app.is_confirming() => (" Create PIN ", "Enter the same PIN again"),
        Screen::PinSetup => (" Create PIN ", "Choose a 6-digit PIN"),
        _ => (" Authentication Required ", "Enter your PIN to unlock"),
    };

    let block = Block::default()
        .title(title)
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(if locked {
            theme.danger()
        } else {
            theme.border_focused()
        });

    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Length(2), // Instructions
            Constraint::Length(2), // PIN display
            Constraint::Length(2), // Message
            Constraint::Min(0),    // Spacer
            Constraint::Length(1), // Help
        ])
        .split(inner);

    let logo = Paragraph::new("◆ WARDEN")
        .style(theme.title())
        .alignment(Alignment::Center);
    frame.render_widget(logo, chunks[0]);

    let instructions = Paragraph::new(instructions)
        .style(theme.text_secondary())
        .alignment(Alignment::Center);
    frame.render_widget(instructions, chunks[1]);

    let pin_style = if locked {
        theme.pin_placeholder()
    } else {
        theme.pin_dot()
    };
    let pin_widget = Paragraph::new(pin_dots(snapshot.filled))
        .style(pin_style)
        .alignment(Alignment::Center);
    frame.render_widget(pin_widget, chunks[2]);

    if !snapshot.error_message.is_empty() {
        let style = if locked {
            theme.danger()
        } else {
            theme.warning()
        };
        let message = Paragraph::new(snapshot.error_message.as_str())
            .style(style)
            .alignment(Alignment::Center);
        frame.render_widget(message, chunks[3]);
    }

    let help = if locked {
        "Locked    [Esc] Quit"
    } else {
        "[0-9] Digit    [Backspace] Delete    [Esc] Quit"
    };
    let help_widget = Paragraph::new(help)
        .style(theme.text_muted())
        .alignment(Alignment::Center);
    frame.render_widget(help_widget, chunks[5]);

    // Attempts remaining warning
    if app.state.current_screen == Screen::PinEntry && !locked {
        let attempts = app.attempts_remaining();
        if attempts > 0 && attempts <= 2 {
            let warning = if attempts == 1 {
                "⚠ 1 attempt remaining before lockout".to_string()
            } else {
                format!("⚠ {} attempts remaining before lockout", attempts)
            };
            let warning_y = dialog.y + dialog.height + 1;
            if warning_y < area.height {
                let warning_widget = Paragraph::new(warning)
                    .style(theme.warning())
                    .alignment(Alignment::Center);
                frame.render_widget(warning_widget, Rect::new(area.x, warning_y, area.width, 1));
            }
        }
    }
}
