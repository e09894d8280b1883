//! Status bar — bottom line with player health, last warning, and keys.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::core::PlayerHealth;
use crate::theme::{C_BADGE_ERR, C_BADGE_PENDING, C_MUTED, C_PLAYING, C_SECONDARY, C_WARNING};

fn badge_color(health: &PlayerHealth) -> ratatui::style::Color {
    match health {
        PlayerHealth::Failed(_) => C_BADGE_ERR,
        PlayerHealth::Starting => C_BADGE_PENDING,
        PlayerHealth::Disabled | PlayerHealth::Absent => C_SECONDARY,
        PlayerHealth::Running => C_PLAYING,
    }
}

/// Key hints for the current page state.
pub fn key_hints(reload_visible: bool) -> &'static str {
    if reload_visible {
        " r/Enter replay  q quit"
    } else {
        " q quit"
    }
}

/// Draw the one-row status line.
pub fn draw_status_bar(
    frame: &mut Frame,
    area: Rect,
    health: &PlayerHealth,
    last_warning: Option<&str>,
    reload_visible: bool,
) {
    let color = badge_color(health);
    let mut spans = vec![Span::styled("●", Style::default().fg(color))];
    if let Some(label) = health.badge_label() {
        spans.push(Span::styled(
            format!(" {}", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }

    spans.push(Span::styled(key_hints(reload_visible), Style::default().fg(C_MUTED)));

    if let Some(warning) = last_warning {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(warning, Style::default().fg(C_WARNING)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
