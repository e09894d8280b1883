//! Color palette and style constants for the countdown page.

use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(12, 12, 16);
pub const C_ACCENT: Color = Color::Rgb(255, 95, 95);
pub const C_PLAYING: Color = Color::Rgb(80, 200, 120);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(230, 230, 240);
pub const C_DIGITS: Color = Color::Rgb(255, 210, 50);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_BUTTON_BORDER: Color = Color::Rgb(120, 100, 200);
pub const C_BADGE_ERR: Color = Color::Rgb(255, 95, 95);
pub const C_BADGE_PENDING: Color = Color::Rgb(255, 184, 80);
pub const C_WARNING: Color = Color::Rgb(255, 184, 80);

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_title() -> Style {
    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn style_digits() -> Style {
    Style::default().fg(C_DIGITS).add_modifier(Modifier::BOLD)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}
