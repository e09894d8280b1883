//! TitleFooter component — event name with the date line beneath it.

use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    action::ComponentId,
    app_state::AppState,
    component::Component,
    theme::{style_secondary, style_title},
};

pub struct TitleFooter;

impl TitleFooter {
    pub fn new() -> Self {
        Self
    }
}

/// Cut `text` to at most `max_width` terminal columns, marking the cut with
/// an ellipsis.
fn fit_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

impl Component for TitleFooter {
    fn id(&self) -> ComponentId {
        ComponentId::TitleFooter
    }

    fn min_height(&self) -> u16 {
        2
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let width = area.width as usize;
        let lines = vec![
            Line::from(Span::styled(fit_width(&state.title, width), style_title())),
            Line::from(Span::styled(
                fit_width(&state.subtitle, width),
                style_secondary(),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_width() {
        assert_eq!(fit_width("Fischerstiching 2029", 40), "Fischerstiching 2029");
        assert_eq!(fit_width("Fischerstiching", 8), "Fischer…");
        assert_eq!(fit_width("abc", 0), "");
        // wide glyphs count two columns
        let cut = fit_width("日本語テキスト", 7);
        assert!(cut.width() <= 7);
        assert!(cut.ends_with('…'));
    }
}
