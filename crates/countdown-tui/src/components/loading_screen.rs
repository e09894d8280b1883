//! LoadingScreen component — full-screen spinner shown until the video is
//! ready or a fallback gives up on it.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
    Frame,
};

use crate::{
    action::ComponentId,
    app_state::AppState,
    component::Component,
    theme::{style_secondary, C_ACCENT, C_BG},
};

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub struct LoadingScreen {
    frame: usize,
}

impl LoadingScreen {
    pub fn new() -> Self {
        Self { frame: 0 }
    }

    fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()]
    }
}

impl Component for LoadingScreen {
    fn id(&self) -> ComponentId {
        ComponentId::LoadingScreen
    }

    fn tick(&mut self, _state: &AppState) {
        self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        // covers whatever is underneath
        frame.render_widget(Clear, area);
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .split(area);

        let line = Line::from(vec![
            Span::styled(self.spinner(), Style::default().fg(C_ACCENT)),
            Span::styled("  Video wird geladen…", style_secondary()),
        ]);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), rows[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countdown_proto::config::Config;

    #[test]
    fn test_spinner_wraps() {
        let state = AppState::new(&Config::default());
        let mut screen = LoadingScreen::new();
        let first = screen.spinner();
        for _ in 0..SPINNER_FRAMES.len() {
            screen.tick(&state);
        }
        assert_eq!(screen.spinner(), first);
        screen.tick(&state);
        assert_ne!(screen.spinner(), first);
    }
}
