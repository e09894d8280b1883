//! CountdownPanel component — the four zero-padded fields with labels.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::{
    action::ComponentId,
    app_state::AppState,
    component::Component,
    theme::{style_digits, style_muted, C_PANEL_BORDER},
};

const CELL_WIDTH: u16 = 11;

pub struct CountdownPanel;

impl CountdownPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for CountdownPanel {
    fn id(&self) -> ComponentId {
        ComponentId::CountdownPanel
    }

    fn min_height(&self) -> u16 {
        4
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        let c = &state.countdown;
        let cells = [
            (c.days.as_str(), "Tage"),
            (c.hours.as_str(), "Stunden"),
            (c.minutes.as_str(), "Minuten"),
            (c.seconds.as_str(), "Sekunden"),
        ];

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .flex(Flex::Center)
            .constraints([Constraint::Length(CELL_WIDTH); 4])
            .split(area);

        for (&(value, label), &cell) in cells.iter().zip(columns.iter()) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(C_PANEL_BORDER));
            let lines = vec![
                Line::from(Span::styled(value, style_digits())),
                Line::from(Span::styled(label, style_muted())),
            ];
            frame.render_widget(
                Paragraph::new(lines)
                    .alignment(Alignment::Center)
                    .block(block),
                cell,
            );
        }
    }
}
