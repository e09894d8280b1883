//! ReloadButton component — replays the intro once it has finished.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::Style,
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use unicode_width::UnicodeWidthStr;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{style_default, C_BUTTON_BORDER},
};

const LABEL: &str = "↻ Nochmal abspielen";

pub struct ReloadButton;

impl ReloadButton {
    pub fn new() -> Self {
        Self
    }

    /// Where the button itself sits inside the row it was given.
    pub fn button_area(area: Rect) -> Rect {
        let [button] = Layout::horizontal([Constraint::Length(LABEL.width() as u16 + 4)])
            .flex(Flex::Center)
            .areas(area);
        button
    }
}

fn hit(r: Rect, col: u16, row: u16) -> bool {
    r.width > 0
        && r.height > 0
        && col >= r.x
        && col < r.x + r.width
        && row >= r.y
        && row < r.y + r.height
}

impl Component for ReloadButton {
    fn id(&self) -> ComponentId {
        ComponentId::ReloadButton
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Char('r') | KeyCode::Enter => vec![Action::Restart],
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        if event.kind != MouseEventKind::Down(MouseButton::Left) {
            return vec![];
        }
        if hit(Self::button_area(area), event.column, event.row) {
            vec![Action::Restart]
        } else {
            vec![]
        }
    }

    fn min_height(&self) -> u16 {
        3
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _state: &AppState) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(C_BUTTON_BORDER));
        frame.render_widget(
            Paragraph::new(LABEL)
                .style(style_default())
                .alignment(Alignment::Center)
                .block(block),
            Self::button_area(area),
        );
    }
}
