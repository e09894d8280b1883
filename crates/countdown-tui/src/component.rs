//! Component trait — the interface every page region implements.
//!
//! Components render from `AppState` (read-only) and produce `Vec<Action>`
//! for the App to dispatch. Whether a region is drawn at all is decided by
//! the App from the visibility flags the core publishes.

use ratatui::crossterm::event::{KeyEvent, MouseEvent};
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key event while the region is on screen.
    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    /// Handle a mouse event. `area` is where the component was last drawn.
    fn handle_mouse(&mut self, _event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        Vec::new()
    }

    /// Called each UI tick (~100ms) for animation.
    fn tick(&mut self, _state: &AppState) {}

    /// Render the component into `area`.
    fn draw(&mut self, frame: &mut Frame, area: Rect, state: &AppState);

    /// Rows needed to render meaningfully.
    fn min_height(&self) -> u16 {
        1
    }
}
