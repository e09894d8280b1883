//! Action enum — user intents produced by components and key handling.

/// Identifier for each drawable region of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    LoadingScreen,
    TitleFooter,
    CountdownPanel,
    ReloadButton,
}

/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Replay the intro from the start.
    Restart,
    Quit,
}
