pub mod countdown_panel;
pub mod loading_screen;
pub mod reload_button;
pub mod title_footer;
