//! Shared core of the countdown landing page: configuration, the countdown
//! calculator and the presentation state machine. Nothing in here touches a
//! terminal or a player process.

pub mod config;
pub mod countdown;
pub mod platform;
pub mod presentation;
