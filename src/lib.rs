//! Toast notification manager with a terminal front end.
//!
//! [`modules::notifications::Toaster`] owns the active toast set; the `app`
//! and `ui` modules render it with ratatui.

pub mod app;
pub mod config;
pub mod logging;
pub mod modules;
pub mod ui;
