//! Terminal front-end for the chat widget.
//!
//! Everything here is presentation: it reads the widget state and calls the
//! widget's two verbs, submit and toggle panel.

pub mod render;
pub mod tui;

pub use tui::run_tui;
