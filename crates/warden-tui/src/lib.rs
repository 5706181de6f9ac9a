//! Warden TUI Library
//!
//! Terminal front end for the Warden PIN lock and Ledger pairing flows.

pub mod app;
pub mod hardware;
pub mod ui;

pub use app::App;
