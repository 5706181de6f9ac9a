//! Screen implementations

pub mod connected;
pub mod ledger_scan;
pub mod pin_entry;
