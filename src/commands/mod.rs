//! IPC command handlers, grouped by area. Thin wrappers over the domain
//! modules: parse the payload, call through, emit the relevant change event.

pub mod auth;
pub mod menu;
pub mod ocr;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod runtime;
pub mod settings;
pub mod shifts;
pub mod tabs;
