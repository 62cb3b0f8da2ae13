//! Shared models and wire protocol for the warboard server and its views.

pub mod models;
pub mod protocol;
