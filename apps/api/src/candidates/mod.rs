//! Candidate analysis: upload intake, the analyze pipeline, storage and HTTP handlers.

pub mod handlers;
pub mod intake;
pub mod service;
pub mod store;
