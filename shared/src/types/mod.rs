//! Type definitions exchanged with the Auditor service

pub mod detail;
pub mod event;
