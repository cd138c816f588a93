//! Core use-case services.
//!
//! # Responsibility
//! - Tie the in-memory store to its on-disk snapshot and audit log.
//! - Keep the edit surface decoupled from codec and file details.

pub mod review_session;
