//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository reads into report-level APIs.
//! - Keep CLI callers decoupled from storage details.

pub mod answers_service;
pub mod task_service;
