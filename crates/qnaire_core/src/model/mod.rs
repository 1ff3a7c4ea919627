//! Domain model for catalogs, attributes and recorded answers.
//!
//! # Responsibility
//! - Define canonical data structures consumed by the answers algorithm.
//! - Keep trees explicit and eagerly loaded so core logic is free of I/O.
//!
//! # Invariants
//! - Every domain object is identified by a stable `Uuid`.
//! - Core never mutates catalog, domain or value records while reporting.

pub mod catalog;
pub mod domain;
pub mod locale;
pub mod value;
