//! Taking and scoring assessments.
//!
//! Responses are scored as they are submitted; completion aggregates them per
//! competency area and writes the gap analysis in one transaction.

pub mod gap;
pub mod handlers;
pub mod lifecycle;
pub mod scoring;
pub mod store;
