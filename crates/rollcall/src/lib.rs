//! Roll-number generation for school rosters.
//!
//! A roster lists one row per school. [`workflows::roster::RosterPipeline`] assigns
//! hierarchy codes, inflates each school's declared head count by a buffer, expands
//! the roster to one row per student, and projects the result into the full,
//! mapped, and teacher-code reports.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
