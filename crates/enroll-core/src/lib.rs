//! # enroll-core — Foundational Types for the Enrollment Core
//!
//! Every other crate in the workspace depends on `enroll-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `SubjectId`, `RegistrationId` and
//!    `TimeslotId` are distinct types with validated constructors. A
//!    registration identifier can never be passed where a subject is expected.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is always UTC with seconds
//!    precision and renders as `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `enroll-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::ValidationError;
pub use identity::{RegistrationId, SubjectId, TimeslotId};
pub use temporal::Timestamp;
