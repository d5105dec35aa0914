//! # lacre-core — Foundational Types for the Seal Engine
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on: identifier newtypes, seal codes, lot labels, and the single
//! closed enumeration of seal statuses.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `SealId`, `SectorId` and
//!    `PackageId` are distinct types. A sector id cannot be passed where a
//!    seal id is expected.
//!
//! 2. **One status enumeration.** `SealStatus` has eight variants and one
//!    canonicalization function, [`SealStatus::canonicalize`], which accepts
//!    the historical spellings found in legacy data (Portuguese labels,
//!    accents, upper case, known typos). Everything written to a store goes
//!    through the canonical form.
//!
//! 3. **Validated constructors.** `SealPrefix`, `SealCode` and `LotNumber`
//!    cannot be built from invalid input.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lacre-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod code;
pub mod error;
pub mod identity;
pub mod status;

pub use code::{LotNumber, SealCode, SealPrefix, SEQUENCE_WIDTH};
pub use error::ValidationError;
pub use identity::{PackageId, SealId, SectorId};
pub use status::SealStatus;
