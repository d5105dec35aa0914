//! # lacre-state — Seal Lifecycle Rules
//!
//! Pure, storage-independent rules about seal statuses.
//!
//! ## Lifecycle
//!
//! ```text
//!               ┌──────────────┬──────────────┐
//!               ▼              │              │
//! Available ──▶ Assigned ◀──▶ Reserved        │
//!     │            │              │           │
//!     │            └──▶ Linked ◀──┘           │
//!     │                   │                   │
//!     │                   └──▶ Used (final)   │
//!     │                                       │
//!     ├──▶ Lost / Damaged (final, from any held state too)
//!     └──▶ Destroyed (final, only from Available)
//! ```
//!
//! - **Lifecycle** (`lifecycle.rs`): the transition table and
//!   [`check_transition`], used by every status-changing write.
//!
//! - **Availability** (`availability.rs`): the read-time view that combines
//!   a seal's stored status with the package registry backlink.

pub mod availability;
pub mod lifecycle;

pub use availability::{resolve_availability, Availability};
pub use lifecycle::{allowed_transitions, check_transition, is_final, SealLifecycleError};
