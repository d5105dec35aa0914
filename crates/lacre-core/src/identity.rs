//! # Identifier Newtypes
//!
//! Seals, sectors and packages are all keyed by positive 64-bit integers in
//! the backing database. The newtypes keep the three namespaces apart.
//!
//! `SealId` is the durable surrogate key assigned by the store at creation.
//! It increases monotonically and is the ordering key for distribution:
//! "oldest seal" always means "lowest `SealId`".

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Surrogate identifier of a seal, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealId(pub i64);

/// Identifier of a sector in the external sector directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(pub i64);

/// Identifier of a package record in the external package registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub i64);

macro_rules! positive_id {
    ($ty:ident, $kind:literal, $prefix:literal) => {
        impl $ty {
            /// Build an identifier, rejecting zero and negative values.
            pub fn new(value: i64) -> Result<Self, ValidationError> {
                if value <= 0 {
                    return Err(ValidationError::InvalidIdentifier {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Access the raw database value.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

positive_id!(SealId, "seal", "seal");
positive_id!(SectorId, "sector", "sector");
positive_id!(PackageId, "package", "package");
