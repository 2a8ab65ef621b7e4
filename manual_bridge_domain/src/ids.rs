// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Identifier Value Objects
//!
//! Every entity in this domain is identified by a ULID wrapped in a distinct,
//! phantom-typed newtype so a `ProcessId` and a `CitationId` can never be
//! confused at a call site even though both are "just a ULID" underneath.
//! ULIDs sort lexicographically by creation time, which is useful for the
//! bounded history rings and journals used throughout the reliability and
//! observability components.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::hash::Hash;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::PipelineError;

/// Per-category behavior for a [`GenericId`]. Most categories accept the
/// default (no nil ids); override `validate_id` for stricter rules.
pub trait IdCategory {
    fn category_name() -> &'static str;

    fn validate_id(ulid: &Ulid) -> Result<(), PipelineError> {
        if *ulid == Ulid::nil() {
            return Err(PipelineError::invalid_config(format!(
                "{} id cannot be nil",
                Self::category_name()
            )));
        }
        Ok(())
    }
}

/// A type-safe, time-ordered identifier. See the category newtypes below for
/// the identifiers actually used across the domain.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GenericId<T: IdCategory> {
    value: Ulid,
    _phantom: PhantomData<T>,
}

impl<T: IdCategory> Serialize for GenericId<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.to_string().serialize(serializer)
    }
}

impl<'de, T: IdCategory> Deserialize<'de> for GenericId<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = Ulid::from_str(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { value, _phantom: PhantomData })
    }
}

impl<T: IdCategory> GenericId<T> {
    pub fn new() -> Self {
        Self { value: Ulid::new(), _phantom: PhantomData }
    }

    pub fn from_ulid(ulid: Ulid) -> Result<Self, PipelineError> {
        T::validate_id(&ulid)?;
        Ok(Self { value: ulid, _phantom: PhantomData })
    }

    pub fn from_string(s: &str) -> Result<Self, PipelineError> {
        let ulid = Ulid::from_str(s).map_err(|e| PipelineError::invalid_config(format!("invalid id: {e}")))?;
        Self::from_ulid(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.value
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.value.timestamp_ms()
    }

    pub fn category(&self) -> &'static str {
        T::category_name()
    }
}

impl<T: IdCategory> Default for GenericId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IdCategory> Display for GenericId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: IdCategory> FromStr for GenericId<T> {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

macro_rules! id_category {
    ($marker:ident, $id:ident, $name:literal) => {
        #[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $marker;

        impl IdCategory for $marker {
            fn category_name() -> &'static str {
                $name
            }
        }

        #[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
        pub struct $id(GenericId<$marker>);

        impl $id {
            pub fn new() -> Self {
                Self(GenericId::new())
            }

            pub fn from_string(s: &str) -> Result<Self, PipelineError> {
                Ok(Self(GenericId::from_string(s)?))
            }

            pub fn timestamp_ms(&self) -> u64 {
                self.0.timestamp_ms()
            }
        }

        impl Default for $id {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $id {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_string(s)
            }
        }
    };
}

id_category!(ProcessMarker, ProcessId, "process");
id_category!(CitationMarker, CitationId, "citation");
id_category!(TxnMarker, TxnId, "transaction");
id_category!(AlertMarker, AlertId, "alert");
id_category!(ChangeMarker, ChangeId, "config_change");
id_category!(AuditEventMarker, AuditEventId, "audit_event");
id_category!(DlqRecordMarker, DlqRecordId, "dlq_record");
id_category!(RecoveryExecutionMarker, RecoveryExecutionId, "recovery_execution");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = ProcessId::new();
        let s = id.to_string();
        assert_eq!(ProcessId::from_string(&s).unwrap(), id);
    }

    #[test]
    fn distinct_categories_are_distinct_types() {
        let process = ProcessId::new();
        let citation = CitationId::from_string(&process.to_string()).unwrap();
        // Same underlying ULID string, but the two are different Rust types -
        // this line wouldn't compile if they were the same type with different values:
        assert_eq!(process.to_string(), citation.to_string());
    }

    #[test]
    fn nil_ulid_is_rejected() {
        let nil = Ulid::nil().to_string();
        assert!(ProcessId::from_string(&nil).is_err());
    }
}
