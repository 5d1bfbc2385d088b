// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID types for the data model.
//!
//! Most identifiers in this system are small monotonic integers persisted
//! in JSON or SQLite (job ids, VM ids, crash ids) rather than opaque
//! strings, so — unlike a string-keyed domain — there is no `define_id!`
//! newtype-over-String macro here. Instead each integer id is a distinct
//! newtype over `i64` so a `JobId` and a `CrashId` can never be swapped by
//! accident at a call site.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_int_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

define_int_id! {
    /// Unique identifier for a fuzzing job.
    pub struct JobId;
}

define_int_id! {
    /// Unique identifier for a VM record, strictly increasing within one registry.
    pub struct VmId;
}

define_int_id! {
    /// Unique identifier for a test case row.
    pub struct TestCaseId;
}

define_int_id! {
    /// Unique identifier for a crash row.
    pub struct CrashId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_through_json() {
        let id = JobId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: JobId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_inner_value() {
        assert_eq!(VmId::new(42).to_string(), "42");
    }
}
