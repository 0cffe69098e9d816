//! NewType wrappers for strong typing throughout the grid node.
//!
//! These types prevent accidental mixing of semantically different values
//! (e.g., passing a replica index where a partition id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a string NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Same as `newtype_string!`, for 4-byte integer identifiers that travel on the wire.
macro_rules! newtype_i32 {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new instance.
            pub const fn new(value: i32) -> Self {
                Self(value)
            }

            /// Get the raw wire value.
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_i32!(
    /// Identifier of a logical shard of the keyspace.
    ///
    /// Partitions are independently addressable and may be hosted on a
    /// different cluster member than the caller.
    PartitionId
);

newtype_i32!(
    /// Which copy of a partition an operation targets. `0` is the primary,
    /// higher values are backups.
    ReplicaIndex
);

impl ReplicaIndex {
    /// The primary replica.
    pub const PRIMARY: ReplicaIndex = ReplicaIndex(0);
}

impl Default for ReplicaIndex {
    fn default() -> Self {
        Self::PRIMARY
    }
}

newtype_string!(
    /// Address of the member that sent an operation (e.g., "10.0.0.4:5701").
    ///
    /// Propagated to every child operation so partition-local code can
    /// tell who asked.
    CallerAddress
);

newtype_string!(
    /// Name of the service that owns an operation (e.g., "grid:queue").
    ServiceName
);
