//! Identifier newtypes.
//!
//! Every entity is keyed by an opaque string. Identifiers coming from the
//! project store keep whatever form the store uses; identifiers minted by this
//! crate (scenarios, actions, results, baselines) are UUID v4 strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mints a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// Live project data
define_id!(TaskId);
define_id!(ProjectId);
define_id!(PortfolioId);
define_id!(UserId);
define_id!(TeamId);
define_id!(AllocationId);

// Scenario subsystem records
define_id!(ScenarioId);
define_id!(ActionId);
define_id!(ResultId);
define_id!(BaselineId);
define_id!(EvSnapshotId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_string() {
        let mut ids = vec![TaskId::from("t3"), TaskId::from("t1"), TaskId::from("t2")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "t1");
        assert_eq!(ids[2].to_string(), "t3");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(ScenarioId::generate(), ScenarioId::generate());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&ProjectId::from("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
    }
}
