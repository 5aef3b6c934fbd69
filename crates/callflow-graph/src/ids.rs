use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::taxonomy::NodeKind;

/// Value object: Node ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

/// Value object: Edge ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

/// Value object: Flow ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub String);

impl NodeId {
    /// Fresh id for a node of `kind`, e.g. `speak-3f2a…`.
    ///
    /// Ids are random so graphs built independently can be merged without collisions.
    pub fn generate(kind: NodeKind) -> Self {
        NodeId(format!("{}-{}", kind.as_str(), Uuid::new_v4().simple()))
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EdgeId {
    /// Fresh edge id
    pub fn generate() -> Self {
        EdgeId(format!("e-{}", Uuid::new_v4().simple()))
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FlowId {
    /// Fresh flow id
    pub fn generate() -> Self {
        FlowId(Uuid::new_v4().to_string())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_id {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(NodeId);
string_id!(EdgeId);
string_id!(FlowId);
