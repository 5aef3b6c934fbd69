use std::fmt;
use thiserror::Error;

use crate::ids::{EdgeId, NodeId};
use crate::taxonomy::{NodeKind, PayloadProblem};

/// Errors raised by the flow graph model.
///
/// Every variant is a local rejection: the operation that produced it left the
/// graph untouched, and the caller may correct the input and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A kind name outside the closed taxonomy
    #[error("Unknown node kind: '{0}'")]
    UnknownNodeKind(String),

    /// A payload that does not satisfy its kind's field contract
    #[error("Invalid payload for {kind} node{}: {}", NodeSuffix(.node), ProblemList(.problems))]
    InvalidPayload {
        /// Node being created or updated, when it already has an id
        node: Option<NodeId>,
        /// Kind whose contract was violated
        kind: NodeKind,
        /// Every missing or malformed field
        problems: Vec<PayloadProblem>,
    },

    /// Node id absent from the graph
    #[error("Node not found: '{0}'")]
    NodeNotFound(NodeId),

    /// Edge id absent from the graph
    #[error("Edge not found: '{0}'")]
    EdgeNotFound(EdgeId),

    /// Edge rejected by a structural rule
    #[error("Invalid edge from '{from}' to '{to}': {reason}")]
    InvalidEdge {
        /// Source node id
        from: NodeId,
        /// Target node id
        to: NodeId,
        /// Which rule rejected it
        reason: String,
    },

    /// The same (source, target, branch key) transition declared twice
    #[error("Duplicate edge from '{from}' to '{to}'{}", BranchSuffix(.branch_key))]
    DuplicateEdge {
        /// Source node id
        from: NodeId,
        /// Target node id
        to: NodeId,
        /// Branch key shared by both declarations
        branch_key: Option<String>,
        /// Id of the edge that already declares the transition
        existing: EdgeId,
    },

    /// A stored or transmitted document that cannot be turned into a graph
    #[error("Corrupt flow document: {0}")]
    CorruptFlowDocument(String),

    /// Flow documents must carry a name
    #[error("Flow name is required")]
    EmptyFlowName,

    /// Encoding a document failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

struct ProblemList<'a>(&'a Vec<PayloadProblem>);

impl fmt::Display for ProblemList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", problem)?;
        }
        Ok(())
    }
}

struct NodeSuffix<'a>(&'a Option<NodeId>);

impl fmt::Display for NodeSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, " '{}'", id),
            None => Ok(()),
        }
    }
}

struct BranchSuffix<'a>(&'a Option<String>);

impl fmt::Display for BranchSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(key) => write!(f, " with branch key '{}'", key),
            None => Ok(()),
        }
    }
}

impl GraphError {
    /// Stable identifier for this error, suitable for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::UnknownNodeKind(_) => "ERR_GRAPH_UNKNOWN_NODE_KIND",
            GraphError::InvalidPayload { .. } => "ERR_GRAPH_INVALID_PAYLOAD",
            GraphError::NodeNotFound(_) => "ERR_GRAPH_NODE_NOT_FOUND",
            GraphError::EdgeNotFound(_) => "ERR_GRAPH_EDGE_NOT_FOUND",
            GraphError::InvalidEdge { .. } => "ERR_GRAPH_INVALID_EDGE",
            GraphError::DuplicateEdge { .. } => "ERR_GRAPH_DUPLICATE_EDGE",
            GraphError::CorruptFlowDocument(_) => "ERR_GRAPH_CORRUPT_DOCUMENT",
            GraphError::EmptyFlowName => "ERR_GRAPH_EMPTY_FLOW_NAME",
            GraphError::Serialization(_) => "ERR_GRAPH_SERIALIZATION",
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::CorruptFlowDocument(err.to_string())
    }
}

impl From<serde_yaml::Error> for GraphError {
    fn from(err: serde_yaml::Error) -> Self {
        GraphError::CorruptFlowDocument(err.to_string())
    }
}
