//! The closed vocabulary of node kinds.
//!
//! Every kind belongs to exactly one [`NodeCategory`] and declares the payload
//! fields it understands. Fields a kind does not declare are carried through
//! untouched; declared fields are type-checked whenever a node is created or
//! updated, and again by the validation engine.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

/// Freeform node payload; declared fields are checked against [`NodeKind::fields`].
pub type Payload = serde_json::Map<String, Value>;

lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

/// HTTP methods a webhook node may use
pub const WEBHOOK_METHODS: &[&str] = &["GET", "POST", "PUT"];

/// Outcomes an End Call node may tag a call with
pub const CALL_OUTCOMES: &[&str] = &[
    "interested",
    "not_interested",
    "callback",
    "wrong_number",
    "voicemail",
    "completed",
    "no_answer",
    "busy",
    "failed",
];

/// Role a node plays in the conversation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry points; never the target of an edge
    Trigger,
    /// Things the agent says or hears
    Speech,
    /// Conditional branches keyed by outcome
    Logic,
    /// Side effects and call control
    Action,
    /// Terminates the call
    Ending,
}

impl NodeCategory {
    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Trigger => "trigger",
            NodeCategory::Speech => "speech",
            NodeCategory::Logic => "logic",
            NodeCategory::Action => "action",
            NodeCategory::Ending => "ending",
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every node kind a flow may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    StartOutbound,
    StartInbound,
    Greeting,
    Speak,
    Listen,
    LlmResponse,
    BranchIntent,
    BranchKeyword,
    BranchSentiment,
    SetVariable,
    Webhook,
    Transfer,
    Wait,
    EndCall,
}

/// Primitive shape of a payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// A string; when required it must not be blank
    Text,
    /// An absolute http(s) URL
    Url,
    /// One of a fixed set of strings
    Choice(&'static [&'static str]),
    /// Any JSON number
    Number,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => f.write_str("a string"),
            FieldType::Url => f.write_str("an http(s) URL"),
            FieldType::Choice(options) => write!(f, "one of {}", options.join(", ")),
            FieldType::Number => f.write_str("a number"),
        }
    }
}

/// A payload field a kind declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

const fn required(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty, required: true }
}

const fn optional(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty, required: false }
}

const NO_FIELDS: &[FieldSpec] = &[];
const TEXT_FIELDS: &[FieldSpec] = &[required("text", FieldType::Text)];
const LISTEN_FIELDS: &[FieldSpec] = &[optional("timeout_seconds", FieldType::Number)];
const LLM_FIELDS: &[FieldSpec] = &[optional("instructions", FieldType::Text)];
const BRANCH_FIELDS: &[FieldSpec] = &[optional("condition", FieldType::Text)];
const SET_VARIABLE_FIELDS: &[FieldSpec] = &[required("variable_name", FieldType::Text)];
const WEBHOOK_FIELDS: &[FieldSpec] = &[
    required("url", FieldType::Url),
    required("method", FieldType::Choice(WEBHOOK_METHODS)),
];
const TRANSFER_FIELDS: &[FieldSpec] = &[required("transfer_to", FieldType::Text)];
const WAIT_FIELDS: &[FieldSpec] = &[optional("seconds", FieldType::Number)];
const END_CALL_FIELDS: &[FieldSpec] = &[
    optional("closing_message", FieldType::Text),
    optional("outcome", FieldType::Choice(CALL_OUTCOMES)),
];

/// One way a payload violates its kind's contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadProblem {
    /// Required field absent or null
    Missing { field: &'static str },
    /// Required text field present but blank
    Blank { field: &'static str },
    /// Field present with the wrong primitive type or an unlisted value
    WrongType { field: &'static str, expected: FieldType },
}

impl PayloadProblem {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            PayloadProblem::Missing { field }
            | PayloadProblem::Blank { field }
            | PayloadProblem::WrongType { field, .. } => field,
        }
    }
}

impl fmt::Display for PayloadProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadProblem::Missing { field } => write!(f, "missing required field '{}'", field),
            PayloadProblem::Blank { field } => write!(f, "field '{}' must not be empty", field),
            PayloadProblem::WrongType { field, expected } => {
                write!(f, "field '{}' must be {}", field, expected)
            }
        }
    }
}

impl NodeKind {
    /// All kinds, in palette order
    pub const ALL: [NodeKind; 14] = [
        NodeKind::StartOutbound,
        NodeKind::StartInbound,
        NodeKind::Greeting,
        NodeKind::Speak,
        NodeKind::Listen,
        NodeKind::LlmResponse,
        NodeKind::BranchIntent,
        NodeKind::BranchKeyword,
        NodeKind::BranchSentiment,
        NodeKind::SetVariable,
        NodeKind::Webhook,
        NodeKind::Transfer,
        NodeKind::Wait,
        NodeKind::EndCall,
    ];

    /// Wire name, as stored in the `type` field of a serialized node
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::StartOutbound => "start_outbound",
            NodeKind::StartInbound => "start_inbound",
            NodeKind::Greeting => "greeting",
            NodeKind::Speak => "speak",
            NodeKind::Listen => "listen",
            NodeKind::LlmResponse => "llm_response",
            NodeKind::BranchIntent => "branch_intent",
            NodeKind::BranchKeyword => "branch_keyword",
            NodeKind::BranchSentiment => "branch_sentiment",
            NodeKind::SetVariable => "set_variable",
            NodeKind::Webhook => "webhook",
            NodeKind::Transfer => "transfer",
            NodeKind::Wait => "wait",
            NodeKind::EndCall => "end_call",
        }
    }

    /// Human-readable name, also the default label of a new node
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::StartOutbound => "Start (Outbound)",
            NodeKind::StartInbound => "Start (Inbound)",
            NodeKind::Greeting => "Greeting",
            NodeKind::Speak => "Speak",
            NodeKind::Listen => "Listen",
            NodeKind::LlmResponse => "LLM Response",
            NodeKind::BranchIntent => "Branch (Intent)",
            NodeKind::BranchKeyword => "Branch (Keyword)",
            NodeKind::BranchSentiment => "Branch (Sentiment)",
            NodeKind::SetVariable => "Set Variable",
            NodeKind::Webhook => "Webhook",
            NodeKind::Transfer => "Transfer",
            NodeKind::Wait => "Wait",
            NodeKind::EndCall => "End Call",
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            NodeKind::StartOutbound | NodeKind::StartInbound => NodeCategory::Trigger,
            NodeKind::Greeting | NodeKind::Speak | NodeKind::Listen | NodeKind::LlmResponse => {
                NodeCategory::Speech
            }
            NodeKind::BranchIntent | NodeKind::BranchKeyword | NodeKind::BranchSentiment => {
                NodeCategory::Logic
            }
            NodeKind::SetVariable | NodeKind::Webhook | NodeKind::Transfer | NodeKind::Wait => {
                NodeCategory::Action
            }
            NodeKind::EndCall => NodeCategory::Ending,
        }
    }

    /// Payload fields this kind declares
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            NodeKind::StartOutbound | NodeKind::StartInbound | NodeKind::BranchSentiment => {
                NO_FIELDS
            }
            NodeKind::Greeting | NodeKind::Speak => TEXT_FIELDS,
            NodeKind::Listen => LISTEN_FIELDS,
            NodeKind::LlmResponse => LLM_FIELDS,
            NodeKind::BranchIntent | NodeKind::BranchKeyword => BRANCH_FIELDS,
            NodeKind::SetVariable => SET_VARIABLE_FIELDS,
            NodeKind::Webhook => WEBHOOK_FIELDS,
            NodeKind::Transfer => TRANSFER_FIELDS,
            NodeKind::Wait => WAIT_FIELDS,
            NodeKind::EndCall => END_CALL_FIELDS,
        }
    }

    /// Names of the fields a payload must carry
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields().iter().filter(|f| f.required).map(|f| f.name)
    }

    pub fn is_trigger(&self) -> bool {
        self.category() == NodeCategory::Trigger
    }

    /// Whether a finished flow may leave this node with no outgoing edge
    pub fn may_terminate(&self) -> bool {
        self.category() == NodeCategory::Ending
    }

    /// Whether every outgoing edge must carry a distinct branch key.
    ///
    /// For every other kind a second outgoing edge makes control flow ambiguous.
    /// That is reported in [`ValidationReport::warnings`] and never affects
    /// [`ValidationReport::valid`]; only branch nodes are held to their keys
    /// in `issues`.
    ///
    /// [`ValidationReport::warnings`]: crate::validation::ValidationReport::warnings
    /// [`ValidationReport::valid`]: crate::validation::ValidationReport::valid
    pub fn requires_branch_keys(&self) -> bool {
        self.category() == NodeCategory::Logic
    }

    /// Check `payload` against this kind's field contract, collecting every problem
    pub fn check_payload(&self, payload: &Payload) -> Result<(), Vec<PayloadProblem>> {
        let problems: Vec<PayloadProblem> = self
            .fields()
            .iter()
            .filter_map(|spec| check_field(spec, payload.get(spec.name)))
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

fn check_field(spec: &FieldSpec, value: Option<&Value>) -> Option<PayloadProblem> {
    let value = match value {
        None | Some(Value::Null) if spec.required => {
            return Some(PayloadProblem::Missing { field: spec.name })
        }
        None | Some(Value::Null) => return None,
        Some(value) => value,
    };

    let wrong_type = PayloadProblem::WrongType {
        field: spec.name,
        expected: spec.ty,
    };

    match spec.ty {
        FieldType::Text => match value.as_str() {
            Some(text) if spec.required && text.trim().is_empty() => {
                Some(PayloadProblem::Blank { field: spec.name })
            }
            Some(_) => None,
            None => Some(wrong_type),
        },
        FieldType::Url => match value.as_str() {
            Some(text) if text.trim().is_empty() && spec.required => {
                Some(PayloadProblem::Blank { field: spec.name })
            }
            Some(text) if URL_REGEX.is_match(text.trim()) => None,
            _ => Some(wrong_type),
        },
        FieldType::Choice(options) => match value.as_str() {
            Some(choice) if options.contains(&choice) => None,
            _ => Some(wrong_type),
        },
        FieldType::Number => {
            if value.is_number() {
                None
            } else {
                Some(wrong_type)
            }
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = GraphError;

    /// Parse a current kind name. Legacy aliases are handled by [`crate::migration`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GraphError::UnknownNodeKind(s.to_string()))
    }
}
