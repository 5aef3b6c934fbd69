//! Colors, icons and labels for each node kind.

use callflow_graph::migration::normalize_kind;
use callflow_graph::{NodeCategory, NodeKind};
use serde::Serialize;
use std::borrow::Cow;

/// Color for any node whose kind has no style of its own
pub const FALLBACK_COLOR: &str = "#6366f1";

/// Icon for any node whose kind has no style of its own
pub const FALLBACK_ICON: &str = "Circle";

/// How a node is drawn on the canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    /// CSS hex color
    pub color: &'static str,
    /// Icon name from the canvas icon set
    pub icon: &'static str,
    /// Kind label shown in the node header
    pub label: Cow<'static, str>,
}

/// Style of a known kind
pub fn style_for(kind: NodeKind) -> NodeStyle {
    let (color, icon) = match kind {
        NodeKind::StartOutbound => ("#22c55e", "PhoneOutgoing"),
        NodeKind::StartInbound => ("#10b981", "PhoneIncoming"),
        NodeKind::Greeting => ("#6366f1", "MessageCircle"),
        NodeKind::Speak => ("#8b5cf6", "Volume2"),
        NodeKind::Listen => ("#06b6d4", "Mic"),
        NodeKind::LlmResponse => ("#6366f1", "Brain"),
        NodeKind::BranchIntent => ("#f59e0b", "GitBranch"),
        NodeKind::BranchKeyword => ("#f59e0b", "Search"),
        NodeKind::BranchSentiment => ("#f97316", "Heart"),
        NodeKind::SetVariable => ("#ec4899", "Tag"),
        NodeKind::Webhook => ("#f97316", "Globe"),
        NodeKind::Transfer => ("#3b82f6", "PhoneForwarded"),
        NodeKind::Wait => ("#a855f7", "Clock"),
        NodeKind::EndCall => ("#ef4444", "PhoneOff"),
    };
    NodeStyle {
        color,
        icon,
        label: Cow::Borrowed(kind.display_name()),
    }
}

/// Style for a stored kind name.
///
/// Retired names resolve to their current kind. Anything else gets the
/// fallback style labelled with the raw name.
pub fn style_for_name(name: &str) -> NodeStyle {
    match normalize_kind(name) {
        Ok(kind) => style_for(kind),
        Err(_) => NodeStyle {
            color: FALLBACK_COLOR,
            icon: FALLBACK_ICON,
            label: Cow::Owned(name.to_string()),
        },
    }
}

/// One draggable entry in the node palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    pub kind: NodeKind,
    #[serde(flatten)]
    pub style: NodeStyle,
}

/// Palette entries sharing a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaletteGroup {
    pub category: NodeCategory,
    pub entries: Vec<PaletteEntry>,
}

/// Every kind, grouped by category, in taxonomy order
pub fn palette() -> Vec<PaletteGroup> {
    let mut groups: Vec<PaletteGroup> = Vec::new();
    for kind in NodeKind::ALL {
        let entry = PaletteEntry {
            kind,
            style: style_for(kind),
        };
        match groups.last_mut() {
            Some(group) if group.category == kind.category() => group.entries.push(entry),
            _ => groups.push(PaletteGroup {
                category: kind.category(),
                entries: vec![entry],
            }),
        }
    }
    groups
}
