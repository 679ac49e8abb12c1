//! Dependency edges between work items.

use super::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why one item depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// The target consumes data produced by the source.
    #[default]
    Data,
    /// The target relies on state left behind by the source.
    State,
    /// The target needs a service the source brings up.
    Service,
    /// The target reads a file the source writes.
    File,
    /// Both items touch the same resource.
    Resource,
    /// Inferred by the analyzer from shared state or exclusive resources.
    Implicit,
}

impl DependencyKind {
    /// Stable name for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::State => "state",
            Self::Service => "service",
            Self::File => "file",
            Self::Resource => "resource",
            Self::Implicit => "implicit",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed dependency: `to` may start once `from` has finished.
///
/// For a required edge `from` must also have passed; when it did not, `to`
/// is skipped. An optional edge only orders the two items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The prerequisite item.
    pub from: ItemId,
    /// The dependent item.
    pub to: ItemId,
    /// Dependency kind.
    #[serde(default)]
    pub kind: DependencyKind,
    /// Whether failure of `from` still lets `to` run.
    #[serde(default)]
    pub optional: bool,
}

impl DependencyEdge {
    /// Create a required data dependency.
    pub fn new(from: impl Into<ItemId>, to: impl Into<ItemId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: DependencyKind::Data,
            optional: false,
        }
    }

    /// Create an inferred ordering edge.
    pub fn implicit(from: impl Into<ItemId>, to: impl Into<ItemId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: DependencyKind::Implicit,
            optional: true,
        }
    }

    /// Set the dependency kind.
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the edge as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the analyzer inferred this edge.
    pub fn is_implicit(&self) -> bool {
        self.kind == DependencyKind::Implicit
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.kind, self.to)?;
        if self.optional {
            f.write_str(" (optional)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_edges_only_order() {
        let edge = DependencyEdge::implicit("x", "y");
        assert!(edge.is_implicit());
        assert!(edge.optional);
    }

    #[test]
    fn display() {
        let edge = DependencyEdge::new("a", "b")
            .with_kind(DependencyKind::Service)
            .optional();
        assert_eq!(edge.to_string(), "a -[service]-> b (optional)");
    }

    #[test]
    fn yaml_defaults() {
        let edge: DependencyEdge = serde_yaml::from_str("from: a\nto: b\n").unwrap();
        assert_eq!(edge.kind, DependencyKind::Data);
        assert!(!edge.optional);
    }
}
