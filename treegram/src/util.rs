use std::borrow::Borrow;
use std::collections::HashSet;

use petgraph::prelude::{EdgeIndex, NodeIndex};

use crate::Tree;

/// Struct to climb up a `Tree`.
///
/// This struct does not borrow from the tree in order to allow mutation
/// during climbing.
///
/// `Climber` advances to the next node in the tree before returning the
/// previous node. This means that removing a node that was just returned
/// through the `next` method will not invalidate the climber. Through this
/// mechanism, reattachment of the node returned from `next` will not be
/// reflected in the path since the `Climber` already advanced past it. If
/// the updated path is important, the climber should be re-initialized with
/// the previously returned node.
pub struct Climber {
    cur: Option<(NodeIndex, EdgeIndex)>,
}

impl Climber {
    /// Constructs a new `Climber`.
    pub fn new(node: NodeIndex, tree: &Tree) -> Self {
        let cur = tree.parent(node);
        Climber { cur }
    }

    /// Moves up the tree by following the incoming edge.
    ///
    /// This method behaves like an iterator, returning `Some(NodeIndex)`
    /// before reaching the final state. Calling this method again in the
    /// final state will return `None`.
    pub fn next(&mut self, tree: &Tree) -> Option<NodeIndex> {
        if let Some((node, _)) = self.cur {
            self.cur = tree.parent(node);
            Some(node)
        } else {
            None
        }
    }

    /// Like `next`, but also returns the index of the incoming edge.
    pub fn next_with_edge(&mut self, tree: &Tree) -> Option<(NodeIndex, EdgeIndex)> {
        if let Some((node, edge)) = self.cur {
            self.cur = tree.parent(node);
            Some((node, edge))
        } else {
            None
        }
    }
}

/// LabelSet.
#[derive(Clone, Debug)]
pub enum LabelSet {
    /// Variant used for positive matching.
    Positive(HashSet<String>),
    /// Variant used for negative matching.
    Negative(HashSet<String>),
}

impl LabelSet {
    /// Returns whether the query matched the `LabelSet`.
    ///
    /// If `self` is `LabelSet::Positive`, `true` is returned if the query
    /// was found, `false` otherwise. If `self` is `LabelSet::Negative`,
    /// `true` is returned if the query was not found.
    pub fn matches(&self, q: impl Borrow<str>) -> bool {
        match self {
            LabelSet::Positive(ref set) => set.contains(q.borrow()),
            LabelSet::Negative(ref set) => !set.contains(q.borrow()),
        }
    }
}

/// Strip a trailing fan-out number from a label.
///
/// Serialized grammar categories carry their fan-out as a digit suffix,
/// e.g. `"VP2"`. Returns the label without the suffix.
pub fn label_strip_fanout(label: &str) -> &str {
    label.trim_end_matches(|c: char| c.is_ascii_digit())
}
