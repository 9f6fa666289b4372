use std::fmt;
use std::mem;

/// Edge between two nodes of a constituency tree.
///
/// Edges carry the grammatical function label of the child they point to,
/// e.g. `"HD"` or `"NK"` in NeGra/TIGER annotation. Unlabeled edges are
/// written as `"--"` by the treebank formats.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Edge {
    label: Option<String>,
}

impl Edge {
    /// Create a new edge with the given label.
    pub fn new<S>(label: Option<S>) -> Self
    where
        S: Into<String>,
    {
        Edge {
            label: label.map(Into::into),
        }
    }

    /// Get the edge label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_ref().map(String::as_str)
    }

    /// Set the edge label, returning the old value.
    pub fn set_label<S>(&mut self, new_label: Option<S>) -> Option<String>
    where
        S: Into<String>,
    {
        mem::replace(&mut self.label, new_label.map(Into::into))
    }
}

impl From<Option<&str>> for Edge {
    fn from(label: Option<&str>) -> Self {
        Edge::new(label)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}", label),
            None => write!(f, "--"),
        }
    }
}
