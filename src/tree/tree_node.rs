use std::fmt::{Debug, Display};

use approx::relative_eq;

use crate::tree::NodeIdx::{self, Internal as Int, Leaf};

/// Tree node. The branch length belongs to the edge towards the parent.
#[derive(Clone)]
pub struct Node {
    pub idx: NodeIdx,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
    pub blen: f64,
    pub id: String,
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id.is_empty() {
            write!(f, "{}", self.idx)
        } else {
            write!(f, "{} with id {}", self.idx, self.id)
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id.is_empty() {
            writeln!(
                f,
                "{:?}:{}, parent: {:?}, children: {:?}",
                self.idx, self.blen, self.parent, self.children,
            )
        } else {
            writeln!(
                f,
                "({}) {:?}:{}, parent: {:?}, children: {:?}",
                self.id, self.idx, self.blen, self.parent, self.children,
            )
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        (self.idx == other.idx)
            && (self.parent == other.parent)
            && (self.children == other.children)
            && (self.id == other.id)
            && relative_eq!(self.blen, other.blen)
    }
}

impl Node {
    pub(crate) fn new_leaf(idx: usize, blen: f64, id: &str) -> Self {
        Self {
            idx: Leaf(idx),
            parent: None,
            children: Vec::new(),
            blen,
            id: id.to_string(),
        }
    }

    pub(crate) fn new_internal(idx: usize, children: Vec<NodeIdx>, blen: f64) -> Self {
        Self {
            idx: Int(idx),
            parent: None,
            children,
            blen,
            id: String::new(),
        }
    }

    pub(crate) fn add_parent(&mut self, parent_idx: &NodeIdx) {
        debug_assert!(matches!(parent_idx, Int(_)));
        self.parent = Some(*parent_idx);
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.idx, Leaf(_))
    }
}
