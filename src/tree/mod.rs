use std::fmt::Display;

use anyhow::bail;

use crate::errors::PhyloError;
use crate::Result;

mod tree_builder;
mod tree_node;
pub use tree_builder::*;
pub use tree_node::*;

use NodeIdx::{Internal as Int, Leaf};

/// Index of a node in the tree's node arena, tagged with the node kind.
#[derive(Debug, PartialEq, Clone, Copy, PartialOrd, Eq, Ord, Hash)]
pub enum NodeIdx {
    Internal(usize),
    Leaf(usize),
}

impl Display for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Int(idx) => write!(f, "internal node {}", idx),
            Leaf(idx) => write!(f, "leaf node {}", idx),
        }
    }
}

impl From<NodeIdx> for usize {
    fn from(node_idx: NodeIdx) -> usize {
        match node_idx {
            Int(idx) => idx,
            Leaf(idx) => idx,
        }
    }
}

impl From<&NodeIdx> for usize {
    fn from(node_idx: &NodeIdx) -> usize {
        usize::from(*node_idx)
    }
}

/// Rooted tree stored as an arena of nodes.
///
/// Internal nodes may have any number of children greater than one, an unrooted tree is a root
/// with three children. Traversal orders are computed once when the tree is built and stay
/// valid because the topology never changes, only branch lengths do.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub root: NodeIdx,
    pub(crate) nodes: Vec<Node>,
    postorder: Vec<NodeIdx>,
    preorder: Vec<NodeIdx>,
    leaf_ids: Vec<String>,
}

impl Tree {
    pub(crate) fn from_nodes(nodes: Vec<Node>, root: NodeIdx) -> Self {
        let mut tree = Tree {
            root,
            nodes,
            postorder: Vec::new(),
            preorder: Vec::new(),
            leaf_ids: Vec::new(),
        };
        tree.preorder = tree.preorder_subroot(tree.root);
        tree.postorder = tree.postorder_subroot(tree.root);
        tree.leaf_ids = tree
            .preorder
            .iter()
            .filter(|idx| matches!(idx, Leaf(_)))
            .map(|idx| tree.nodes[usize::from(idx)].id.clone())
            .collect();
        tree
    }

    /// Two leaves joined at the root, the whole distance on the first leaf's branch.
    pub fn pair(id_a: &str, id_b: &str, distance: f64) -> Result<Self> {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf(id_a, distance);
        let b = builder.leaf(id_b, 0.0);
        let root = builder.internal(&[a, b], 0.0)?;
        builder.build(root)
    }

    /// All leaves joined directly at the root.
    pub fn star(leaves: &[(&str, f64)]) -> Result<Self> {
        let mut builder = TreeBuilder::new();
        let children = leaves
            .iter()
            .map(|(id, blen)| builder.leaf(id, *blen))
            .collect::<Vec<_>>();
        let root = builder.internal(&children, 0.0)?;
        builder.build(root)
    }

    /// Caterpillar tree: the first two leaves form a cherry and every further leaf joins the
    /// subtree built so far through an internal branch of length `internal_blen`.
    pub fn ladder(leaves: &[(&str, f64)], internal_blen: f64) -> Result<Self> {
        if leaves.len() < 2 {
            bail!(PhyloError::InvalidInput(format!(
                "A ladder tree needs at least two leaves, got {}",
                leaves.len()
            )));
        }
        let mut builder = TreeBuilder::new();
        let first = builder.leaf(leaves[0].0, leaves[0].1);
        let second = builder.leaf(leaves[1].0, leaves[1].1);
        let last_blen = |i: usize| if i + 1 == leaves.len() { 0.0 } else { internal_blen };
        let mut subroot = builder.internal(&[first, second], last_blen(1))?;
        for (i, (id, blen)) in leaves.iter().enumerate().skip(2) {
            let leaf = builder.leaf(id, *blen);
            subroot = builder.internal(&[subroot, leaf], last_blen(i))?;
        }
        builder.build(subroot)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of leaves.
    pub fn n(&self) -> usize {
        self.leaf_ids.len()
    }

    pub fn node(&self, idx: &NodeIdx) -> &Node {
        &self.nodes[usize::from(idx)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn postorder(&self) -> &[NodeIdx] {
        &self.postorder
    }

    pub fn preorder(&self) -> &[NodeIdx] {
        &self.preorder
    }

    pub fn leaves(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.is_leaf()).collect()
    }

    pub fn internals(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| !node.is_leaf()).collect()
    }

    /// Leaf ids in preorder.
    pub fn leaf_ids(&self) -> &[String] {
        &self.leaf_ids
    }

    pub fn idx(&self, id: &str) -> Result<NodeIdx> {
        match self.nodes.iter().find(|node| node.id == id) {
            Some(node) => Ok(node.idx),
            None => bail!(PhyloError::InvalidInput(format!(
                "No node with id {} in the tree",
                id
            ))),
        }
    }

    pub fn node_id(&self, idx: &NodeIdx) -> &str {
        &self.node(idx).id
    }

    pub fn children(&self, idx: &NodeIdx) -> &[NodeIdx] {
        &self.node(idx).children
    }

    pub fn parent(&self, idx: &NodeIdx) -> Option<&NodeIdx> {
        self.node(idx).parent.as_ref()
    }

    pub fn blen(&self, idx: &NodeIdx) -> f64 {
        self.node(idx).blen
    }

    pub fn set_blen(&mut self, idx: &NodeIdx, blen: f64) -> Result<()> {
        check_blen(blen)?;
        self.nodes[usize::from(idx)].blen = blen;
        Ok(())
    }

    /// Nodes that own a branch, every node except the root, in arena order.
    pub fn branches(&self) -> Vec<NodeIdx> {
        self.nodes
            .iter()
            .map(|node| node.idx)
            .filter(|idx| *idx != self.root)
            .collect()
    }

    /// Branch lengths in the order of `branches`.
    pub fn branch_lengths(&self) -> Vec<f64> {
        self.branches().iter().map(|idx| self.blen(idx)).collect()
    }

    pub fn set_branch_lengths(&mut self, lengths: &[f64]) -> Result<()> {
        let branches = self.branches();
        if lengths.len() != branches.len() {
            bail!(PhyloError::InvalidParameter(format!(
                "Expected {} branch lengths, got {}",
                branches.len(),
                lengths.len()
            )));
        }
        for &blen in lengths {
            check_blen(blen)?;
        }
        for (idx, &blen) in branches.iter().zip(lengths) {
            self.nodes[usize::from(idx)].blen = blen;
        }
        Ok(())
    }

    /// Sum of all branch lengths.
    pub fn length(&self) -> f64 {
        self.branch_lengths().iter().sum()
    }

    pub fn preorder_subroot(&self, subroot_idx: NodeIdx) -> Vec<NodeIdx> {
        let mut order = Vec::<NodeIdx>::with_capacity(self.nodes.len());
        let mut stack = vec![subroot_idx];
        while let Some(cur_root) = stack.pop() {
            order.push(cur_root);
            for child in self.children(&cur_root).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    pub fn postorder_subroot(&self, subroot_idx: NodeIdx) -> Vec<NodeIdx> {
        let mut order = Vec::<NodeIdx>::with_capacity(self.nodes.len());
        let mut stack = vec![subroot_idx];
        while let Some(cur_root) = stack.pop() {
            order.push(cur_root);
            stack.extend(self.children(&cur_root).iter());
        }
        order.reverse();
        order
    }

    /// Newick representation with branch lengths, leaf ids only.
    pub fn to_newick(&self) -> String {
        format!("{};", self.subtree_to_newick(&self.root))
    }

    fn subtree_to_newick(&self, idx: &NodeIdx) -> String {
        let node = self.node(idx);
        let label = if node.is_leaf() {
            node.id.clone()
        } else {
            let children = node
                .children
                .iter()
                .map(|child| self.subtree_to_newick(child))
                .collect::<Vec<_>>();
            format!("({})", children.join(","))
        };
        if *idx == self.root {
            label
        } else {
            format!("{}:{}", label, node.blen)
        }
    }
}

pub(crate) fn check_blen(blen: f64) -> Result<()> {
    if !blen.is_finite() || blen < 0.0 {
        bail!(PhyloError::InvalidParameter(format!(
            "Branch length must be a non-negative number, got {}",
            blen
        )));
    }
    Ok(())
}
