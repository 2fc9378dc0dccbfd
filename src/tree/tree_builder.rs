use anyhow::bail;
use log::debug;

use crate::errors::PhyloError;
use crate::tree::{check_blen, Node, NodeIdx, Tree};
use crate::Result;

/// Assembles a tree bottom-up: leaves first, then internal nodes joining existing nodes.
///
/// # Example
/// ```
/// use phyloml::tree::TreeBuilder;
/// let mut builder = TreeBuilder::new();
/// let a = builder.leaf("A", 0.1);
/// let b = builder.leaf("B", 0.2);
/// let c = builder.leaf("C", 0.3);
/// let ab = builder.internal(&[a, b], 0.05).unwrap();
/// let root = builder.internal(&[ab, c], 0.0).unwrap();
/// let tree = builder.build(root).unwrap();
/// assert_eq!(tree.n(), 3);
/// assert_eq!(tree.to_newick(), "((A:0.1,B:0.2):0.05,C:0.3);");
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, id: &str, blen: f64) -> NodeIdx {
        let node = Node::new_leaf(self.nodes.len(), blen, id);
        let idx = node.idx;
        self.nodes.push(node);
        idx
    }

    /// Joins `children` under a new internal node. Each node can be joined only once.
    pub fn internal(&mut self, children: &[NodeIdx], blen: f64) -> Result<NodeIdx> {
        if children.len() < 2 {
            bail!(PhyloError::InvalidInput(format!(
                "Internal nodes need at least two children, got {}",
                children.len()
            )));
        }
        for (i, child) in children.iter().enumerate() {
            let Some(node) = self.nodes.get(usize::from(child)) else {
                bail!(PhyloError::InvalidInput(format!("Unknown {}", child)));
            };
            if node.idx != *child || node.parent.is_some() || children[..i].contains(child) {
                bail!(PhyloError::InvalidInput(format!(
                    "{} already has a parent",
                    child
                )));
            }
        }
        let node = Node::new_internal(self.nodes.len(), children.to_vec(), blen);
        let idx = node.idx;
        for child in children {
            self.nodes[usize::from(child)].add_parent(&idx);
        }
        self.nodes.push(node);
        Ok(idx)
    }

    /// Finishes the tree at `root`, which must be the only node without a parent.
    pub fn build(self, root: NodeIdx) -> Result<Tree> {
        let Some(root_node) = self.nodes.get(usize::from(root)) else {
            bail!(PhyloError::InvalidInput(format!("Unknown root {}", root)));
        };
        if root_node.parent.is_some() {
            bail!(PhyloError::InvalidInput(format!(
                "Root {} has a parent",
                root
            )));
        }
        if let Some(orphan) = self.nodes.iter().find(|n| n.idx != root && n.parent.is_none()) {
            bail!(PhyloError::InvalidInput(format!(
                "{} is not connected to the root",
                orphan
            )));
        }
        let leaves = self.nodes.iter().filter(|n| n.is_leaf()).collect::<Vec<_>>();
        for (i, leaf) in leaves.iter().enumerate() {
            if leaf.id.is_empty() {
                bail!(PhyloError::InvalidInput(format!("{} has no id", leaf.idx)));
            }
            if leaves[..i].iter().any(|other| other.id == leaf.id) {
                bail!(PhyloError::InvalidInput(format!(
                    "Leaf id {} appears more than once",
                    leaf.id
                )));
            }
        }
        for node in self.nodes.iter().filter(|n| n.idx != root) {
            check_blen(node.blen)?;
        }
        debug!(
            "Built tree with {} nodes and {} leaves",
            self.nodes.len(),
            leaves.len()
        );
        Ok(Tree::from_nodes(self.nodes, root))
    }
}
