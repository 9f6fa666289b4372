//! Analysis of tree properties, mainly around discontinuity.

use std::collections::BTreeMap;

use failure::Error;
use petgraph::prelude::NodeIndex;

use crate::Tree;

/// Compute the gap degree of a single node.
///
/// The gap degree is the number of jumps greater than one between the
/// consecutive sentence positions dominated by the node; continuous nodes
/// have gap degree 0. Terminals have gap degree 0.
pub fn gap_degree_node(tree: &Tree, node: NodeIndex) -> Result<usize, Error> {
    if tree[node].is_terminal() {
        return Ok(0);
    }
    let terminals = tree.terminals_below(node)?;
    let mut gaps = 0;
    for pair in terminals.windows(2) {
        let left = tree[pair[0]].terminal().unwrap().num();
        let right = tree[pair[1]].terminal().unwrap().num();
        if left + 1 < right {
            gaps += 1;
        }
    }
    Ok(gaps)
}

/// Compute the maximal gap degree of any node of the given tree.
pub fn gap_degree(tree: &Tree) -> Result<usize, Error> {
    let mut result = 0;
    for node in tree.preorder(tree.root())? {
        result = result.max(gap_degree_node(tree, node)?);
    }
    Ok(result)
}

/// Return true iff the tree contains at least one discontinuous node.
pub fn is_discontinuous(tree: &Tree) -> Result<bool, Error> {
    Ok(gap_degree(tree)? > 0)
}

/// Accumulates gap degree statistics over several trees.
#[derive(Debug, Default)]
pub struct GapDegree {
    /// Gap degree histogram over nonterminal nodes.
    pub per_node: BTreeMap<usize, usize>,
    /// Histogram of the maximal node gap degree per tree.
    pub per_tree: BTreeMap<usize, usize>,
}

impl GapDegree {
    pub fn new() -> Self {
        GapDegree::default()
    }

    /// Record the gap degrees of all nonterminal nodes of one tree.
    pub fn run(&mut self, tree: &Tree) -> Result<(), Error> {
        let mut tree_deg = 0;
        for node in tree.preorder(tree.root())? {
            if tree[node].is_terminal() {
                continue;
            }
            let node_deg = gap_degree_node(tree, node)?;
            *self.per_node.entry(node_deg).or_insert(0) += 1;
            tree_deg = tree_deg.max(node_deg);
        }
        *self.per_tree.entry(tree_deg).or_insert(0) += 1;
        Ok(())
    }

    /// Render the collected histograms.
    pub fn summary(&self) -> String {
        let tree_cnt = self.per_tree.values().sum::<usize>();
        let node_cnt = self.per_node.values().sum::<usize>();
        let mut out = format!("{} trees, {} nodes\n", tree_cnt, node_cnt);
        out.push_str("per tree:\n");
        for (deg, cnt) in &self.per_tree {
            out.push_str(&format!("  gap degree {}: {}\n", deg, cnt));
        }
        out.push_str("per node:\n");
        for (deg, cnt) in &self.per_node {
            out.push_str(&format!("  gap degree {}: {}\n", deg, cnt));
        }
        out
    }
}

/// Accumulates part-of-speech tag counts over several trees.
#[derive(Debug, Default)]
pub struct PosTags {
    pub tags: BTreeMap<String, usize>,
}

impl PosTags {
    pub fn new() -> Self {
        PosTags::default()
    }

    /// Count the preterminal labels of one tree.
    pub fn run(&mut self, tree: &Tree) -> Result<(), Error> {
        for terminal in tree.terminals()? {
            *self
                .tags
                .entry(tree[terminal].label().to_owned())
                .or_insert(0) += 1;
        }
        Ok(())
    }

    /// Render the collected counts.
    pub fn summary(&self) -> String {
        let mut out = format!("{} different tags\n", self.tags.len());
        for (tag, cnt) in &self.tags {
            out.push_str(&format!("  {} {}\n", tag, cnt));
        }
        out
    }
}
