//! Tree transformations.
//!
//! Transformations rewrite a whole tree in place. Some have prerequisites
//! on previously applied transformations; applying them out of order fails
//! with a `TreeError` instead of producing a half-rewritten tree.

use std::collections::HashSet;

use failure::Error;
use petgraph::prelude::NodeIndex;

use crate::util::LabelSet;
use crate::{Edge, Node, NonTerminal, Tree, TreeError};

/// The transformations that turn a tree with crossing branches into a
/// continuous tree with explicit markers: root attachment, head marking,
/// block splitting, raising. Applied in that order they trade
/// discontinuity for flattened attachment while preserving the terminal
/// sequence (Boyd 2007).
pub trait Canonicalize {
    /// Reattach recoverable children of the virtual root.
    ///
    /// Moves each child of the root to the least common ancestor of the
    /// terminal neighbors of its span, where the span is first extended
    /// over terminal-adjacent right siblings (skipping siblings nested
    /// inside the current span). Children at the start or end of the
    /// sentence, and children whose attachment point would be the root
    /// itself, stay under the root.
    ///
    /// Prerequisite: none.
    fn root_attach(&mut self) -> Result<(), Error>;

    /// Mark the head child of each node using the NeGra/TIGER heuristic.
    ///
    /// The leftmost child with edge label `HD` is marked; otherwise the
    /// rightmost child with edge label `NK`; otherwise the leftmost child.
    /// Every other child is explicitly marked non-head.
    ///
    /// Prerequisite: none.
    fn negra_mark_heads(&mut self) -> Result<(), Error>;

    /// Split discontinuous nodes into one node per continuous block.
    ///
    /// Bottom-up, each node whose children cover more than one continuous
    /// block of terminals is replaced by one shallow copy per block,
    /// attached at the original's parent. Exactly one of the copies is
    /// marked as covering the head block, determined recursively through
    /// nested splits.
    ///
    /// Prerequisites: `root_attach` and `negra_mark_heads`. Fails with
    /// `TreeError::HeadsNotMarked` if heads are missing and with
    /// `TreeError::CrossingRoot` if a split would reach the root.
    fn boyd_split(&mut self) -> Result<(), Error>;

    /// Remove the crossing branches introduced by `boyd_split`.
    ///
    /// Every split node that does not cover the head block is removed and
    /// its children are promoted to its parent. Terminals and their
    /// positions are unaffected.
    ///
    /// Prerequisite: `boyd_split`; fails with `TreeError::NotSplit`
    /// otherwise.
    fn raising(&mut self) -> Result<(), Error>;
}

impl Canonicalize for Tree {
    fn root_attach(&mut self) -> Result<(), Error> {
        let terms = self.terminals()?;
        let tree_min = self[terms[0]].terminal().unwrap().num();
        let tree_max = self[*terms.last().unwrap()].terminal().unwrap().num();
        let root = self.root();
        for child in self.ordered_children(root)? {
            let t_l = self.first_terminal_num(child)? - 1;
            let mut t_r = self.last_terminal_num(child)? + 1;
            // extend the span over adjacent right siblings; a sibling
            // starting left of the current end is nested and skipped
            let mut focus = child;
            let mut sibling = self.right_sibling(focus)?;
            while let Some(sib) = sibling {
                let focus_max = self.last_terminal_num(focus)?;
                let sib_min = self.first_terminal_num(sib)?;
                if sib_min < focus_max {
                    sibling = self.right_sibling(sib)?;
                    continue;
                }
                if sib_min > focus_max + 1 {
                    break;
                }
                t_r = self.last_terminal_num(sib)? + 1;
                focus = sib;
                sibling = self.right_sibling(sib)?;
            }
            if t_l < tree_min || t_r > tree_max {
                continue;
            }
            let target = match self.lca(terms[t_l - 1], terms[t_r - 1]) {
                Some(target) => target,
                None => continue,
            };
            if target == root {
                continue;
            }
            let (_, edge_id) = self.parent(child).unwrap();
            let weight = self.graph_mut().remove_edge(edge_id).unwrap();
            self.graph_mut().add_edge(target, child, weight);
        }
        Ok(())
    }

    fn negra_mark_heads(&mut self) -> Result<(), Error> {
        let root = self.root();
        self[root].marks_mut().head = Some(false);
        for node in self.preorder(root)? {
            let children = self.ordered_children(node)?;
            if children.is_empty() {
                continue;
            }
            let edges = children
                .iter()
                .map(|&child| self.incoming_edge_label(child))
                .collect::<Vec<_>>();
            let mut index = 0;
            if let Some(pos) = edges.iter().position(|e| e.as_deref() == Some("HD")) {
                index = pos;
            } else if let Some(pos) = edges.iter().rposition(|e| e.as_deref() == Some("NK")) {
                index = pos;
            }
            for (i, &child) in children.iter().enumerate() {
                self[child].marks_mut().head = Some(i == index);
            }
        }
        Ok(())
    }

    fn boyd_split(&mut self) -> Result<(), Error> {
        let root = self.root();
        // bottom-up: lower trees have to be continuified first
        for node in self.postorder(root)? {
            {
                let marks = self[node].marks_mut();
                marks.split = Some(false);
                marks.head_block = Some(true);
            }
            let children = self.ordered_children(node)?;
            if children.is_empty() {
                continue;
            }
            // partition the children into runs with contiguous coverage
            let mut blocks: Vec<Vec<NodeIndex>> = Vec::new();
            for child in children {
                let start_new = match blocks.last().and_then(|block| block.last()) {
                    Some(&last) => {
                        self.first_terminal_num(child)? > self.last_terminal_num(last)? + 1
                    }
                    None => true,
                };
                if start_new {
                    blocks.push(Vec::new());
                }
                blocks.last_mut().unwrap().push(child);
            }
            if blocks.len() <= 1 {
                continue;
            }
            let (parent, parent_edge) = match self.parent(node) {
                Some(pair) => pair,
                None => return Err(TreeError::CrossingRoot.into()),
            };
            let head = self[node].marks().head.ok_or(TreeError::HeadsNotMarked)?;
            let edge_label = self[parent_edge].label().map(ToOwned::to_owned);
            let template = self[node].clone();
            for (block_idx, block) in blocks.into_iter().enumerate() {
                let mut copy = template.clone();
                {
                    let marks = copy.marks_mut();
                    marks.split = Some(true);
                    marks.head = Some(head);
                    marks.head_block = Some(false);
                    marks.block_number = Some(block_idx + 1);
                }
                let new_idx = self.graph_mut().add_node(copy);
                self.graph_mut()
                    .add_edge(parent, new_idx, Edge::new(edge_label.clone()));
                let mut head_block = false;
                for child in block {
                    // the block containing the head daughter is the head
                    // block; a split child counts only if it covers the
                    // head block itself
                    let child_head = self[child].marks().head.ok_or(TreeError::HeadsNotMarked)?;
                    let child_split = self[child].marks().split.unwrap_or(false);
                    let child_head_block = self[child].marks().head_block.unwrap_or(false);
                    head_block = head_block || child_head && (!child_split || child_head_block);
                    let (_, edge_id) = self.parent(child).unwrap();
                    let weight = self.graph_mut().remove_edge(edge_id).unwrap();
                    self.graph_mut().add_edge(new_idx, child, weight);
                }
                self[new_idx].marks_mut().head_block = Some(head_block);
            }
            self.graph_mut().remove_node(node);
        }
        Ok(())
    }

    fn raising(&mut self) -> Result<(), Error> {
        let root = self.root();
        let mut removal = Vec::new();
        for node in self.preorder(root)? {
            if node == root {
                continue;
            }
            let marks = self[node].marks();
            let split = marks.split.ok_or(TreeError::NotSplit)?;
            if split && !marks.head_block.unwrap_or(false) {
                removal.push(node);
            }
        }
        for node in removal {
            let (parent, _) = self.parent(node).unwrap();
            for child in self.ordered_children(node)? {
                let (_, edge_id) = self.parent(child).unwrap();
                let weight = self.graph_mut().remove_edge(edge_id).unwrap();
                self.graph_mut().add_edge(parent, child, weight);
            }
            self.graph_mut().remove_node(node);
        }
        Ok(())
    }
}

/// General structure modifications.
pub trait TreeOps {
    /// Add a `TOP` node so that there is a unary edge on top of the tree.
    fn add_top_node(&mut self) -> Result<(), Error>;
}

impl TreeOps for Tree {
    fn add_top_node(&mut self) -> Result<(), Error> {
        let old_root = self.root();
        let top = self
            .graph_mut()
            .add_node(Node::NonTerminal(NonTerminal::new("TOP")));
        self.graph_mut().add_edge(top, old_root, Edge::default());
        self.set_root(top);
        Ok(())
    }
}

/// Reattachment and deletion of punctuation.
pub trait PunctuationOps {
    /// Delete punctuation terminals.
    ///
    /// Returns the removed terminals as `(num, form, pos)` triples with
    /// their positions before deletion. A tree consisting only of
    /// punctuation is left untouched.
    fn punctuation_delete(
        &mut self,
        punct: &LabelSet,
    ) -> Result<Vec<(usize, String, String)>, Error>;

    /// Move punctuation to the parent of its left terminal neighbor.
    ///
    /// Phrases with nothing but punctuation below them are left untouched.
    /// Prerequisite: a previous application of `root_attach`.
    fn punctuation_lower(&mut self, punct: &LabelSet) -> Result<(), Error>;

    /// Attach punctuation (by part-of-speech tag) to the root node.
    fn punctuation_root(&mut self, punct: &LabelSet) -> Result<(), Error>;
}

impl PunctuationOps for Tree {
    fn punctuation_delete(
        &mut self,
        punct: &LabelSet,
    ) -> Result<Vec<(usize, String, String)>, Error> {
        let terminals = self.terminals()?;
        let removal = terminals
            .iter()
            .copied()
            .filter(|&idx| punct.matches(self[idx].terminal().unwrap().form()))
            .collect::<Vec<_>>();
        if removal.len() == terminals.len() {
            return Ok(Vec::new());
        }
        let mut removed = Vec::new();
        for &idx in &removal {
            let terminal = self[idx].terminal().unwrap();
            removed.push((
                terminal.num(),
                terminal.form().to_owned(),
                terminal.label().to_owned(),
            ));
        }
        for idx in removal {
            self.delete_terminal(idx)?;
        }
        Ok(removed)
    }

    fn punctuation_lower(&mut self, punct: &LabelSet) -> Result<(), Error> {
        let terminals = self.terminals()?;
        for (i, &element) in terminals.iter().enumerate() {
            if i == 0 || !punct.matches(self[element].terminal().unwrap().form()) {
                continue;
            }
            let (parent, edge_id) = self.parent(element).unwrap();
            let only_punct = self.children(parent).all(|child| {
                self[child]
                    .terminal()
                    .map(|t| punct.matches(t.form()))
                    .unwrap_or(false)
            });
            if only_punct {
                continue;
            }
            let (target, _) = self.parent(terminals[i - 1]).unwrap();
            if target != parent {
                let weight = self.graph_mut().remove_edge(edge_id).unwrap();
                self.graph_mut().add_edge(target, element, weight);
            }
        }
        Ok(())
    }

    fn punctuation_root(&mut self, punct: &LabelSet) -> Result<(), Error> {
        let root = self.root();
        let candidates = self
            .terminals()?
            .into_iter()
            .filter(|&idx| punct.matches(self[idx].label()))
            .filter(|&idx| {
                self.parent(idx)
                    .map(|(parent, _)| parent != root && self.children(parent).count() > 1)
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        for idx in candidates {
            let (_, edge_id) = self.parent(idx).unwrap();
            let weight = self.graph_mut().remove_edge(edge_id).unwrap();
            self.graph_mut().add_edge(root, idx, weight);
        }
        Ok(())
    }
}

/// The stock punctuation set: common punctuation forms and the NeGra
/// punctuation part-of-speech tags.
pub fn default_punctuation() -> LabelSet {
    let symbols = [
        ".", ",", ";", ":", "!", "?", "-", "--", "/", "(", ")", "[", "]", "{", "}", "\"", "'", "`",
        "``", "''", "$.", "$,", "$(", "$*LB*",
    ];
    LabelSet::Positive(symbols.iter().map(|s| (*s).to_owned()).collect::<HashSet<_>>())
}

#[cfg(test)]
mod tests {
    use super::{default_punctuation, Canonicalize, PunctuationOps, TreeOps};
    use crate::analyze::gap_degree;
    use crate::testdata::{
        cont_tree, discont_tree, CONT_LABELS_PREORDER, DISCONT_LABELS_BOYD_PREORDER,
        DISCONT_LABELS_PREORDER, WORDS,
    };
    use crate::{Tree, TreeError};

    fn labels(tree: &Tree) -> Vec<String> {
        tree.preorder(tree.root())
            .unwrap()
            .iter()
            .map(|&idx| tree[idx].label().to_owned())
            .collect()
    }

    fn words(tree: &Tree) -> Vec<String> {
        tree.terminals()
            .unwrap()
            .iter()
            .map(|&idx| tree[idx].terminal().unwrap().form().to_owned())
            .collect()
    }

    #[test]
    fn root_attach_sample() {
        let mut tree = discont_tree();
        tree.root_attach().unwrap();
        // both root children touch a sentence boundary, nothing moves
        assert_eq!(labels(&tree), DISCONT_LABELS_PREORDER);
        assert_eq!(words(&tree), WORDS);
    }

    #[test]
    fn split_requires_heads() {
        let mut tree = discont_tree();
        tree.root_attach().unwrap();
        let err = tree.boyd_split().unwrap_err();
        assert_eq!(
            err.downcast_ref::<TreeError>(),
            Some(&TreeError::HeadsNotMarked)
        );
    }

    #[test]
    fn head_uniqueness() {
        let mut tree = discont_tree();
        tree.root_attach().unwrap();
        tree.negra_mark_heads().unwrap();
        for node in tree.preorder(tree.root()).unwrap() {
            let children = tree.ordered_children(node).unwrap();
            if children.is_empty() {
                continue;
            }
            let heads = children
                .iter()
                .filter(|&&child| tree[child].marks().head == Some(true))
                .count();
            assert_eq!(heads, 1, "{} heads below {}", heads, tree[node].label());
        }
        // the head of S is "did", the leftmost HD child
        let s = tree.ordered_children(tree.root()).unwrap()[0];
        let s_children = tree.ordered_children(s).unwrap();
        let head = s_children
            .iter()
            .find(|&&child| tree[child].marks().head == Some(true))
            .unwrap();
        assert_eq!(tree[*head].terminal().unwrap().form(), "did");
    }

    #[test]
    fn boyd_split_sample() {
        let mut tree = discont_tree();
        tree.root_attach().unwrap();
        tree.negra_mark_heads().unwrap();
        tree.boyd_split().unwrap();
        assert_eq!(labels(&tree), DISCONT_LABELS_BOYD_PREORDER);
        assert_eq!(words(&tree), WORDS);

        let preorder = tree.preorder(tree.root()).unwrap();
        let split = preorder
            .iter()
            .filter(|&&idx| tree[idx].marks().split == Some(true))
            .count();
        let head_blocks = preorder
            .iter()
            .filter(|&&idx| {
                tree[idx].marks().split == Some(true)
                    && tree[idx].marks().head_block == Some(true)
            })
            .count();
        // three nodes were split in two blocks each, one head block per pair
        assert_eq!(split, 6);
        assert_eq!(head_blocks, 3);

        // block numbers below S: first VP block, then the one with the head
        let s = tree.ordered_children(tree.root()).unwrap()[0];
        let vps = tree
            .ordered_children(s)
            .unwrap()
            .into_iter()
            .filter(|&idx| tree[idx].marks().split == Some(true))
            .collect::<Vec<_>>();
        assert_eq!(vps.len(), 2);
        assert_eq!(tree[vps[0]].marks().block_number, Some(1));
        assert_eq!(tree[vps[0]].marks().head_block, Some(false));
        assert_eq!(tree[vps[1]].marks().block_number, Some(2));
        assert_eq!(tree[vps[1]].marks().head_block, Some(true));
    }

    #[test]
    fn raising_requires_split() {
        let mut tree = discont_tree();
        let err = tree.raising().unwrap_err();
        assert_eq!(err.downcast_ref::<TreeError>(), Some(&TreeError::NotSplit));
    }

    #[test]
    fn raising_sample() {
        let mut tree = discont_tree();
        tree.root_attach().unwrap();
        tree.negra_mark_heads().unwrap();
        tree.boyd_split().unwrap();
        tree.raising().unwrap();
        assert_eq!(labels(&tree), CONT_LABELS_PREORDER);
        assert_eq!(words(&tree), WORDS);
        assert_eq!(gap_degree(&tree).unwrap(), 0);
    }

    #[test]
    fn pipeline_continuifies() {
        let mut tree = discont_tree();
        assert_eq!(gap_degree(&tree).unwrap(), 1);
        tree.root_attach().unwrap();
        tree.negra_mark_heads().unwrap();
        tree.boyd_split().unwrap();
        tree.raising().unwrap();
        assert_eq!(gap_degree(&tree).unwrap(), 0);
        assert_eq!(words(&tree), WORDS);
    }

    #[test]
    fn top_node() {
        let mut tree = cont_tree();
        tree.add_top_node().unwrap();
        assert_eq!(tree[tree.root()].label(), "TOP");
        assert_eq!(tree.children(tree.root()).count(), 1);
        assert_eq!(words(&tree), WORDS);
    }

    #[test]
    fn delete_punctuation() {
        let mut tree = discont_tree();
        let removed = tree.punctuation_delete(&default_punctuation()).unwrap();
        assert_eq!(removed, vec![(9, "?".to_owned(), "?".to_owned())]);
        assert_eq!(tree.n_terminals(), 8);
        let nums = tree
            .terminals()
            .unwrap()
            .iter()
            .map(|&idx| tree[idx].terminal().unwrap().num())
            .collect::<Vec<_>>();
        assert_eq!(nums, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn lower_punctuation() {
        let mut tree = cont_tree();
        tree.punctuation_lower(&default_punctuation()).unwrap();
        let last = *tree.terminals().unwrap().last().unwrap();
        assert_eq!(tree[last].terminal().unwrap().form(), "?");
        let (parent, _) = tree.parent(last).unwrap();
        // lowered to the parent of "likes"
        assert_eq!(tree[parent].label(), "VP");
        assert_eq!(words(&tree), WORDS);
    }
}
