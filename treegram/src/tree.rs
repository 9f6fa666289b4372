use std::ops::{Index, IndexMut};

use failure::Error;
use petgraph::prelude::{Direction, EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;

use crate::util::Climber;
use crate::{Edge, Node, Terminal, TreeError};

/// `Tree`
///
/// `Tree`s represent constituency trees and consist of `Node`s. The nodes
/// are either `Terminal`s or `NonTerminal`s, relations between nodes are
/// expressed as `Edge`s.
///
/// Terminals carry 1-based sentence positions (`num`) which are unique and
/// consecutive. All ordered accessors sort by the smallest position a node
/// dominates; a node is *discontinuous* if the positions below it are not
/// consecutive.
#[derive(Clone, Debug)]
pub struct Tree {
    graph: StableGraph<Node, Edge>,
    n_terminals: usize,
    root: NodeIndex,
    sid: usize,
}

impl Tree {
    pub(crate) fn new(
        graph: StableGraph<Node, Edge>,
        n_terminals: usize,
        root: NodeIndex,
        sid: usize,
    ) -> Self {
        Tree {
            graph,
            n_terminals,
            root,
            sid,
        }
    }

    /// Get the number of terminals in the tree.
    pub fn n_terminals(&self) -> usize {
        self.n_terminals
    }

    /// Get the index of the root of the tree.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeIndex) {
        self.root = root;
    }

    /// Get the sentence id of the tree.
    pub fn sid(&self) -> usize {
        self.sid
    }

    /// Set the sentence id of the tree.
    pub fn set_sid(&mut self, sid: usize) {
        self.sid = sid;
    }

    /// Get the parent and corresponding edge of a tree node.
    ///
    /// * Returns `NodeIndex` of the immediately dominating node and the
    ///   corresponding `EdgeIndex`.
    /// * Returns `None` if `node` doesn't exist or has no incoming edge.
    pub fn parent(&self, node: NodeIndex) -> Option<(NodeIndex, EdgeIndex)> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge_ref| (edge_ref.source(), edge_ref.id()))
    }

    /// Get an iterator over `node`'s children in unspecified order.
    pub fn children<'a>(&'a self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + 'a {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge_ref| edge_ref.target())
    }

    /// Get `node`'s children ordered by the leftmost terminal they dominate.
    ///
    /// Fails if a child dominates no terminal.
    pub fn ordered_children(&self, node: NodeIndex) -> Result<Vec<NodeIndex>, Error> {
        let mut keyed = Vec::new();
        for child in self.children(node) {
            keyed.push((self.first_terminal_num(child)?, child));
        }
        keyed.sort_by_key(|&(num, _)| num);
        Ok(keyed.into_iter().map(|(_, child)| child).collect())
    }

    /// Get the label of the edge leading into `node`, if any.
    pub fn incoming_edge_label(&self, node: NodeIndex) -> Option<String> {
        self.parent(node)
            .and_then(|(_, edge)| self.graph[edge].label().map(ToOwned::to_owned))
    }

    /// Get all terminals of the tree, ordered by sentence position.
    pub fn terminals(&self) -> Result<Vec<NodeIndex>, Error> {
        self.terminals_below(self.root)
    }

    /// Get the terminals below `node`, ordered by sentence position.
    ///
    /// Fails if the subtree contains a nonterminal without children.
    pub fn terminals_below(&self, node: NodeIndex) -> Result<Vec<NodeIndex>, Error> {
        let mut terminals = Vec::new();
        let mut stack = vec![node];
        while let Some(cursor) = stack.pop() {
            match &self.graph[cursor] {
                Node::Terminal(_) => terminals.push(cursor),
                Node::NonTerminal(nt) => {
                    let before = stack.len();
                    stack.extend(self.children(cursor));
                    if stack.len() == before {
                        return Err(TreeError::NoTerminals {
                            label: nt.label().to_owned(),
                        }
                        .into());
                    }
                }
            }
        }
        terminals.sort_by_key(|&idx| self.term_num(idx));
        Ok(terminals)
    }

    /// Get the terminals below `node` in structural order.
    ///
    /// Unlike `terminals_below`, this never fails; nonterminals without
    /// children contribute nothing.
    pub fn unordered_terminals_below(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut terminals = Vec::new();
        let mut stack = vec![node];
        while let Some(cursor) = stack.pop() {
            if self.graph[cursor].is_terminal() {
                terminals.push(cursor);
            } else {
                stack.extend(self.children(cursor));
            }
        }
        terminals
    }

    /// Partition the terminals below `node` into maximal blocks of
    /// consecutive sentence positions, in left-to-right order.
    ///
    /// The number of blocks is the fan-out of `node`; continuous nodes have
    /// exactly one block.
    pub fn terminal_blocks(&self, node: NodeIndex) -> Result<Vec<Vec<NodeIndex>>, Error> {
        let terminals = self.terminals_below(node)?;
        let mut blocks = Vec::new();
        let mut prev = None;
        for terminal in terminals {
            let num = self.term_num(terminal);
            match prev {
                Some(p) if num == p + 1 => blocks.last_mut().unwrap().push(terminal),
                _ => blocks.push(vec![terminal]),
            }
            prev = Some(num);
        }
        Ok(blocks)
    }

    /// Get the smallest sentence position dominated by `node`.
    pub fn first_terminal_num(&self, node: NodeIndex) -> Result<usize, Error> {
        Ok(self.term_num(*self.terminals_below(node)?.first().unwrap()))
    }

    /// Get the largest sentence position dominated by `node`.
    pub fn last_terminal_num(&self, node: NodeIndex) -> Result<usize, Error> {
        Ok(self.term_num(*self.terminals_below(node)?.last().unwrap()))
    }

    // Position of a terminal; only called on indices known to be terminals.
    fn term_num(&self, node: NodeIndex) -> usize {
        self.graph[node].terminal().map(Terminal::num).unwrap_or(0)
    }

    /// Preorder traversal of the subtree rooted in `node`, children in
    /// `ordered_children` order.
    pub fn preorder(&self, node: NodeIndex) -> Result<Vec<NodeIndex>, Error> {
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(cursor) = stack.pop() {
            result.push(cursor);
            let mut children = self.ordered_children(cursor)?;
            children.reverse();
            stack.extend(children);
        }
        Ok(result)
    }

    /// Postorder traversal of the subtree rooted in `node`, children in
    /// `ordered_children` order.
    pub fn postorder(&self, node: NodeIndex) -> Result<Vec<NodeIndex>, Error> {
        let mut result = Vec::new();
        let mut stack = vec![(node, false)];
        while let Some((cursor, expanded)) = stack.pop() {
            if expanded {
                result.push(cursor);
                continue;
            }
            stack.push((cursor, true));
            let mut children = self.ordered_children(cursor)?;
            children.reverse();
            for child in children {
                stack.push((child, false));
            }
        }
        Ok(result)
    }

    /// Get the right sibling of `node` in the ordered children of its
    /// parent, `None` at the boundary.
    pub fn right_sibling(&self, node: NodeIndex) -> Result<Option<NodeIndex>, Error> {
        let parent = match self.parent(node) {
            Some((parent, _)) => parent,
            None => return Ok(None),
        };
        let siblings = self.ordered_children(parent)?;
        Ok(siblings
            .iter()
            .position(|&sibling| sibling == node)
            .and_then(|pos| siblings.get(pos + 1).copied()))
    }

    /// Get the left sibling of `node` in the ordered children of its
    /// parent, `None` at the boundary.
    pub fn left_sibling(&self, node: NodeIndex) -> Result<Option<NodeIndex>, Error> {
        let parent = match self.parent(node) {
            Some((parent, _)) => parent,
            None => return Ok(None),
        };
        let siblings = self.ordered_children(parent)?;
        Ok(siblings
            .iter()
            .position(|&sibling| sibling == node)
            .filter(|&pos| pos > 0)
            .and_then(|pos| siblings.get(pos - 1).copied()))
    }

    /// Get all ancestors of `node` including the node itself, bottom-up.
    pub fn dominance(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = vec![node];
        let mut climber = Climber::new(node, self);
        while let Some(parent) = climber.next(self) {
            chain.push(parent);
        }
        chain
    }

    /// Get the least common ancestor of two nodes.
    ///
    /// Returns `None` only if the nodes belong to disjoint trees, which
    /// indicates an invariant violation for nodes taken from the same tree.
    pub fn lca(&self, node_1: NodeIndex, node_2: NodeIndex) -> Option<NodeIndex> {
        let dom_1 = self.dominance(node_1);
        let dom_2 = self.dominance(node_2);
        let mut common = None;
        for (el_1, el_2) in dom_1.iter().rev().zip(dom_2.iter().rev()) {
            if el_1 == el_2 {
                common = Some(*el_1);
            } else {
                break;
            }
        }
        common
    }

    /// Remove a terminal from the tree.
    ///
    /// Ancestors left without children are removed as well. The sentence
    /// positions of all terminals to the right of the removed one are
    /// shifted down by one, so positions stay consecutive. Returns the
    /// first retained ancestor.
    pub fn delete_terminal(&mut self, leaf: NodeIndex) -> Result<NodeIndex, Error> {
        let num = match self.graph[leaf].terminal() {
            Some(terminal) => terminal.num(),
            None => {
                return Err(TreeError::NotATerminal {
                    label: self.graph[leaf].label().to_owned(),
                }
                .into())
            }
        };
        if self.n_terminals <= 1 {
            return Err(TreeError::LastTerminal.into());
        }
        // a tree with more than one terminal has a parent for every terminal
        let (mut cursor, _) = self
            .parent(leaf)
            .ok_or_else(|| TreeError::LastTerminal)?;
        self.graph.remove_node(leaf);
        loop {
            if cursor == self.root || self.children(cursor).next().is_some() {
                break;
            }
            let up = self.parent(cursor).map(|(parent, _)| parent);
            self.graph.remove_node(cursor);
            match up {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        let indices = self.graph.node_indices().collect::<Vec<_>>();
        for idx in indices {
            if let Some(terminal) = self.graph[idx].terminal_mut() {
                if terminal.num() > num {
                    let shifted = terminal.num() - 1;
                    terminal.set_num(shifted);
                }
            }
        }
        self.n_terminals -= 1;
        Ok(cursor)
    }

    /// Insert a terminal with the given sentence position, attached to the
    /// root. Positions of existing terminals at or right of `num` are
    /// shifted up by one.
    pub fn insert_terminal(
        &mut self,
        num: usize,
        form: impl Into<String>,
        pos: impl Into<String>,
    ) -> Result<NodeIndex, Error> {
        if num < 1 || num > self.n_terminals + 1 {
            return Err(TreeError::PositionOutOfBounds {
                num,
                max: self.n_terminals + 1,
            }
            .into());
        }
        let indices = self.graph.node_indices().collect::<Vec<_>>();
        for idx in indices {
            if let Some(terminal) = self.graph[idx].terminal_mut() {
                if terminal.num() >= num {
                    let shifted = terminal.num() + 1;
                    terminal.set_num(shifted);
                }
            }
        }
        let idx = self
            .graph
            .add_node(Node::Terminal(Terminal::new(form, pos, num)));
        let root = self.root;
        self.graph.add_edge(root, idx, Edge::default());
        self.n_terminals += 1;
        Ok(idx)
    }

    /// Get an immutable reference to the underlying `StableGraph`.
    pub fn graph(&self) -> &StableGraph<Node, Edge> {
        &self.graph
    }

    /// Get a mutable reference to the underlying `StableGraph`.
    pub(crate) fn graph_mut(&mut self) -> &mut StableGraph<Node, Edge> {
        &mut self.graph
    }
}

impl PartialEq for Tree {
    /// Two trees are equal iff their ordered preorder traversals match in
    /// node content, incoming edge label and child count.
    fn eq(&self, other: &Tree) -> bool {
        if self.n_terminals != other.n_terminals {
            return false;
        }
        if self.graph.node_count() != other.graph.node_count() {
            return false;
        }
        let (ours, theirs) = match (self.preorder(self.root), other.preorder(other.root)) {
            (Ok(ours), Ok(theirs)) => (ours, theirs),
            _ => return false,
        };
        for (&node_1, &node_2) in ours.iter().zip(theirs.iter()) {
            if self.graph[node_1] != other.graph[node_2] {
                return false;
            }
            let edge_1 = self.parent(node_1).map(|(_, edge)| &self.graph[edge]);
            let edge_2 = other.parent(node_2).map(|(_, edge)| &other.graph[edge]);
            if edge_1 != edge_2 {
                return false;
            }
            if self.children(node_1).count() != other.children(node_2).count() {
                return false;
            }
        }
        true
    }
}

impl Index<NodeIndex> for Tree {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Node {
        &self.graph[index]
    }
}

impl Index<EdgeIndex> for Tree {
    type Output = Edge;

    fn index(&self, index: EdgeIndex) -> &Edge {
        &self.graph[index]
    }
}

impl IndexMut<NodeIndex> for Tree {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.graph[index]
    }
}

impl IndexMut<EdgeIndex> for Tree {
    fn index_mut(&mut self, index: EdgeIndex) -> &mut Edge {
        &mut self.graph[index]
    }
}
