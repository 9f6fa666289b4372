//! Grammar extraction from treebank trees.
//!
//! Trees yield "bare" productions together with their possible
//! linearizations and the vertical contexts they were seen in. A
//! linearization describes how the argument spans of the right hand side
//! concatenate into the (possibly discontinuous) span of the left hand
//! side, which makes the productions rules of a PMCFG.

mod analysis;
pub use self::analysis::{fan_out, is_contextfree};

mod binarize;
pub use self::binarize::{binarize, linsub, reorder_optimal, LinSubst, MarkovOpts, Reordering};

use std::collections::{BTreeMap, HashMap};

use failure::Error;

use crate::analyze::gap_degree_node;
use crate::{Tree, TreeError};

pub(crate) const DEFAULT_BINLABEL: &str = "@";
pub(crate) const DEFAULT_BINSUFFIX: &str = "X";
pub(crate) const MARKOV_HORIZONTAL_SEP: &str = "-";
pub(crate) const MARKOV_VERTICAL_SEP: &str = "^";
pub(crate) const DEFAULT_VERT: &str = "VERT";

/// A bare production: the left hand side label followed by the labels of
/// the right hand side, in span order.
pub type Function = Vec<String>;

/// A linearization vector: one entry per continuous block of the left hand
/// side, each block a sequence of `(rhs-position, argument-index)` pairs.
/// The outer length is the fan-out of the left hand side in this rule.
pub type Linearization = Vec<Vec<(usize, usize)>>;

/// A vertical context: ancestor labels from the rule's left hand side up
/// to the root, each suffixed with its fan-out.
pub type Context = Vec<String>;

/// The vertical context bucket used when no context is tracked.
pub fn default_context() -> Context {
    vec![DEFAULT_VERT.to_owned()]
}

/// A PMCFG as extracted from trees: occurrence counts keyed by function,
/// linearization and vertical context.
///
/// All maps are ordered, so iteration, binarization label numbering and
/// serialized output are deterministic.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Grammar {
    rules: BTreeMap<Function, BTreeMap<Linearization, BTreeMap<Context, usize>>>,
}

impl Grammar {
    pub fn new() -> Self {
        Grammar::default()
    }

    /// Add `count` occurrences of a rule.
    pub fn add(&mut self, func: Function, lin: Linearization, vert: Context, count: usize) {
        *self
            .rules
            .entry(func)
            .or_insert_with(BTreeMap::new)
            .entry(lin)
            .or_insert_with(BTreeMap::new)
            .entry(vert)
            .or_insert(0) += count;
    }

    /// Iterate over functions and their linearizations.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&Function, &BTreeMap<Linearization, BTreeMap<Context, usize>>)> {
        self.rules.iter()
    }

    /// Get the linearizations of a function.
    pub fn get(
        &self,
        func: &[String],
    ) -> Option<&BTreeMap<Linearization, BTreeMap<Context, usize>>> {
        self.rules.get(func)
    }

    /// Number of distinct functions.
    pub fn n_functions(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Total occurrence count of a `(function, linearization)` pair over
    /// all vertical contexts.
    pub fn rule_count(&self, func: &[String], lin: &Linearization) -> usize {
        self.rules
            .get(func)
            .and_then(|lins| lins.get(lin))
            .map(|verts| verts.values().sum())
            .unwrap_or(0)
    }

    /// Merge another grammar into this one by summing counts.
    ///
    /// Summation is associative and commutative, so grammars accumulated
    /// over disjoint parts of a treebank can be merged in any order.
    pub fn merge(&mut self, other: Grammar) {
        for (func, lins) in other.rules {
            for (lin, verts) in lins {
                for (vert, count) in verts {
                    self.add(func.clone(), lin.clone(), vert, count);
                }
            }
        }
    }
}

/// Word form to part-of-speech counts as observed at the terminals.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Lexicon {
    entries: BTreeMap<String, BTreeMap<String, usize>>,
}

impl Lexicon {
    pub fn new() -> Self {
        Lexicon::default()
    }

    /// Count one occurrence of `pos` for `form`.
    pub fn add(&mut self, form: impl Into<String>, pos: impl Into<String>) {
        self.add_count(form, pos, 1);
    }

    /// Count `count` occurrences of `pos` for `form`.
    pub fn add_count(&mut self, form: impl Into<String>, pos: impl Into<String>, count: usize) {
        *self
            .entries
            .entry(form.into())
            .or_insert_with(BTreeMap::new)
            .entry(pos.into())
            .or_insert(0) += count;
    }

    /// Iterate over forms and their tag counts.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, usize>)> {
        self.entries.iter()
    }

    /// Get the tag counts of a form.
    pub fn get(&self, form: &str) -> Option<&BTreeMap<String, usize>> {
        self.entries.get(form)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another lexicon into this one by summing counts.
    pub fn merge(&mut self, other: Lexicon) {
        for (form, tags) in other.entries {
            for (pos, count) in tags {
                self.add_count(form.clone(), pos, count);
            }
        }
    }
}

/// Extract PMCFG productions and lexicon entries from a tree.
///
/// Every internal node contributes one occurrence of its production; every
/// terminal contributes a lexicon count. The tree is not modified, and
/// extracting the same tree twice yields identical structures.
pub fn extract(tree: &Tree, grammar: &mut Grammar, lexicon: &mut Lexicon) -> Result<(), Error> {
    for node in tree.preorder(tree.root())? {
        let children = tree.ordered_children(node)?;
        if children.is_empty() {
            let terminal = tree[node].terminal().ok_or_else(|| TreeError::NoTerminals {
                label: tree[node].label().to_owned(),
            })?;
            lexicon.add(terminal.form(), terminal.label());
            continue;
        }
        // map sentence positions to the right hand side elements covering
        // them, and build the bare production alongside
        let mut func = vec![tree[node].label().to_owned()];
        let mut term_map = HashMap::new();
        for (i, &child) in children.iter().enumerate() {
            func.push(tree[child].label().to_owned());
            for terminal in tree.terminals_below(child)? {
                term_map.insert(tree[terminal].terminal().unwrap().num(), i);
            }
        }
        // one argument per block; inside a block a new pair is emitted
        // whenever the covering element changes
        let mut lin: Linearization = Vec::new();
        let mut rhs_argpos = vec![0usize; children.len()];
        for block in tree.terminal_blocks(node)? {
            let mut arg = Vec::new();
            for terminal in block {
                let rhs_pos = term_map[&tree[terminal].terminal().unwrap().num()];
                if arg.last().map(|&(pos, _)| pos) != Some(rhs_pos) {
                    arg.push((rhs_pos, rhs_argpos[rhs_pos]));
                    rhs_argpos[rhs_pos] += 1;
                }
            }
            lin.push(arg);
        }
        // ancestor chain with fan-outs, for markovization
        let mut vert = Vec::new();
        for dom in tree.dominance(node) {
            vert.push(format!(
                "{}{}",
                tree[dom].label(),
                gap_degree_node(tree, dom)? + 1
            ));
        }
        grammar.add(func, lin, vert, 1);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn func(labels: &[&str]) -> Function {
    labels.iter().map(|s| (*s).to_owned()).collect()
}
