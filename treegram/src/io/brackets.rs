//! Bracketed trees, one tree per balanced parenthesis group.
//!
//! Reading accepts single-line and multi-line trees and several trees per
//! line. Trees read from brackets are continuous by construction; writing
//! refuses discontinuous trees.

use std::collections::VecDeque;
use std::io::{BufRead, Lines, Write};

use failure::Error;
use pest::iterators::Pair;
use pest::Parser;
use petgraph::prelude::{NodeIndex, StableGraph};

use crate::analyze::gap_degree;
use crate::io::{decorated_label, DEFAULT_FIELD, DEFAULT_ROOT, LabelOpts, WriteTree};
use crate::{Edge, Node, NonTerminal, Terminal, Tree};

// dummy struct required by pest
#[derive(Parser)]
#[grammar = "io/brackets.pest"]
struct BracketsParser;

/// Options for reading bracketed trees.
#[derive(Clone, Debug)]
pub struct BracketsReadOpts {
    /// Accept preterminals without a part-of-speech tag, e.g. `(word)`;
    /// their tag becomes `--`.
    pub empty_pos: bool,
    /// Sentence id of the first tree.
    pub first_id: usize,
}

impl Default for BracketsReadOpts {
    fn default() -> Self {
        BracketsReadOpts {
            empty_pos: false,
            first_id: 1,
        }
    }
}

/// Iterator over bracketed trees in a reader.
pub struct BracketsReader<R>
where
    R: BufRead,
{
    inner: Lines<R>,
    opts: BracketsReadOpts,
    pending: VecDeque<String>,
    buffer: String,
    depth: usize,
    count: usize,
}

impl<R> BracketsReader<R>
where
    R: BufRead,
{
    pub fn new(reader: R, opts: BracketsReadOpts) -> Self {
        BracketsReader {
            inner: reader.lines(),
            opts,
            pending: VecDeque::new(),
            buffer: String::new(),
            depth: 0,
            count: 0,
        }
    }

    fn scan_line(&mut self, line: &str) -> Result<(), Error> {
        for c in line.chars() {
            match c {
                '(' => {
                    self.depth += 1;
                    self.buffer.push(c);
                }
                ')' => {
                    if self.depth == 0 {
                        return Err(format_err!("unbalanced ')' in: {}", line));
                    }
                    self.depth -= 1;
                    self.buffer.push(c);
                    if self.depth == 0 {
                        self.pending.push_back(self.buffer.clone());
                        self.buffer.clear();
                    }
                }
                _ => {
                    if self.depth > 0 {
                        self.buffer.push(c);
                    }
                }
            }
        }
        if self.depth > 0 {
            self.buffer.push(' ');
        }
        Ok(())
    }
}

impl<R> Iterator for BracketsReader<R>
where
    R: BufRead,
{
    type Item = Result<Tree, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sentence) = self.pending.pop_front() {
                let sid = self.opts.first_id + self.count;
                self.count += 1;
                return Some(brackets_to_tree(&sentence, sid, &self.opts));
            }
            match self.inner.next() {
                Some(Ok(line)) => {
                    if let Err(err) = self.scan_line(&line) {
                        return Some(Err(err));
                    }
                }
                Some(Err(err)) => return Some(Err(err.into())),
                None => {
                    if self.depth > 0 {
                        self.depth = 0;
                        self.buffer.clear();
                        return Some(Err(format_err!("unbalanced brackets at end of input")));
                    }
                    return None;
                }
            }
        }
    }
}

/// Build a tree from a single bracketed sentence.
pub fn brackets_to_tree(input: &str, sid: usize, opts: &BracketsReadOpts) -> Result<Tree, Error> {
    let mut parsed = BracketsParser::parse(Rule::tree, input)?;
    let node = parsed.next().unwrap().into_inner().next().unwrap();
    let mut graph = StableGraph::new();
    let mut n_terminals = 0;
    let root = build_node(node, &mut graph, &mut n_terminals, opts, true)?;
    Ok(Tree::new(graph, n_terminals, root, sid))
}

fn build_node(
    pair: Pair<Rule>,
    graph: &mut StableGraph<Node, Edge>,
    n_terminals: &mut usize,
    opts: &BracketsReadOpts,
    is_root: bool,
) -> Result<NodeIndex, Error> {
    // `node` wraps either a nonterminal or a preterminal
    let pair = match pair.as_rule() {
        Rule::node => pair.into_inner().next().unwrap(),
        _ => pair,
    };
    match pair.as_rule() {
        Rule::nonterminal => {
            let mut pairs = pair.into_inner().peekable();
            let label = match pairs.peek().map(Pair::as_rule) {
                Some(Rule::node_label) => pairs.next().unwrap().as_str().to_owned(),
                _ => {
                    if !is_root {
                        return Err(format_err!("phrase without label"));
                    }
                    DEFAULT_ROOT.to_owned()
                }
            };
            let idx = graph.add_node(Node::NonTerminal(NonTerminal::new(label)));
            for inner in pairs {
                let child = build_node(inner, graph, n_terminals, opts, false)?;
                graph.add_edge(idx, child, Edge::default());
            }
            Ok(idx)
        }
        Rule::preterminal => {
            let mut pairs = pair.into_inner();
            let label = pairs.next().unwrap().as_str();
            let (pos, form) = match pairs.next() {
                Some(token) => (label, token.as_str()),
                None => {
                    if !opts.empty_pos {
                        return Err(format_err!("preterminal without token: ({})", label));
                    }
                    (DEFAULT_FIELD, label)
                }
            };
            *n_terminals += 1;
            let terminal = Terminal::new(form, pos, *n_terminals);
            Ok(graph.add_node(Node::Terminal(terminal)))
        }
        _ => unreachable!(),
    }
}

/// Options for writing bracketed trees.
#[derive(Clone, Debug, Default)]
pub struct BracketsOpts {
    /// Omit the root label as in Penn Treebank exports.
    pub empty_root: bool,
    pub label: LabelOpts,
}

/// Writer for one bracketed tree per line.
pub struct BracketsWriter<W> {
    inner: W,
    opts: BracketsOpts,
}

impl<W> BracketsWriter<W>
where
    W: Write,
{
    pub fn new(inner: W, opts: BracketsOpts) -> Self {
        BracketsWriter { inner, opts }
    }
}

fn replace_brackets(s: &str) -> String {
    s.replace('(', "LRB")
        .replace(')', "RRB")
        .replace('[', "LSB")
        .replace(']', "RSB")
        .replace('{', "LCB")
        .replace('}', "RCB")
}

impl<W> WriteTree for BracketsWriter<W>
where
    W: Write,
{
    fn write_tree(&mut self, tree: &Tree) -> Result<(), Error> {
        if gap_degree(tree)? > 0 {
            return Err(format_err!(
                "cannot write a discontinuous tree with brackets (sentence {})",
                tree.sid()
            ));
        }
        let mut out = String::new();
        self.format_subtree(tree, tree.root(), &mut out, true)?;
        writeln!(self.inner, "{}", out)?;
        Ok(())
    }
}

impl<W> BracketsWriter<W>
where
    W: Write,
{
    fn format_subtree(
        &self,
        tree: &Tree,
        node: NodeIndex,
        out: &mut String,
        is_root: bool,
    ) -> Result<(), Error> {
        out.push('(');
        match tree[node].terminal() {
            Some(terminal) => {
                out.push_str(&replace_brackets(&decorated_label(
                    tree,
                    node,
                    &self.opts.label,
                )));
                out.push(' ');
                out.push_str(&replace_brackets(terminal.form()));
            }
            None => {
                if !(is_root && self.opts.empty_root) {
                    out.push_str(&decorated_label(tree, node, &self.opts.label));
                }
                for child in tree.ordered_children(node)? {
                    self.format_subtree(tree, child, out, false)?;
                }
            }
        }
        out.push(')');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BracketsOpts, BracketsReader, BracketsReadOpts, BracketsWriter};
    use crate::io::WriteTree;
    use crate::testdata::{
        cont_tree, discont_tree, CONT_LABELS_PREORDER, POS, SAMPLE_BRACKETS, WORDS,
    };

    #[test]
    fn read_sample() {
        let tree = cont_tree();
        assert_eq!(tree.sid(), 1);
        assert_eq!(tree.n_terminals(), 9);
        let preorder = tree.preorder(tree.root()).unwrap();
        assert_eq!(preorder.len(), 15);
        let labels = preorder
            .iter()
            .map(|&idx| tree[idx].label().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(labels, CONT_LABELS_PREORDER);
        let words = tree
            .terminals()
            .unwrap()
            .iter()
            .map(|&idx| tree[idx].terminal().unwrap().form().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(words, WORDS);
    }

    #[test]
    fn read_tolerant() {
        let input = "((S(Who)(did)(Fritz)(VP(tell)(Hans)(SBAR(that)(NP(Manfred))\
                     (VP(likes)))))(?))";
        let strict = BracketsReader::new(input.as_bytes(), BracketsReadOpts::default())
            .next()
            .unwrap();
        assert!(strict.is_err());
        let mut tree = BracketsReader::new(
            input.as_bytes(),
            BracketsReadOpts {
                empty_pos: true,
                ..BracketsReadOpts::default()
            },
        )
        .next()
        .unwrap()
        .unwrap();
        let terminals = tree.terminals().unwrap();
        let words = terminals
            .iter()
            .map(|&idx| tree[idx].terminal().unwrap().form().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(words, WORDS);
        for &idx in &terminals {
            assert_eq!(tree[idx].label(), "--");
        }
        // tags can be annotated afterwards
        for (idx, pos) in terminals.into_iter().zip(POS.iter()) {
            tree[idx].set_label(*pos);
        }
        assert_eq!(tree[tree.terminals().unwrap()[0]].label(), "WP");
    }

    #[test]
    fn multiline_and_multiple() {
        let input = "(S\n  (A a)\n  (B b))\n(S (C c)) (S (D d))\n";
        let trees = BracketsReader::new(input.as_bytes(), BracketsReadOpts::default())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(trees.len(), 3);
        assert_eq!(trees[0].n_terminals(), 2);
        assert_eq!(trees[0].sid(), 1);
        assert_eq!(trees[2].sid(), 3);
        assert_eq!(trees[2][trees[2].terminals().unwrap()[0]].label(), "D");
    }

    #[test]
    fn write_sample() {
        let tree = cont_tree();
        let mut buffer = Vec::new();
        {
            let mut writer = BracketsWriter::new(
                &mut buffer,
                BracketsOpts {
                    empty_root: true,
                    ..BracketsOpts::default()
                },
            );
            writer.write_tree(&tree).unwrap();
        }
        let written = String::from_utf8(buffer).unwrap();
        assert_eq!(written.trim_end(), SAMPLE_BRACKETS);

        let mut buffer = Vec::new();
        {
            let mut writer = BracketsWriter::new(&mut buffer, BracketsOpts::default());
            writer.write_tree(&tree).unwrap();
        }
        let written = String::from_utf8(buffer).unwrap();
        assert!(written.starts_with("(VROOT(S"));
    }

    #[test]
    fn refuse_discontinuous() {
        let tree = discont_tree();
        let mut buffer = Vec::new();
        let mut writer = BracketsWriter::new(&mut buffer, BracketsOpts::default());
        assert!(writer.write_tree(&tree).is_err());
    }

    #[test]
    fn bracket_replacement() {
        let input = "(S (A a))";
        let mut tree = BracketsReader::new(input.as_bytes(), BracketsReadOpts::default())
            .next()
            .unwrap()
            .unwrap();
        let terminal = tree.terminals().unwrap()[0];
        tree[terminal].terminal_mut().unwrap().set_form("a(b)c");
        let mut buffer = Vec::new();
        {
            let mut writer = BracketsWriter::new(&mut buffer, BracketsOpts::default());
            writer.write_tree(&tree).unwrap();
        }
        let written = String::from_utf8(buffer).unwrap();
        assert_eq!(written.trim_end(), "(S(A aLRBbRRBc))");
    }
}
