//! NeGra export format (Brants 1997), columns 3 and 4.
//!
//! A sentence is a `#BOS id` / `#EOS id` delimited block with one line per
//! node. Terminals are numbered 1.. in line order, nonterminals carry
//! numbers 500..999 and every line names the number of its parent (0 for
//! the virtual root). Fields after the parent number are ignored since not
//! all export treebanks respect the original definition.

use std::collections::HashMap;
use std::io::{BufRead, Lines, Write};

use failure::Error;
use petgraph::prelude::{NodeIndex, StableGraph};

use crate::io::{decorated_label, DEFAULT_FIELD, DEFAULT_ROOT, LabelOpts, WriteTree};
use crate::{Edge, Node, NonTerminal, Terminal, Tree, TreeError};

/// Iterator over the constituency trees in an export format file.
///
/// `next()` moves the reader until the first `#BOS` is found, then
/// collects lines until `#EOS`. Malformed sentences yield an error for
/// that sentence only; the iterator remains usable.
pub struct ExportReader<R>
where
    R: BufRead,
{
    inner: Lines<R>,
}

impl<R> ExportReader<R>
where
    R: BufRead,
{
    /// Creates a new `ExportReader` over the trees in the reader.
    pub fn new(reader: R) -> ExportReader<R> {
        ExportReader {
            inner: reader.lines(),
        }
    }
}

impl<R> Iterator for ExportReader<R>
where
    R: BufRead,
{
    type Item = Result<Tree, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut inside = false;
        let mut sentence = Vec::new();
        while let Some(line) = self.inner.next() {
            let line = match line {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            let line = line.trim().to_owned();
            if line.starts_with("#BOS") {
                if inside {
                    return Some(Err(format_err!("second #BOS before #EOS: {}", line)));
                }
                inside = true;
            }
            if inside {
                let end = line.starts_with("#EOS");
                sentence.push(line);
                if end {
                    return Some(parse_sentence(&sentence));
                }
            }
        }
        None
    }
}

// One parsed node line.
struct NodeLine {
    word: String,
    lemma: String,
    label: String,
    morph: String,
    edge: String,
    parent_num: usize,
}

fn parse_line(line: &str, sid: usize) -> Result<NodeLine, Error> {
    let mut fields = line.split_whitespace().map(ToOwned::to_owned).collect::<Vec<_>>();
    // column 3 has no lemma; detect it by the parent number showing up early
    if fields.len() >= 5 && fields[4].chars().all(|c| c.is_ascii_digit()) {
        fields.insert(1, DEFAULT_FIELD.to_owned());
    }
    if fields.len() < 6 {
        return Err(TreeError::Malformed {
            sid,
            reason: format!("too few fields: {}", line),
        }
        .into());
    }
    let parent_num = fields[5].parse::<usize>().map_err(|_| TreeError::Malformed {
        sid,
        reason: format!("cannot parse parent number: {}", fields[5]),
    })?;
    if !(parent_num == 0 || (500..1000).contains(&parent_num)) {
        return Err(TreeError::Malformed {
            sid,
            reason: format!("parent number must be 0 or between 500 and 999: {}", parent_num),
        }
        .into());
    }
    let mut drain = fields.into_iter();
    Ok(NodeLine {
        word: drain.next().unwrap(),
        lemma: drain.next().unwrap(),
        label: drain.next().unwrap(),
        morph: drain.next().unwrap(),
        edge: drain.next().unwrap(),
        parent_num,
    })
}

fn optional_field(value: &str) -> Option<&str> {
    if value == DEFAULT_FIELD {
        None
    } else {
        Some(value)
    }
}

fn parse_sentence(lines: &[String]) -> Result<Tree, Error> {
    let bos = lines
        .first()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| format_err!("sentence without #BOS"))?;
    let sid = bos.parse::<usize>()?;
    let eos = lines
        .last()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| format_err!("sentence without #EOS"))?;
    if eos.parse::<usize>()? != sid {
        return Err(TreeError::Malformed {
            sid,
            reason: "sentence id mismatch between #BOS and #EOS".to_owned(),
        }
        .into());
    }

    let mut node_by_num = HashMap::new();
    let mut children_by_num: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut term_cnt = 0;
    for line in &lines[1..lines.len() - 1] {
        let fields = parse_line(line, sid)?;
        let num = if fields.word.len() == 4
            && fields.word.starts_with('#')
            && fields.word[1..].chars().all(|c| c.is_ascii_digit())
        {
            fields.word[1..].parse::<usize>()?
        } else {
            term_cnt += 1;
            term_cnt
        };
        if node_by_num.insert(num, fields).is_some() {
            return Err(TreeError::Malformed {
                sid,
                reason: format!("duplicate node number {}", num),
            }
            .into());
        }
    }
    for (&num, fields) in &node_by_num {
        children_by_num
            .entry(fields.parent_num)
            .or_insert_with(Vec::new)
            .push(num);
    }
    if !children_by_num.contains_key(&0) {
        return Err(TreeError::Malformed {
            sid,
            reason: "sentence without root".to_owned(),
        }
        .into());
    }

    let mut graph = StableGraph::new();
    let root = graph.add_node(Node::NonTerminal(NonTerminal::new(DEFAULT_ROOT)));
    let mut built = 0;
    // (parent index, node number) pairs left to attach
    let mut stack = children_by_num
        .remove(&0)
        .unwrap()
        .into_iter()
        .map(|num| (root, num))
        .collect::<Vec<_>>();
    while let Some((parent, num)) = stack.pop() {
        let fields = node_by_num.get(&num).ok_or_else(|| TreeError::Malformed {
            sid,
            reason: format!("reference to unknown node {}", num),
        })?;
        let node = if num < 500 {
            let mut terminal = Terminal::new(fields.word.clone(), fields.label.clone(), num);
            terminal.set_lemma(optional_field(&fields.lemma));
            terminal.set_morph(optional_field(&fields.morph));
            Node::Terminal(terminal)
        } else {
            Node::NonTerminal(NonTerminal::new(fields.label.clone()))
        };
        let idx = graph.add_node(node);
        graph.add_edge(parent, idx, Edge::new(optional_field(&fields.edge)));
        built += 1;
        if let Some(children) = children_by_num.remove(&num) {
            stack.extend(children.into_iter().map(|child| (idx, child)));
        } else if num >= 500 {
            return Err(TreeError::Malformed {
                sid,
                reason: format!("nonterminal {} without children", num),
            }
            .into());
        }
    }
    if built != node_by_num.len() {
        return Err(TreeError::Malformed {
            sid,
            reason: "nodes not connected to the root".to_owned(),
        }
        .into());
    }
    Ok(Tree::new(graph, term_cnt, root, sid))
}

/// Compute the presentation numbering used by the export and TIGER-XML
/// formats.
///
/// Internal nodes are grouped by their level, the longest path down to a
/// dominated terminal. Numbers from 500 are handed out level by level from
/// the lowest, left to right within a level. The root maps to 0.
pub fn compute_export_numbering(tree: &Tree) -> Result<HashMap<NodeIndex, usize>, Error> {
    let mut levels: Vec<(usize, usize, NodeIndex)> = Vec::new();
    for node in tree.preorder(tree.root())? {
        if tree[node].is_terminal() {
            continue;
        }
        let mut level = 0;
        for terminal in tree.terminals_below(node)? {
            let mut length = 0;
            let mut cursor = terminal;
            while cursor != node {
                cursor = tree.parent(cursor).map(|(parent, _)| parent).unwrap();
                length += 1;
            }
            level = level.max(length);
        }
        levels.push((level, tree.first_terminal_num(node)?, node));
    }
    levels.sort();
    let mut numbering = HashMap::new();
    for (i, &(_, _, node)) in levels.iter().enumerate() {
        numbering.insert(node, 500 + i);
    }
    numbering.insert(tree.root(), 0);
    Ok(numbering)
}

/// Export format writer.
pub struct ExportWriter<W> {
    inner: W,
    opts: ExportOpts,
}

/// Options for the export writer.
#[derive(Clone, Debug, Default)]
pub struct ExportOpts {
    /// Write the lemma column (column 4 format).
    pub four: bool,
    pub label: LabelOpts,
}

impl<W> ExportWriter<W>
where
    W: Write,
{
    pub fn new(inner: W, opts: ExportOpts) -> Self {
        ExportWriter { inner, opts }
    }
}

// number of tabs after a field, given its length
fn export_tabs(len: usize) -> &'static str {
    if len < 8 {
        "\t\t\t"
    } else if len < 16 {
        "\t\t"
    } else {
        "\t"
    }
}

impl<W> WriteTree for ExportWriter<W>
where
    W: Write,
{
    fn write_tree(&mut self, tree: &Tree) -> Result<(), Error> {
        let numbering = compute_export_numbering(tree)?;
        writeln!(self.inner, "#BOS {}", tree.sid())?;
        let mut nonterminals = Vec::new();
        for node in tree.preorder(tree.root())? {
            if node == tree.root() {
                continue;
            }
            if !tree[node].is_terminal() {
                nonterminals.push((numbering[&node], node));
            }
        }
        nonterminals.sort();
        for terminal in tree.terminals()? {
            let line = self.format_node(tree, terminal, &numbering);
            self.inner.write_all(line.as_bytes())?;
        }
        for &(_, node) in &nonterminals {
            let line = self.format_node(tree, node, &numbering);
            self.inner.write_all(line.as_bytes())?;
        }
        writeln!(self.inner, "#EOS {}", tree.sid())?;
        Ok(())
    }
}

impl<W> ExportWriter<W>
where
    W: Write,
{
    fn format_node(
        &self,
        tree: &Tree,
        node: NodeIndex,
        numbering: &HashMap<NodeIndex, usize>,
    ) -> String {
        let (parent, _) = tree.parent(node).unwrap();
        let parent_num = numbering[&parent];
        let label = decorated_label(tree, node, &self.opts.label);
        let edge = tree
            .incoming_edge_label(node)
            .unwrap_or_else(|| DEFAULT_FIELD.to_owned());
        let (word, lemma, morph) = match tree[node].terminal() {
            Some(terminal) => (
                terminal.form().to_owned(),
                terminal.lemma().unwrap_or(DEFAULT_FIELD).to_owned(),
                terminal.morph().unwrap_or(DEFAULT_FIELD).to_owned(),
            ),
            None => (
                format!("#{}", numbering[&node]),
                DEFAULT_FIELD.to_owned(),
                DEFAULT_FIELD.to_owned(),
            ),
        };
        if self.opts.four {
            format!(
                "{}{}{}{}{}\t{}{}{}\t{}\n",
                word,
                export_tabs(word.len()),
                lemma,
                export_tabs(lemma.len()),
                label,
                morph,
                export_tabs(morph.len() + 8),
                edge,
                parent_num
            )
        } else {
            format!(
                "{}{}{}\t{}{}{}\t{}\n",
                word,
                export_tabs(word.len()),
                label,
                morph,
                export_tabs(morph.len() + 8),
                edge,
                parent_num
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_export_numbering, ExportOpts, ExportReader, ExportWriter};
    use crate::io::WriteTree;
    use crate::testdata::{discont_tree, DISCONT_LABELS_PREORDER, SAMPLE_EXPORT, WORDS};
    use crate::TreeError;

    #[test]
    fn read_sample() {
        let tree = discont_tree();
        assert_eq!(tree.sid(), 1);
        assert_eq!(tree.n_terminals(), 9);
        let preorder = tree.preorder(tree.root()).unwrap();
        assert_eq!(preorder.len(), 15);
        let labels = preorder
            .iter()
            .map(|&idx| tree[idx].label().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(labels, DISCONT_LABELS_PREORDER);
        let words = tree
            .terminals()
            .unwrap()
            .iter()
            .map(|&idx| tree[idx].terminal().unwrap().form().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(words, WORDS);
        // edges survive reading; the S node has an HD child
        let s = tree.ordered_children(tree.root()).unwrap()[0];
        let edges = tree
            .ordered_children(s)
            .unwrap()
            .iter()
            .map(|&idx| tree.incoming_edge_label(idx))
            .collect::<Vec<_>>();
        assert_eq!(edges[1].as_deref(), Some("HD"));
    }

    #[test]
    fn numbering() {
        let tree = discont_tree();
        let numbering = compute_export_numbering(&tree).unwrap();
        let expected = vec![0, 504, 503, 502, 500, 1, 8, 6, 501, 7, 4, 5, 2, 3, 9];
        let numbers = tree
            .preorder(tree.root())
            .unwrap()
            .iter()
            .map(|&idx| {
                numbering
                    .get(&idx)
                    .copied()
                    .unwrap_or_else(|| tree[idx].terminal().unwrap().num())
            })
            .collect::<Vec<_>>();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn roundtrip() {
        let tree = discont_tree();
        let mut buffer = Vec::new();
        {
            let mut writer = ExportWriter::new(&mut buffer, ExportOpts::default());
            writer.write_tree(&tree).unwrap();
        }
        let reread = ExportReader::new(buffer.as_slice())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(tree, reread);
    }

    #[test]
    fn fields_match_sample() {
        let tree = discont_tree();
        let mut buffer = Vec::new();
        {
            let mut writer = ExportWriter::new(&mut buffer, ExportOpts::default());
            writer.write_tree(&tree).unwrap();
        }
        let written = String::from_utf8(buffer).unwrap();
        for (ours, sample) in written.lines().zip(SAMPLE_EXPORT.lines()) {
            let ours = ours.split_whitespace().collect::<Vec<_>>();
            let sample = sample.split_whitespace().collect::<Vec<_>>();
            assert_eq!(ours, sample);
        }
        assert_eq!(written.lines().count(), SAMPLE_EXPORT.lines().count());
    }

    #[test]
    fn multiple_sentences_and_errors() {
        let two = format!("{}{}", SAMPLE_EXPORT, SAMPLE_EXPORT);
        let trees = ExportReader::new(two.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(trees.len(), 2);

        let bad = "#BOS 7\nWho\tWP\t--\t--\t900\n#EOS 7\n";
        let result = ExportReader::new(bad.as_bytes()).next().unwrap();
        let err = result.unwrap_err();
        match err.downcast_ref::<TreeError>() {
            Some(TreeError::Malformed { sid, .. }) => assert_eq!(*sid, 7),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn export_four() {
        let tree = discont_tree();
        let mut buffer = Vec::new();
        {
            let mut writer = ExportWriter::new(
                &mut buffer,
                ExportOpts {
                    four: true,
                    ..ExportOpts::default()
                },
            );
            writer.write_tree(&tree).unwrap();
        }
        let written = String::from_utf8(buffer).unwrap();
        let first = written.lines().nth(1).unwrap();
        let fields = first.split_whitespace().collect::<Vec<_>>();
        assert_eq!(fields, vec!["Who", "--", "WP", "--", "--", "500"]);
        // column 4 output reads back identically
        let reread = ExportReader::new(written.as_bytes())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(tree, reread);
    }
}
