//! TIGER-XML output.
//!
//! Sentences are written as `<s>` elements; the surrounding corpus
//! document is opened and closed explicitly. Attribute values are quoted
//! manually, there is no XML machinery involved.

use std::io::Write;

use failure::Error;

use crate::io::{compute_export_numbering, decorated_label, DEFAULT_FIELD, LabelOpts, WriteTree};
use crate::Tree;

/// Writer for TIGER-XML documents.
pub struct TigerXmlWriter<W> {
    inner: W,
    opts: LabelOpts,
}

impl<W> TigerXmlWriter<W>
where
    W: Write,
{
    pub fn new(inner: W, opts: LabelOpts) -> Self {
        TigerXmlWriter { inner, opts }
    }

    /// Write the document prolog.
    pub fn begin_document(&mut self, encoding: &str) -> Result<(), Error> {
        writeln!(self.inner, "<?xml version='1.0' encoding='{}'?>", encoding)?;
        writeln!(self.inner, "<corpus>")?;
        writeln!(self.inner, "<body>")?;
        Ok(())
    }

    /// Write the document epilog.
    pub fn end_document(&mut self) -> Result<(), Error> {
        writeln!(self.inner, "</body>")?;
        writeln!(self.inner, "</corpus>")?;
        Ok(())
    }
}

fn quote_attr(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '&' => quoted.push_str("&amp;"),
            '<' => quoted.push_str("&lt;"),
            '>' => quoted.push_str("&gt;"),
            '"' => quoted.push_str("&quot;"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

impl<W> WriteTree for TigerXmlWriter<W>
where
    W: Write,
{
    fn write_tree(&mut self, tree: &Tree) -> Result<(), Error> {
        let numbering = compute_export_numbering(tree)?;
        writeln!(self.inner, "<s id=\"{}\">", tree.sid())?;
        writeln!(self.inner, "<graph root=\"{}\">", numbering[&tree.root()])?;
        writeln!(self.inner, "  <terminals>")?;
        for terminal in tree.terminals()? {
            let node = tree[terminal].terminal().unwrap();
            writeln!(
                self.inner,
                "    <t id=\"{}\" word={} lemma={} pos={} morph={} />",
                node.num(),
                quote_attr(node.form()),
                quote_attr(node.lemma().unwrap_or(DEFAULT_FIELD)),
                quote_attr(node.label()),
                quote_attr(node.morph().unwrap_or(DEFAULT_FIELD)),
            )?;
        }
        writeln!(self.inner, "  </terminals>")?;
        writeln!(self.inner, "  <nonterminals>")?;
        for node in tree.postorder(tree.root())? {
            if tree[node].is_terminal() {
                continue;
            }
            writeln!(
                self.inner,
                "    <nt id=\"{}\" cat={}>",
                numbering[&node],
                quote_attr(&decorated_label(tree, node, &self.opts)),
            )?;
            for child in tree.ordered_children(node)? {
                let idref = match tree[child].terminal() {
                    Some(terminal) => terminal.num(),
                    None => numbering[&child],
                };
                writeln!(
                    self.inner,
                    "      <edge label={} idref=\"{}\" />",
                    quote_attr(
                        &tree
                            .incoming_edge_label(child)
                            .unwrap_or_else(|| DEFAULT_FIELD.to_owned())
                    ),
                    idref,
                )?;
            }
            writeln!(self.inner, "    </nt>")?;
        }
        writeln!(self.inner, "  </nonterminals>")?;
        writeln!(self.inner, "</graph>")?;
        writeln!(self.inner, "</s>")?;
        Ok(())
    }
}
