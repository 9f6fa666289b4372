mod brackets;
pub use crate::io::brackets::{BracketsOpts, BracketsReader, BracketsReadOpts, BracketsWriter};
mod export;
pub use crate::io::export::{compute_export_numbering, ExportOpts, ExportReader, ExportWriter};
mod grammar;
pub use crate::io::grammar::{
    read_rcg, read_rcg_lexicon, write_lexicon, write_pmcfg, write_rcg, LoparWriter,
};
mod tigerxml;
pub use crate::io::tigerxml::TigerXmlWriter;

use failure::Error;
use petgraph::prelude::NodeIndex;

use crate::Tree;

pub(crate) static DEFAULT_ROOT: &str = "VROOT";
pub(crate) static DEFAULT_FIELD: &str = "--";

/// Trait to write a `Tree`.
pub trait WriteTree {
    fn write_tree(&mut self, tree: &Tree) -> Result<(), Error>;
}

/// Presentation options for node labels.
///
/// These only affect output: grammatical functions can be appended to the
/// label, head children can be marked with a `'`, and nodes introduced by
/// block splitting can be marked with a `*` and their block number.
#[derive(Clone, Debug)]
pub struct LabelOpts {
    pub gf: bool,
    pub gf_separator: String,
    pub mark_heads: bool,
    pub split_marking: bool,
    pub split_numbering: bool,
}

impl Default for LabelOpts {
    fn default() -> Self {
        LabelOpts {
            gf: false,
            gf_separator: "-".to_owned(),
            mark_heads: false,
            split_marking: false,
            split_numbering: false,
        }
    }
}

pub(crate) fn decorated_label(tree: &Tree, node: NodeIndex, opts: &LabelOpts) -> String {
    let mut label = tree[node].label().to_owned();
    if opts.gf {
        if let Some(edge) = tree.incoming_edge_label(node) {
            label.push_str(&opts.gf_separator);
            label.push_str(&edge);
        }
    }
    if (opts.split_marking || opts.split_numbering) && tree[node].marks().split == Some(true) {
        label.push('*');
        if opts.split_numbering {
            if let Some(block) = tree[node].marks().block_number {
                label.push_str(&block.to_string());
            }
        }
    }
    if opts.mark_heads && tree[node].marks().head == Some(true) {
        label.push('\'');
    }
    label
}
