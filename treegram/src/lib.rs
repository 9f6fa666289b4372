//! Transform constituency treebank trees and extract formal grammars.
//!
//! Trees are read from treebank formats (NeGra export, brackets), rewritten
//! by transformations such as the block-splitting pipeline that resolves
//! crossing branches, and turned into PMCFG/RCG grammars with optional
//! markovized binarization.

#[macro_use]
extern crate failure;

#[macro_use]
extern crate pest_derive;

pub mod io;
pub use crate::io::{BracketsReader, ExportReader, WriteTree};

mod tree;
pub use crate::tree::Tree;

mod edge;
pub use crate::edge::Edge;

mod node;
pub use crate::node::{Marks, Node, NonTerminal, Terminal};

mod error;
pub use crate::error::{GrammarError, TreeError};

pub mod analyze;

pub mod transform;
pub use crate::transform::{Canonicalize, PunctuationOps, TreeOps};

pub mod grammar;

pub mod util;

#[cfg(test)]
pub(crate) mod testdata;
