//! Shared fixtures: the canonical discontinuous sentence
//! "Who did Fritz tell Hans that Manfred likes ?" with a VP spanning
//! positions {1} and {4..8}, and its continuous counterpart.

use crate::io::{BracketsReadOpts, BracketsReader, ExportReader};
use crate::Tree;

pub const SAMPLE_EXPORT: &str = "#BOS 1
Who                     WP      --              --      500
did                     VB      --              HD      504
Fritz                   NNP     --              HD      504
tell                    VB      --              HD      503
Hans                    NNP     --              --      503
that                    IN      --              HD      502
Manfred                 NNP     --              HD      501
likes                   VB      --              HD      500
?                       ?       --              --      0
#500                    VP      --              --      502
#501                    NP      --              --      502
#502                    SBAR    --              --      503
#503                    VP      --              --      504
#504                    S       --              --      0
#EOS 1
";

pub const SAMPLE_BRACKETS: &str = "((S(WP Who)(VB did)(NNP Fritz)(VP(VB tell)(NNP Hans)\
(SBAR(IN that)(NP(NNP Manfred))(VP(VB likes)))))(? ?))";

pub const WORDS: [&str; 9] = [
    "Who", "did", "Fritz", "tell", "Hans", "that", "Manfred", "likes", "?",
];

pub const POS: [&str; 9] = ["WP", "VB", "NNP", "VB", "NNP", "IN", "NNP", "VB", "?"];

pub const DISCONT_LABELS_PREORDER: [&str; 15] = [
    "VROOT", "S", "VP", "SBAR", "VP", "WP", "VB", "IN", "NP", "NNP", "VB", "NNP", "VB", "NNP", "?",
];

pub const DISCONT_LABELS_BOYD_PREORDER: [&str; 18] = [
    "VROOT", "S", "VP", "SBAR", "VP", "WP", "VB", "NNP", "VP", "VB", "NNP", "SBAR", "IN", "NP",
    "NNP", "VP", "VB", "?",
];

pub const CONT_LABELS_PREORDER: [&str; 15] = [
    "VROOT", "S", "WP", "VB", "NNP", "VP", "VB", "NNP", "SBAR", "IN", "NP", "NNP", "VP", "VB", "?",
];

pub fn discont_tree() -> Tree {
    ExportReader::new(SAMPLE_EXPORT.as_bytes())
        .next()
        .unwrap()
        .unwrap()
}

pub fn cont_tree() -> Tree {
    BracketsReader::new(SAMPLE_BRACKETS.as_bytes(), BracketsReadOpts::default())
        .next()
        .unwrap()
        .unwrap()
}
