use failure::Fail;

/// Structural and precondition errors on trees.
///
/// Structural violations are fatal for the tree being processed; the driver
/// decides whether to abort or to skip the sentence. Precondition violations
/// indicate that a transformation was applied out of order.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum TreeError {
    /// A nonterminal dominates no terminal, so it cannot be ordered.
    #[fail(display = "node '{}' dominates no terminals", label)]
    NoTerminals { label: String },
    /// A terminal operation was invoked on a nonterminal.
    #[fail(display = "node '{}' is not a terminal", label)]
    NotATerminal { label: String },
    /// Deleting the last remaining terminal would leave an empty tree.
    #[fail(display = "cannot delete the only terminal of a tree")]
    LastTerminal,
    /// Terminal position out of bounds for insertion.
    #[fail(display = "terminal position {} out of bounds (1..={})", num, max)]
    PositionOutOfBounds { num: usize, max: usize },
    /// Block splitting requires a previous application of head marking.
    #[fail(display = "heads must be marked before splitting into blocks")]
    HeadsNotMarked,
    /// Raising requires a previous application of block splitting.
    #[fail(display = "blocks must be split before raising")]
    NotSplit,
    /// Crossing branches at the root cannot be resolved by splitting.
    #[fail(display = "crossing branches at the root cannot be resolved")]
    CrossingRoot,
    /// Malformed input for a single sentence.
    #[fail(display = "sentence {}: {}", sid, reason)]
    Malformed { sid: usize, reason: String },
}

/// Errors on grammars.
#[derive(Clone, Debug, Eq, Fail, PartialEq)]
pub enum GrammarError {
    /// A context-free-only operation was applied to a grammar with fan-out
    /// greater than one.
    #[fail(display = "grammar is not context-free")]
    NotContextFree,
    /// A rule whose linearization does not describe its right hand side.
    #[fail(display = "malformed rule: {}", reason)]
    MalformedRule { reason: String },
}
