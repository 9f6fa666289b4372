use std::fmt;
use std::mem;

/// Annotations added by tree transformations.
///
/// Head marking sets `head` on every child of an internal node. Block
/// splitting sets `split` and `head_block` on every node and `block_number`
/// on the nodes it introduces. Raising reads all three. Fields start out
/// unset so that a stage can detect that its prerequisite was skipped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Marks {
    pub head: Option<bool>,
    pub split: Option<bool>,
    pub head_block: Option<bool>,
    pub block_number: Option<usize>,
}

/// Enum representing nodes in a constituency tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    /// Nonterminal node.
    NonTerminal(NonTerminal),
    /// Terminal node.
    Terminal(Terminal),
}

impl Node {
    /// Returns whether `self` is a `Terminal`.
    pub fn is_terminal(&self) -> bool {
        match self {
            Node::Terminal(_) => true,
            Node::NonTerminal(_) => false,
        }
    }

    /// Get a `Option<&Terminal>`.
    ///
    /// Returns `None` if `self` is a `Node::NonTerminal`.
    pub fn terminal(&self) -> Option<&Terminal> {
        match self {
            Node::Terminal(ref terminal) => Some(terminal),
            Node::NonTerminal(_) => None,
        }
    }

    /// Get a `Option<&mut Terminal>`.
    pub fn terminal_mut(&mut self) -> Option<&mut Terminal> {
        match self {
            Node::Terminal(ref mut terminal) => Some(terminal),
            Node::NonTerminal(_) => None,
        }
    }

    /// Get a `Option<&NonTerminal>`.
    ///
    /// Returns `None` if `self` is a `Node::Terminal`.
    pub fn nonterminal(&self) -> Option<&NonTerminal> {
        match self {
            Node::NonTerminal(ref inner) => Some(inner),
            Node::Terminal(_) => None,
        }
    }

    /// Get a `Option<&mut NonTerminal>`.
    pub fn nonterminal_mut(&mut self) -> Option<&mut NonTerminal> {
        match self {
            Node::NonTerminal(ref mut inner) => Some(inner),
            Node::Terminal(_) => None,
        }
    }

    /// Get the node's label.
    ///
    /// Returns the part-of-speech for `Terminal`s and the category for
    /// `NonTerminal`s.
    pub fn label(&self) -> &str {
        match self {
            Node::NonTerminal(nt) => nt.label(),
            Node::Terminal(t) => t.label(),
        }
    }

    /// Set the node's label, returning the replaced label.
    pub fn set_label(&mut self, s: impl Into<String>) -> String {
        match self {
            Node::NonTerminal(nt) => nt.set_label(s),
            Node::Terminal(t) => t.set_label(s),
        }
    }

    /// Get the transformation marks of this node.
    pub fn marks(&self) -> &Marks {
        match self {
            Node::NonTerminal(nt) => &nt.marks,
            Node::Terminal(t) => &t.marks,
        }
    }

    /// Get the transformation marks of this node mutably.
    pub fn marks_mut(&mut self) -> &mut Marks {
        match self {
            Node::NonTerminal(nt) => &mut nt.marks,
            Node::Terminal(t) => &mut t.marks,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Terminal(terminal) => write!(f, "{}", terminal),
            Node::NonTerminal(nt) => write!(f, "{}", nt),
        }
    }
}

/// Struct representing a nonterminal tree node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NonTerminal {
    label: String,
    pub(crate) marks: Marks,
}

impl NonTerminal {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        NonTerminal {
            label: label.into(),
            marks: Marks::default(),
        }
    }

    /// Return the label of the `NonTerminal`.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Return old label and replace with `label`.
    pub fn set_label(&mut self, label: impl Into<String>) -> String {
        mem::replace(&mut self.label, label.into())
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Struct representing a terminal.
///
/// `Terminal`s are represented by:
/// * `form` - word form
/// * `pos` - part of speech tag
/// * `lemma` - (optional) lemma
/// * `morph` - (optional) morphological features
/// * `num` - 1-based position in the sentence
///
/// `num` is the ordering key for everything: children are ordered by the
/// smallest `num` they dominate, and a constituent is discontinuous iff the
/// `num`s below it are not consecutive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Terminal {
    form: String,
    pos: String,
    lemma: Option<String>,
    morph: Option<String>,
    num: usize,
    pub(crate) marks: Marks,
}

impl Terminal {
    pub(crate) fn new(form: impl Into<String>, pos: impl Into<String>, num: usize) -> Self {
        Terminal {
            form: form.into(),
            pos: pos.into(),
            lemma: None,
            morph: None,
            num,
            marks: Marks::default(),
        }
    }

    /// Return the `Terminal`'s position in the sentence.
    pub fn num(&self) -> usize {
        self.num
    }

    pub(crate) fn set_num(&mut self, num: usize) -> usize {
        mem::replace(&mut self.num, num)
    }

    /// Return the `Terminal`'s form.
    pub fn form(&self) -> &str {
        self.form.as_str()
    }

    /// Replace form with `new_form`. Return old value.
    pub fn set_form(&mut self, new_form: impl Into<String>) -> String {
        mem::replace(&mut self.form, new_form.into())
    }

    /// Return part of speech.
    pub fn label(&self) -> &str {
        self.pos.as_str()
    }

    /// Replace part of speech with `new_pos`. Return old value.
    pub fn set_label(&mut self, new_pos: impl Into<String>) -> String {
        mem::replace(&mut self.pos, new_pos.into())
    }

    /// Return lemma if present, else `None`.
    pub fn lemma(&self) -> Option<&str> {
        self.lemma.as_ref().map(String::as_str)
    }

    /// Replace lemma with `new_lemma`. Return old value.
    pub fn set_lemma(&mut self, new_lemma: Option<impl Into<String>>) -> Option<String> {
        mem::replace(&mut self.lemma, new_lemma.map(Into::into))
    }

    /// Return morphological features if present, else `None`.
    pub fn morph(&self) -> Option<&str> {
        self.morph.as_ref().map(String::as_str)
    }

    /// Replace morphological features with `new_morph`. Return old value.
    pub fn set_morph(&mut self, new_morph: Option<impl Into<String>>) -> Option<String> {
        mem::replace(&mut self.morph, new_morph.map(Into::into))
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.pos, self.form)
    }
}
