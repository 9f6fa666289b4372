//! Grammar binarization.
//!
//! N-ary rules are rewritten into chains of binary rules over synthetic
//! nonterminals, optionally conditioned on vertical and horizontal context
//! (markovization). The right hand side can be binarized in its given
//! order or reordered rule-optimally first.

use failure::Error;

use crate::grammar::analysis::fan_out;
use crate::grammar::{
    default_context, Context, Function, Grammar, Linearization, DEFAULT_BINLABEL,
    DEFAULT_BINSUFFIX, MARKOV_HORIZONTAL_SEP, MARKOV_VERTICAL_SEP,
};
use crate::util::label_strip_fanout;
use crate::GrammarError;

/// How to order the right hand side before binarizing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reordering {
    /// Keep the right hand side in its original order.
    LeftToRight,
    /// Rule-optimal reordering: greedily pick the element whose removal
    /// from the linearization leaves the smallest fan-out, ties broken by
    /// the smaller total variable count, full ties resolved in favor of
    /// the leftmost candidate.
    ///
    /// This is a greedy local heuristic; it does not guarantee a minimal
    /// worst-case fan-out over the whole binarization chain.
    RuleOptimal,
}

/// Markovization parameters for synthetic binarization labels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MarkovOpts {
    /// Number of vertical context labels carried on a synthetic label.
    pub v: usize,
    /// Number of horizontal context labels carried on a synthetic label.
    pub h: usize,
    /// Strip fan-out digits from context labels. Counts of vertical
    /// contexts that collapse onto the same stripped labels are summed.
    pub nofanout: bool,
}

impl Default for MarkovOpts {
    fn default() -> Self {
        MarkovOpts {
            v: 1,
            h: 2,
            nofanout: false,
        }
    }
}

/// Substitution outcome for a single linearization reference.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinSubst {
    /// Keep the reference, recomputing its argument index.
    Keep,
    /// Point the reference at another element, recomputing the argument
    /// index.
    Replace(usize),
    /// Drop the reference, splitting the surrounding argument.
    Split,
}

/// Linearization vector substitution.
///
/// Builds a new linearization by mapping every reference through `sub`.
/// Argument indices are recomputed left to right per referenced element.
/// With `dedup`, a replacement is skipped when the previous reference in
/// the same argument already points at the same element. A `Split` ends
/// the current argument; empty arguments are dropped.
pub fn linsub<F>(lin: &Linearization, sub: F, dedup: bool) -> Linearization
where
    F: Fn(usize) -> LinSubst,
{
    let mut result = Vec::new();
    let mut argpos = std::collections::BTreeMap::new();
    for arg in lin {
        let mut repl: Vec<(usize, usize)> = Vec::new();
        for &(pos, _) in arg {
            match sub(pos) {
                LinSubst::Keep => {
                    let counter = argpos.entry(pos).or_insert(0);
                    repl.push((pos, *counter));
                    *counter += 1;
                }
                LinSubst::Replace(dest) => {
                    if dedup && repl.last().map(|&(p, _)| p) == Some(dest) {
                        continue;
                    }
                    let counter = argpos.entry(dest).or_insert(0);
                    repl.push((dest, *counter));
                    *counter += 1;
                }
                LinSubst::Split => {
                    if !repl.is_empty() {
                        result.push(repl.clone());
                        repl.clear();
                    }
                }
            }
        }
        if !repl.is_empty() {
            result.push(repl);
        }
    }
    result
}

// Collapse all references beyond the first element into a single
// placeholder at position 1, merging adjacent repeats.
fn collapse_tail(lin: &Linearization) -> Linearization {
    linsub(
        lin,
        |pos| {
            if pos > 0 {
                LinSubst::Replace(1)
            } else {
                LinSubst::Keep
            }
        },
        true,
    )
}

// Remove the first element from the linearization, shifting the remaining
// positions down by one and splitting arguments where it was referenced.
fn shift_out_first(lin: &Linearization) -> Linearization {
    linsub(
        lin,
        |pos| {
            if pos == 0 {
                LinSubst::Split
            } else {
                LinSubst::Replace(pos - 1)
            }
        },
        false,
    )
}

// Remove references to one element without renumbering the others; used to
// evaluate reordering candidates.
fn remove_position(lin: &Linearization, position: usize) -> Linearization {
    linsub(
        lin,
        |pos| {
            if pos == position {
                LinSubst::Split
            } else {
                LinSubst::Keep
            }
        },
        false,
    )
}

/// Rule-optimal reordering of a single rule.
///
/// Repeatedly choose, among the not yet placed right hand side elements,
/// the one whose removal from the linearization yields the smallest
/// remaining fan-out; ties are broken by the smaller total variable count,
/// remaining ties by the leftmost candidate. Returns the permuted function
/// and the linearization with its references remapped accordingly.
pub fn reorder_optimal(func: &Function, lin: &Linearization) -> (Function, Linearization) {
    let n = func.len().saturating_sub(1);
    if n <= 2 {
        return (func.clone(), lin.clone());
    }
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut order = Vec::with_capacity(n);
    let mut cur = lin.clone();
    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_key = (usize::MAX, usize::MAX);
        for (i, &candidate) in remaining.iter().enumerate() {
            let trial = remove_position(&cur, candidate);
            let variables = trial.iter().map(Vec::len).sum::<usize>();
            let key = (trial.len(), variables);
            if key < best_key {
                best_key = key;
                best = i;
            }
        }
        let chosen = remaining.remove(best);
        cur = remove_position(&cur, chosen);
        order.push(chosen);
    }
    let mut new_pos = vec![0; n];
    for (i, &pos) in order.iter().enumerate() {
        new_pos[pos] = i;
    }
    let mut new_func = Vec::with_capacity(func.len());
    new_func.push(func[0].clone());
    for &pos in &order {
        new_func.push(func[pos + 1].clone());
    }
    let new_lin = lin
        .iter()
        .map(|arg| arg.iter().map(|&(pos, idx)| (new_pos[pos], idx)).collect())
        .collect();
    (new_func, new_lin)
}

// Generator for synthetic binarization labels: a plain counter, or the
// markovized encoding of vertical and horizontal context.
enum LabelGen<'a> {
    Plain { n: usize },
    Markov { opts: &'a MarkovOpts },
}

impl<'a> LabelGen<'a> {
    fn next(&mut self, func: &Function, pos: usize, vert: &Context, fanout: &[usize]) -> String {
        match self {
            LabelGen::Plain { n } => {
                *n += 1;
                format!("{}{}{}", DEFAULT_BINLABEL, n, DEFAULT_BINSUFFIX)
            }
            LabelGen::Markov { opts } => {
                let mut label = String::from(DEFAULT_BINLABEL);
                for ancestor in vert.iter().take(opts.v) {
                    label.push_str(MARKOV_VERTICAL_SEP);
                    label.push_str(ancestor);
                }
                // walk backwards over the elements consumed so far
                let mut i = pos + 1;
                let mut cnt = 0;
                while i >= 1 && cnt < opts.h {
                    i -= 1;
                    cnt += 1;
                    label.push_str(MARKOV_HORIZONTAL_SEP);
                    label.push_str(&func[i + 1]);
                    if !opts.nofanout {
                        label.push_str(&fanout[i + 1].to_string());
                    }
                }
                label.push_str(DEFAULT_BINSUFFIX);
                label
            }
        }
    }
}

// Left-to-right binarization of a single rule. The count travels down the
// whole chain unchanged.
fn binarize_rule(
    func: &Function,
    lin: &Linearization,
    rule_cnt: usize,
    vert: &Context,
    labels: &mut LabelGen,
    result: &mut Grammar,
) {
    if func.len() - 1 <= 2 {
        result.add(func.clone(), lin.clone(), default_context(), rule_cnt);
        return;
    }
    let fanout = fan_out(lin);
    let mut this_lin = lin.clone();
    let sub_lin = collapse_tail(&this_lin);
    let mut bin_label = labels.next(func, 0, vert, &fanout);
    result.add(
        vec![func[0].clone(), func[1].clone(), bin_label.clone()],
        sub_lin,
        default_context(),
        rule_cnt,
    );
    for i in 1..func.len() - 3 {
        this_lin = shift_out_first(&this_lin);
        let sub_lin = collapse_tail(&this_lin);
        let next_label = labels.next(func, i, vert, &fanout);
        result.add(
            vec![bin_label.clone(), func[i + 1].clone(), next_label.clone()],
            sub_lin,
            default_context(),
            rule_cnt,
        );
        bin_label = next_label;
    }
    this_lin = shift_out_first(&this_lin);
    result.add(
        vec![
            bin_label,
            func[func.len() - 2].clone(),
            func[func.len() - 1].clone(),
        ],
        this_lin,
        default_context(),
        rule_cnt,
    );
}

// Reject rules whose linearization does not describe their right hand
// side.
fn validate_rule(func: &Function, lin: &Linearization) -> Result<(), Error> {
    if func.len() < 2 {
        return Err(GrammarError::MalformedRule {
            reason: format!("function {:?} has no right hand side", func),
        }
        .into());
    }
    let n = func.len() - 1;
    let mut argpos = vec![0usize; n];
    for arg in lin {
        for &(pos, idx) in arg {
            if pos >= n {
                return Err(GrammarError::MalformedRule {
                    reason: format!("reference to nonexistent element {} in {:?}", pos, func),
                }
                .into());
            }
            if idx != argpos[pos] {
                return Err(GrammarError::MalformedRule {
                    reason: format!(
                        "argument {} of element {} out of order in {:?}",
                        idx, pos, func
                    ),
                }
                .into());
            }
            argpos[pos] += 1;
        }
    }
    if let Some(unused) = argpos.iter().position(|&cnt| cnt == 0) {
        return Err(GrammarError::MalformedRule {
            reason: format!("element {} unused in linearization of {:?}", unused, func),
        }
        .into());
    }
    Ok(())
}

fn apply_reordering(
    reordering: Reordering,
    func: &Function,
    lin: &Linearization,
) -> (Function, Linearization) {
    match reordering {
        Reordering::LeftToRight => (func.clone(), lin.clone()),
        Reordering::RuleOptimal => reorder_optimal(func, lin),
    }
}

/// Binarize a grammar.
///
/// Rules of arity one and two are copied, longer rules are split into
/// chains of binary rules. Without markovization the synthetic labels are
/// numbered; with markovization they encode up to `v` vertical and `h`
/// horizontal context labels. Counts are accumulated by summation
/// throughout, so the total count of a rule is preserved along its chain
/// and collapsing `nofanout` contexts re-aggregates additively.
pub fn binarize(
    grammar: &Grammar,
    reordering: Reordering,
    markov: Option<&MarkovOpts>,
) -> Result<Grammar, Error> {
    let mut result = Grammar::new();
    match markov {
        Some(opts) => {
            let mut labels = LabelGen::Markov { opts };
            for (func, lins) in grammar.iter() {
                for (lin, verts) in lins {
                    validate_rule(func, lin)?;
                    // group contexts, stripping fan-outs when requested
                    let mut buckets: std::collections::BTreeMap<Context, usize> =
                        std::collections::BTreeMap::new();
                    for (vert, &count) in verts {
                        let key = if opts.nofanout {
                            vert.iter()
                                .map(|label| label_strip_fanout(label).to_owned())
                                .collect()
                        } else {
                            vert.clone()
                        };
                        *buckets.entry(key).or_insert(0) += count;
                    }
                    for (vert, count) in buckets {
                        let (func, lin) = apply_reordering(reordering, func, lin);
                        binarize_rule(&func, &lin, count, &vert, &mut labels, &mut result);
                    }
                }
            }
        }
        None => {
            let mut labels = LabelGen::Plain { n: 0 };
            let no_vert = Vec::new();
            for (func, lins) in grammar.iter() {
                for (lin, verts) in lins {
                    validate_rule(func, lin)?;
                    let rule_cnt = verts.values().sum();
                    let (func, lin) = apply_reordering(reordering, func, lin);
                    binarize_rule(&func, &lin, rule_cnt, &no_vert, &mut labels, &mut result);
                }
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::{binarize, linsub, reorder_optimal, LinSubst, MarkovOpts, Reordering};
    use crate::grammar::{default_context, extract, func, Grammar, Lexicon};
    use crate::testdata::{cont_tree, discont_tree};
    use crate::GrammarError;

    fn discont_grammar() -> Grammar {
        let tree = discont_tree();
        let mut grammar = Grammar::new();
        let mut lexicon = Lexicon::new();
        extract(&tree, &mut grammar, &mut lexicon).unwrap();
        grammar
    }

    fn cont_grammar() -> Grammar {
        let tree = cont_tree();
        let mut grammar = Grammar::new();
        let mut lexicon = Lexicon::new();
        extract(&tree, &mut grammar, &mut lexicon).unwrap();
        grammar
    }

    #[test]
    fn linsub_collapse() {
        // S -> VP VB NNP, discontinuous VP
        let lin = vec![vec![(0, 0), (1, 0), (2, 0), (0, 1)]];
        let collapsed = linsub(
            &lin,
            |pos| {
                if pos > 0 {
                    LinSubst::Replace(1)
                } else {
                    LinSubst::Keep
                }
            },
            true,
        );
        assert_eq!(collapsed, vec![vec![(0, 0), (1, 0), (0, 1)]]);

        let lin = vec![vec![(0, 0)], vec![(1, 0), (2, 0), (0, 1)]];
        let collapsed = linsub(
            &lin,
            |pos| {
                if pos > 0 {
                    LinSubst::Replace(1)
                } else {
                    LinSubst::Keep
                }
            },
            true,
        );
        assert_eq!(collapsed, vec![vec![(0, 0)], vec![(1, 0), (0, 1)]]);
    }

    #[test]
    fn linsub_split() {
        let lin = vec![vec![(0, 0), (1, 0), (2, 0), (0, 1)]];
        let shifted = linsub(
            &lin,
            |pos| {
                if pos == 0 {
                    LinSubst::Split
                } else {
                    LinSubst::Replace(pos - 1)
                }
            },
            false,
        );
        assert_eq!(shifted, vec![vec![(0, 0), (1, 0)]]);

        let lin = vec![vec![(0, 0)], vec![(1, 0), (2, 0), (0, 1)]];
        let shifted = linsub(
            &lin,
            |pos| {
                if pos == 0 {
                    LinSubst::Split
                } else {
                    LinSubst::Replace(pos - 1)
                }
            },
            false,
        );
        assert_eq!(shifted, vec![vec![(0, 0), (1, 0)]]);
    }

    #[test]
    fn binarized_arity_bound() {
        for grammar in &[cont_grammar(), discont_grammar()] {
            let binarized = binarize(grammar, Reordering::LeftToRight, None).unwrap();
            for (func, _) in binarized.iter() {
                assert!(func.len() - 1 <= 2, "arity violated: {:?}", func);
            }
        }
    }

    #[test]
    fn binarize_discont_left_right() {
        let binarized = binarize(&discont_grammar(), Reordering::LeftToRight, None).unwrap();
        let expected = vec![
            (func(&["NP", "NNP"]), vec![vec![(0, 0)]]),
            (
                func(&["S", "VP", "@1X"]),
                vec![vec![(0, 0), (1, 0), (0, 1)]],
            ),
            (func(&["@1X", "VB", "NNP"]), vec![vec![(0, 0), (1, 0)]]),
            (
                func(&["SBAR", "VP", "@2X"]),
                vec![vec![(0, 0)], vec![(1, 0), (0, 1)]],
            ),
            (func(&["@2X", "IN", "NP"]), vec![vec![(0, 0), (1, 0)]]),
            (
                func(&["VP", "SBAR", "@3X"]),
                vec![vec![(0, 0)], vec![(1, 0), (0, 1)]],
            ),
            (func(&["@3X", "VB", "NNP"]), vec![vec![(0, 0), (1, 0)]]),
            (func(&["VP", "WP", "VB"]), vec![vec![(0, 0)], vec![(1, 0)]]),
            (func(&["VROOT", "S", "?"]), vec![vec![(0, 0), (1, 0)]]),
        ];
        assert_eq!(binarized.n_functions(), expected.len());
        for (f, lin) in expected {
            let lins = binarized.get(&f).unwrap_or_else(|| panic!("missing {:?}", f));
            assert_eq!(lins[&lin][&default_context()], 1, "{:?}", f);
        }
    }

    #[test]
    fn binarize_cont_left_right() {
        let binarized = binarize(&cont_grammar(), Reordering::LeftToRight, None).unwrap();
        // S -> WP VB NNP VP yields a chain of three rules
        assert_eq!(binarized.n_functions(), 10);
        let binary = vec![vec![(0, 0), (1, 0)]];
        for f in &[
            func(&["S", "WP", "@1X"]),
            func(&["@1X", "VB", "@2X"]),
            func(&["@2X", "NNP", "VP"]),
            func(&["SBAR", "IN", "@3X"]),
            func(&["@3X", "NP", "VP"]),
            func(&["VP", "VB", "@4X"]),
            func(&["@4X", "NNP", "SBAR"]),
            func(&["VROOT", "S", "?"]),
        ] {
            let lins = binarized.get(f).unwrap_or_else(|| panic!("missing {:?}", f));
            assert_eq!(lins[&binary][&default_context()], 1);
        }
        for f in &[func(&["NP", "NNP"]), func(&["VP", "VB"])] {
            let lins = binarized.get(f).unwrap();
            assert_eq!(lins[&vec![vec![(0, 0)]]][&default_context()], 1);
        }
    }

    #[test]
    fn binarize_markov_v1_h2() {
        let binarized = binarize(
            &discont_grammar(),
            Reordering::LeftToRight,
            Some(&MarkovOpts {
                v: 1,
                h: 2,
                nofanout: false,
            }),
        )
        .unwrap();
        let mut expected = Grammar::new();
        let one_block = vec![vec![(0, 0), (1, 0)]];
        let split_tail = vec![vec![(0, 0)], vec![(1, 0), (0, 1)]];
        expected.add(
            func(&["S", "VP", "@^S1-VP2X"]),
            vec![vec![(0, 0), (1, 0), (0, 1)]],
            default_context(),
            1,
        );
        expected.add(
            func(&["@^S1-VP2X", "VB", "NNP"]),
            one_block.clone(),
            default_context(),
            1,
        );
        expected.add(
            func(&["SBAR", "VP", "@^SBAR2-VP2X"]),
            split_tail.clone(),
            default_context(),
            1,
        );
        expected.add(
            func(&["@^SBAR2-VP2X", "IN", "NP"]),
            one_block.clone(),
            default_context(),
            1,
        );
        expected.add(
            func(&["VP", "SBAR", "@^VP2-SBAR2X"]),
            split_tail.clone(),
            default_context(),
            1,
        );
        expected.add(
            func(&["@^VP2-SBAR2X", "VB", "NNP"]),
            one_block.clone(),
            default_context(),
            1,
        );
        expected.add(
            func(&["VP", "WP", "VB"]),
            vec![vec![(0, 0)], vec![(1, 0)]],
            default_context(),
            1,
        );
        expected.add(
            func(&["VROOT", "S", "?"]),
            one_block.clone(),
            default_context(),
            1,
        );
        expected.add(
            func(&["NP", "NNP"]),
            vec![vec![(0, 0)]],
            default_context(),
            1,
        );
        assert_eq!(binarized, expected);
    }

    #[test]
    fn binarize_markov_v2_h1() {
        let binarized = binarize(
            &discont_grammar(),
            Reordering::LeftToRight,
            Some(&MarkovOpts {
                v: 2,
                h: 1,
                nofanout: false,
            }),
        )
        .unwrap();
        // synthetic labels now carry two vertical context labels
        assert!(binarized.get(&func(&["S", "VP", "@^S1^VROOT1-VP2X"])).is_some());
        assert!(binarized
            .get(&func(&["@^S1^VROOT1-VP2X", "VB", "NNP"]))
            .is_some());
        assert!(binarized
            .get(&func(&["SBAR", "VP", "@^SBAR2^VP2-VP2X"]))
            .is_some());
        assert!(binarized
            .get(&func(&["@^SBAR2^VP2-VP2X", "IN", "NP"]))
            .is_some());
        assert!(binarized
            .get(&func(&["VP", "SBAR", "@^VP2^S1-SBAR2X"]))
            .is_some());
        assert!(binarized
            .get(&func(&["@^VP2^S1-SBAR2X", "VB", "NNP"]))
            .is_some());
        assert_eq!(binarized.n_functions(), 9);
    }

    #[test]
    fn count_conservation() {
        let mut grammar = Grammar::new();
        let f = func(&["S", "A", "B", "C", "D"]);
        let lin = vec![vec![(0, 0), (1, 0), (2, 0), (3, 0)]];
        grammar.add(f, lin, default_context(), 5);
        let binarized = binarize(&grammar, Reordering::LeftToRight, None).unwrap();
        assert_eq!(binarized.n_functions(), 3);
        for (func, lins) in binarized.iter() {
            for (_, verts) in lins {
                assert_eq!(verts.values().sum::<usize>(), 5, "count lost in {:?}", func);
            }
        }
    }

    #[test]
    fn nofanout_reaggregates() {
        let mut grammar = Grammar::new();
        let f = func(&["A", "B", "C", "D"]);
        let lin = vec![vec![(0, 0), (1, 0), (2, 0)]];
        grammar.add(
            f.clone(),
            lin.clone(),
            vec!["A2".to_owned(), "T1".to_owned()],
            2,
        );
        grammar.add(f, lin, vec!["A1".to_owned(), "T1".to_owned()], 3);
        let binarized = binarize(
            &grammar,
            Reordering::LeftToRight,
            Some(&MarkovOpts {
                v: 1,
                h: 1,
                nofanout: true,
            }),
        )
        .unwrap();
        // contexts collapse onto ("A", "T"); their counts sum to 5
        let lins = binarized.get(&func(&["A", "B", "@^A-BX"])).unwrap();
        let verts = lins.values().next().unwrap();
        assert_eq!(verts[&default_context()], 5);
        let lins = binarized.get(&func(&["@^A-BX", "C", "D"])).unwrap();
        let verts = lins.values().next().unwrap();
        assert_eq!(verts[&default_context()], 5);
    }

    #[test]
    fn optimal_reordering_single_rule() {
        // removing B first yields fan-out 1, then A, then C
        let f = func(&["X", "A", "B", "C"]);
        let lin = vec![vec![(1, 0)], vec![(0, 0), (2, 0), (0, 1)]];
        let (new_func, new_lin) = reorder_optimal(&f, &lin);
        assert_eq!(new_func, func(&["X", "B", "A", "C"]));
        assert_eq!(new_lin, vec![vec![(0, 0)], vec![(1, 0), (2, 0), (1, 1)]]);
    }

    #[test]
    fn optimal_matches_left_right_on_sample() {
        // for the sample grammar the greedy choice keeps the given order
        let grammar = discont_grammar();
        let optimal = binarize(&grammar, Reordering::RuleOptimal, None).unwrap();
        let left_right = binarize(&grammar, Reordering::LeftToRight, None).unwrap();
        assert_eq!(optimal, left_right);
    }

    #[test]
    fn malformed_rule_rejected() {
        let mut grammar = Grammar::new();
        grammar.add(
            func(&["A", "B"]),
            vec![vec![(0, 1)]],
            default_context(),
            1,
        );
        let err = binarize(&grammar, Reordering::LeftToRight, None).unwrap_err();
        assert!(err.downcast_ref::<GrammarError>().is_some());

        let mut grammar = Grammar::new();
        grammar.add(
            func(&["A", "B"]),
            vec![vec![(2, 0)]],
            default_context(),
            1,
        );
        assert!(binarize(&grammar, Reordering::LeftToRight, None).is_err());
    }
}
