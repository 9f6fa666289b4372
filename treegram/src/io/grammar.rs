//! Grammar serialization.
//!
//! Three output formats: PMCFG with shared linearization definitions, the
//! rparse RCG format with a count field, and LoPar for grammars that are
//! plain PCFGs. RCG is also readable, which allows round-tripping a
//! grammar through its serialized form.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use failure::Error;

use crate::grammar::{default_context, is_contextfree, Grammar, Lexicon, Linearization};
use crate::util::label_strip_fanout;
use crate::GrammarError;

/// Write a grammar in PMCFG format.
///
/// Every rule is written as three lines: the bare production, the
/// linearization as references to shared sequence definitions, and the
/// count. The sequence definitions follow, one per distinct argument.
pub fn write_pmcfg<W>(grammar: &Grammar, mut dest: W) -> Result<(), Error>
where
    W: Write,
{
    let mut lindef_ids: BTreeMap<Vec<(usize, usize)>, usize> = BTreeMap::new();
    let mut lindefs = Vec::new();
    let mut func_id = 0;
    for (func, lins) in grammar.iter() {
        for (lin, verts) in lins {
            func_id += 1;
            let count = verts.values().sum::<usize>();
            writeln!(
                dest,
                "fun{} : {} <- {}",
                func_id,
                func[0],
                func[1..].join(" ")
            )?;
            let mut refs = Vec::new();
            for arg in lin {
                let next_id = lindef_ids.len() + 1;
                let id = *lindef_ids.entry(arg.clone()).or_insert(next_id);
                if id == next_id {
                    lindefs.push(arg.clone());
                }
                refs.push(format!("s{}", id));
            }
            writeln!(dest, "fun{} = {}", func_id, refs.join(" "))?;
            writeln!(dest, "fun{} {}", func_id, count)?;
        }
    }
    for (id, arg) in lindefs.iter().enumerate() {
        let pairs = arg
            .iter()
            .map(|&(pos, idx)| format!("{}:{}", pos, idx))
            .collect::<Vec<_>>();
        writeln!(dest, "s{} -> {}", id + 1, pairs.join(" "))?;
    }
    Ok(())
}

/// Write a grammar in rparse RCG format with a count field.
///
/// Every nonterminal is annotated with its fan-out; left hand side
/// arguments concatenate variables, right hand side predicates list the
/// variables of their argument spans.
pub fn write_rcg<W>(grammar: &Grammar, mut dest: W) -> Result<(), Error>
where
    W: Write,
{
    for (func, lins) in grammar.iter() {
        for (lin, verts) in lins {
            let count = verts.values().sum::<usize>();
            let mut var = 0;
            let mut lhs_args = Vec::new();
            let mut rhs_vars: BTreeMap<usize, BTreeMap<usize, usize>> = BTreeMap::new();
            for arg in lin {
                let mut lhs_arg = String::new();
                for &(pos, idx) in arg {
                    lhs_arg.push_str(&format!("[{}]", var));
                    rhs_vars.entry(pos).or_insert_with(BTreeMap::new).insert(idx, var);
                    var += 1;
                }
                lhs_args.push(lhs_arg);
            }
            let lhs = format!("{}{}({})", func[0], lin.len(), lhs_args.join(","));
            let mut rhs = Vec::new();
            for (i, label) in func[1..].iter().enumerate() {
                let vars = rhs_vars.get(&i).cloned().unwrap_or_default();
                let args = vars
                    .values()
                    .map(|v| format!("[{}]", v))
                    .collect::<Vec<_>>();
                rhs.push(format!("{}{}({})", label, args.len(), args.join(",")));
            }
            writeln!(dest, "C:{} {} --> {}", count, lhs, rhs.join(" "))?;
        }
    }
    Ok(())
}

/// Write a lexicon, one form per line with its tag counts.
pub fn write_lexicon<W>(lexicon: &Lexicon, mut dest: W) -> Result<(), Error>
where
    W: Write,
{
    for (form, tags) in lexicon.iter() {
        let tags = tags
            .iter()
            .map(|(tag, count)| format!("{} {}", tag, count))
            .collect::<Vec<_>>();
        writeln!(dest, "{}\t{}", form, tags.join(" "))?;
    }
    Ok(())
}

/// Writer for the LoPar format.
///
/// LoPar is a PCFG format; writing fails with
/// `GrammarError::NotContextFree` for grammars with fan-out greater than
/// one. Besides rules and lexicon, start symbol counts and open class
/// lists for lower and upper case words are emitted.
pub struct LoparWriter<W> {
    pub gram: W,
    pub lex: W,
    pub start: W,
    pub oc_lower: W,
    pub oc_upper: W,
}

impl<W> LoparWriter<W>
where
    W: Write,
{
    pub fn write(&mut self, grammar: &Grammar, lexicon: &Lexicon) -> Result<(), Error> {
        if !is_contextfree(grammar) {
            return Err(GrammarError::NotContextFree.into());
        }
        // start symbols: categories never used on a right hand side
        let mut start_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for (func, _) in grammar.iter() {
            start_counts.entry(&func[0]).or_insert(0);
        }
        for (func, _) in grammar.iter() {
            for label in &func[1..] {
                start_counts.remove(label.as_str());
            }
        }
        for (func, lins) in grammar.iter() {
            for (_, verts) in lins {
                let count = verts.values().sum::<usize>();
                if let Some(start) = start_counts.get_mut(func[0].as_str()) {
                    *start += count;
                }
                writeln!(self.gram, "{} {} {}", count, func[0], func[1..].join(" "))?;
            }
        }
        let mut oc_lower: BTreeMap<&str, usize> = BTreeMap::new();
        let mut oc_upper: BTreeMap<&str, usize> = BTreeMap::new();
        for (form, tags) in lexicon.iter() {
            let upper = form.chars().next().map(char::is_uppercase).unwrap_or(false);
            for (tag, &count) in tags {
                let oc = if upper { &mut oc_upper } else { &mut oc_lower };
                *oc.entry(tag).or_insert(0) += count;
            }
        }
        write_lexicon(lexicon, &mut self.lex)?;
        for (symbol, count) in &start_counts {
            writeln!(self.start, "{} {}", symbol, count)?;
        }
        for (tag, count) in &oc_lower {
            writeln!(self.oc_lower, "{} {}", tag, count)?;
        }
        for (tag, count) in &oc_upper {
            writeln!(self.oc_upper, "{} {}", tag, count)?;
        }
        Ok(())
    }
}

/// Read a grammar in rparse RCG format.
///
/// The serialized format carries no vertical contexts; all counts land in
/// the single default context bucket.
pub fn read_rcg<R>(reader: R) -> Result<Grammar, Error>
where
    R: BufRead,
{
    let mut grammar = Grammar::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() < 4 || tokens[2] != "-->" {
            return Err(GrammarError::MalformedRule {
                reason: format!("cannot parse rule: {}", line),
            }
            .into());
        }
        let count = tokens[0]
            .splitn(2, ':')
            .nth(1)
            .and_then(|c| c.parse::<usize>().ok())
            .ok_or_else(|| GrammarError::MalformedRule {
                reason: format!("cannot parse count: {}", tokens[0]),
            })?;
        let mut func = Vec::new();
        let mut raw_args = Vec::new();
        for pred in std::iter::once(&tokens[1]).chain(tokens[3..].iter()) {
            let paren = pred.find('(').ok_or_else(|| GrammarError::MalformedRule {
                reason: format!("predicate without arguments: {}", pred),
            })?;
            func.push(label_strip_fanout(&pred[..paren]).to_owned());
            raw_args.push(pred[paren + 1..pred.len() - 1].to_owned());
        }
        // match left hand side variables against the argument spans of the
        // right hand side predicates, in order
        let mut rhs_pos = vec![0usize; raw_args.len() - 1];
        let mut lin: Linearization = Vec::new();
        for lhs_arg in raw_args[0].split(',') {
            let mut arg = Vec::new();
            for lhs_var in lhs_arg
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split("][")
            {
                for (i, rhs_pred) in raw_args[1..].iter().enumerate() {
                    let rhs_args = rhs_pred.split(',').collect::<Vec<_>>();
                    if rhs_pos[i] == rhs_args.len() {
                        continue;
                    }
                    let rhs_var = rhs_args[rhs_pos[i]]
                        .trim_start_matches('[')
                        .trim_end_matches(']');
                    if rhs_var == lhs_var {
                        arg.push((i, rhs_pos[i]));
                        rhs_pos[i] += 1;
                        break;
                    }
                }
            }
            lin.push(arg);
        }
        grammar.add(func, lin, default_context(), count);
    }
    Ok(grammar)
}

/// Read a lexicon as written by `write_lexicon`.
pub fn read_rcg_lexicon<R>(reader: R) -> Result<Lexicon, Error>
where
    R: BufRead,
{
    let mut lexicon = Lexicon::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let form = tokens
            .next()
            .ok_or_else(|| format_err!("empty lexicon line"))?;
        let rest = tokens.collect::<Vec<_>>();
        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(format_err!("cannot parse lexicon line: {}", line));
        }
        for pair in rest.chunks(2) {
            let count = pair[1].parse::<usize>()?;
            lexicon.add_count(form, pair[0], count);
        }
    }
    Ok(lexicon)
}
