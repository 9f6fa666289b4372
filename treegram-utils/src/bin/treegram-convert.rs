#[macro_use]
extern crate failure;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use clap::{App, AppSettings, Arg};
use failure::Error;
use stdinout::{Input, OrExit, Output};

use treegram::analyze::{GapDegree, PosTags};
use treegram::grammar::{binarize, extract, Grammar, Lexicon, MarkovOpts, Reordering};
use treegram::io::{
    write_lexicon, write_pmcfg, write_rcg, BracketsOpts, BracketsReader, BracketsReadOpts,
    BracketsWriter, ExportOpts, ExportReader, ExportWriter, LabelOpts, LoparWriter, TigerXmlWriter,
};
use treegram::transform::default_punctuation;
use treegram::util::LabelSet;
use treegram::{Canonicalize, PunctuationOps, Tree, TreeOps, WriteTree};

fn main() {
    let matches = build().get_matches();

    let in_path = matches.value_of(INPUT).map(ToOwned::to_owned);
    let input = Input::from(in_path);
    let reader = BufReader::new(input.buf_read().or_exit("Can't open input reader.", 1));
    let in_format = matches.value_of(IN_FORMAT).unwrap();
    let trees = get_reader(in_format, reader);

    let transformations = matches
        .values_of(TRANSFORM)
        .map(|values| values.map(ToOwned::to_owned).collect::<Vec<_>>())
        .unwrap_or_default();
    let skip_malformed = matches.is_present(SKIP_MALFORMED);
    let punctuation = default_punctuation();

    if let Some(task) = matches.value_of(ANALYZE) {
        let mut gaps = GapDegree::new();
        let mut tags = PosTags::new();
        for tree in trees {
            let tree = match prepare(tree, &transformations, &punctuation, skip_malformed) {
                Some(tree) => tree,
                None => continue,
            };
            let result = match task {
                "gap_degree" => gaps.run(&tree),
                "pos_tags" => tags.run(&tree),
                _ => unreachable!(),
            };
            result.or_exit("Can't analyze tree.", 1);
        }
        match task {
            "gap_degree" => print!("{}", gaps.summary()),
            "pos_tags" => print!("{}", tags.summary()),
            _ => unreachable!(),
        }
    } else if let Some(gram_type) = matches.value_of(GRAMMAR) {
        let dest = matches
            .value_of(OUTPUT)
            .or_exit("Grammar extraction needs an output prefix.", 1);
        let markov = if matches.is_present(MARKOV) {
            let values = matches.values_of(MARKOV).unwrap();
            Some(parse_markov(values).or_exit("Can't parse markovization parameters.", 1))
        } else {
            None
        };
        let mut grammar = Grammar::new();
        let mut lexicon = Lexicon::new();
        for tree in trees {
            let tree = match prepare(tree, &transformations, &punctuation, skip_malformed) {
                Some(tree) => tree,
                None => continue,
            };
            extract(&tree, &mut grammar, &mut lexicon).or_exit("Can't extract grammar.", 1);
        }
        let grammar = match gram_type {
            "treebank" => grammar,
            "leftright" => binarize(&grammar, Reordering::LeftToRight, markov.as_ref())
                .or_exit("Can't binarize grammar.", 1),
            "optimal" => binarize(&grammar, Reordering::RuleOptimal, markov.as_ref())
                .or_exit("Can't binarize grammar.", 1),
            _ => unreachable!(),
        };
        let gram_format = matches.value_of(GRAMMAR_FORMAT).unwrap();
        write_grammar(gram_format, dest, &grammar, &lexicon)
            .or_exit("Can't write grammar.", 1);
    } else {
        let out_path = matches.value_of(OUTPUT).map(ToOwned::to_owned);
        let output = Output::from(out_path);
        let writer = output.write().or_exit("Can't open output writer.", 1);
        let out_format = matches.value_of(OUT_FORMAT).unwrap();
        let label_opts = LabelOpts {
            gf: matches.is_present(GF),
            mark_heads: matches.is_present(MARK_HEADS),
            split_marking: matches.is_present(SPLIT_MARKING),
            split_numbering: matches.is_present(SPLIT_NUMBERING),
            ..LabelOpts::default()
        };
        let mut sink =
            TreeSink::try_from_format(out_format, writer, label_opts).or_exit("Bad output.", 1);
        for tree in trees {
            let tree = match prepare(tree, &transformations, &punctuation, skip_malformed) {
                Some(tree) => tree,
                None => continue,
            };
            sink.write_tree(&tree).or_exit("Can't write to output.", 1);
        }
        sink.finish().or_exit("Can't write to output.", 1);
    }
}

// Read, transform, and on error either skip with a message or abort.
fn prepare(
    tree: Result<Tree, Error>,
    transformations: &[String],
    punctuation: &LabelSet,
    skip_malformed: bool,
) -> Option<Tree> {
    let result = tree.and_then(|mut tree| {
        for name in transformations {
            apply_transformation(&mut tree, name, punctuation)?;
        }
        Ok(tree)
    });
    match result {
        Ok(tree) => Some(tree),
        Err(err) => {
            if skip_malformed {
                eprintln!("skipping sentence: {}", err);
                None
            } else {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        }
    }
}

fn apply_transformation(tree: &mut Tree, name: &str, punctuation: &LabelSet) -> Result<(), Error> {
    match name {
        "root_attach" => tree.root_attach(),
        "mark_heads" => tree.negra_mark_heads(),
        "boyd_split" => tree.boyd_split(),
        "raising" => tree.raising(),
        "add_top" => tree.add_top_node(),
        "punct_delete" => tree.punctuation_delete(punctuation).map(|_| ()),
        "punct_lower" => tree.punctuation_lower(punctuation),
        "punct_root" => tree.punctuation_root(punctuation),
        _ => Err(format_err!("unknown transformation: {}", name)),
    }
}

fn parse_markov(values: clap::Values) -> Result<MarkovOpts, Error> {
    let mut opts = MarkovOpts::default();
    for value in values {
        if value == "nofanout" {
            opts.nofanout = true;
        } else if let Some(v) = value.strip_prefix("v:") {
            opts.v = v.parse()?;
        } else if let Some(h) = value.strip_prefix("h:") {
            opts.h = h.parse()?;
        } else {
            return Err(format_err!("unknown markovization parameter: {}", value));
        }
    }
    Ok(opts)
}

fn get_reader<'a, R>(in_format: &str, reader: BufReader<R>) -> Box<dyn Iterator<Item = Result<Tree, Error>> + 'a>
where
    R: BufRead + 'a,
{
    match in_format {
        "export" => Box::new(ExportReader::new(reader)),
        "brackets" => Box::new(BracketsReader::new(reader, BracketsReadOpts::default())),
        _ => unreachable!(),
    }
}

enum TreeSink<W> {
    Export(ExportWriter<W>),
    Brackets(BracketsWriter<W>),
    TigerXml(TigerXmlWriter<W>),
}

impl<W> TreeSink<W>
where
    W: Write,
{
    fn try_from_format(format: &str, writer: W, label: LabelOpts) -> Result<Self, Error> {
        match format {
            "export" => Ok(TreeSink::Export(ExportWriter::new(
                writer,
                ExportOpts {
                    four: false,
                    label,
                },
            ))),
            "brackets" => Ok(TreeSink::Brackets(BracketsWriter::new(
                writer,
                BracketsOpts {
                    empty_root: false,
                    label,
                },
            ))),
            "tigerxml" => {
                let mut inner = TigerXmlWriter::new(writer, label);
                inner.begin_document("utf-8")?;
                Ok(TreeSink::TigerXml(inner))
            }
            _ => Err(format_err!("unknown output format: {}", format)),
        }
    }

    fn write_tree(&mut self, tree: &Tree) -> Result<(), Error> {
        match self {
            TreeSink::Export(writer) => writer.write_tree(tree),
            TreeSink::Brackets(writer) => writer.write_tree(tree),
            TreeSink::TigerXml(writer) => writer.write_tree(tree),
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        if let TreeSink::TigerXml(writer) = self {
            writer.end_document()?;
        }
        Ok(())
    }
}

fn write_grammar(
    format: &str,
    dest: &str,
    grammar: &Grammar,
    lexicon: &Lexicon,
) -> Result<(), Error> {
    match format {
        "pmcfg" => {
            write_pmcfg(grammar, File::create(format!("{}.pmcfg", dest))?)?;
            write_lexicon(lexicon, File::create(format!("{}.lex", dest))?)?;
        }
        "rcg" => {
            write_rcg(grammar, File::create(format!("{}.rcg", dest))?)?;
            write_lexicon(lexicon, File::create(format!("{}.lex", dest))?)?;
        }
        "lopar" => {
            let mut writer = LoparWriter {
                gram: File::create(format!("{}.gram", dest))?,
                lex: File::create(format!("{}.lex", dest))?,
                start: File::create(format!("{}.start", dest))?,
                oc_lower: File::create(format!("{}.oc", dest))?,
                oc_upper: File::create(format!("{}.OC", dest))?,
            };
            writer.write(grammar, lexicon)?;
        }
        _ => return Err(format_err!("unknown grammar format: {}", format)),
    }
    Ok(())
}

static DEFAULT_CLAP_SETTINGS: &[AppSettings] = &[
    AppSettings::DontCollapseArgsInUsage,
    AppSettings::UnifiedHelpMessage,
];

static INPUT: &str = "INPUT";
static OUTPUT: &str = "OUTPUT";
static IN_FORMAT: &str = "IN_FORMAT";
static OUT_FORMAT: &str = "OUT_FORMAT";
static TRANSFORM: &str = "TRANSFORM";
static SKIP_MALFORMED: &str = "SKIP_MALFORMED";
static GRAMMAR: &str = "GRAMMAR";
static ANALYZE: &str = "ANALYZE";
static GRAMMAR_FORMAT: &str = "GRAMMAR_FORMAT";
static MARKOV: &str = "MARKOV";
static GF: &str = "GF";
static MARK_HEADS: &str = "MARK_HEADS";
static SPLIT_MARKING: &str = "SPLIT_MARKING";
static SPLIT_NUMBERING: &str = "SPLIT_NUMBERING";

fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("treegram-convert")
        .settings(DEFAULT_CLAP_SETTINGS)
        .version("0.1")
        .arg(
            Arg::with_name(INPUT)
                .long("input_file")
                .takes_value(true)
                .help("Input file, stdin if not present"),
        )
        .arg(
            Arg::with_name(IN_FORMAT)
                .long("input_format")
                .takes_value(true)
                .possible_values(&["export", "brackets"])
                .default_value("export")
                .help("Input format"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long("output_file")
                .takes_value(true)
                .help("Output file (prefix in grammar mode), stdout if not present"),
        )
        .arg(
            Arg::with_name(OUT_FORMAT)
                .long("output_format")
                .takes_value(true)
                .possible_values(&["export", "brackets", "tigerxml"])
                .default_value("export")
                .help("Output format"),
        )
        .arg(
            Arg::with_name(TRANSFORM)
                .long("transform")
                .takes_value(true)
                .multiple(true)
                .possible_values(&[
                    "root_attach",
                    "mark_heads",
                    "boyd_split",
                    "raising",
                    "add_top",
                    "punct_delete",
                    "punct_lower",
                    "punct_root",
                ])
                .help("Transformations to apply, in order"),
        )
        .arg(
            Arg::with_name(SKIP_MALFORMED)
                .long("skip_malformed")
                .help("Skip sentences that cannot be processed instead of aborting"),
        )
        .arg(
            Arg::with_name(ANALYZE)
                .long("analyze")
                .takes_value(true)
                .possible_values(&["gap_degree", "pos_tags"])
                .help("Print statistics over the input instead of writing trees"),
        )
        .arg(
            Arg::with_name(GRAMMAR)
                .long("grammar")
                .takes_value(true)
                .possible_values(&["treebank", "leftright", "optimal"])
                .help("Extract a grammar instead of writing trees"),
        )
        .arg(
            Arg::with_name(GRAMMAR_FORMAT)
                .long("grammar_format")
                .takes_value(true)
                .possible_values(&["pmcfg", "rcg", "lopar"])
                .default_value("pmcfg")
                .help("Grammar output format"),
        )
        .arg(
            Arg::with_name(MARKOV)
                .long("markov")
                .takes_value(true)
                .multiple(true)
                .help("Markovization parameters: v:N, h:N, nofanout"),
        )
        .arg(
            Arg::with_name(GF)
                .long("gf")
                .help("Append grammatical function labels to node labels"),
        )
        .arg(
            Arg::with_name(MARK_HEADS)
                .long("mark_heads_marking")
                .help("Mark head children in the output"),
        )
        .arg(
            Arg::with_name(SPLIT_MARKING)
                .long("split_marking")
                .help("Mark block-split nodes in the output"),
        )
        .arg(
            Arg::with_name(SPLIT_NUMBERING)
                .long("split_numbering")
                .help("Mark and number block-split nodes in the output"),
        )
}
