use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{stdin, BufReader, BufWriter};

use pcfg_cky::grammars::pcfg::rule_files::write_rule_files;
use pcfg_cky::model::corpus::read_corpus;
use pcfg_cky::util::tree::binarization::Markovization;
use pcfg_cky::{ModelConfig, ParserModel, UnaryStrategy};

pub fn get_sub_command() -> Command {
    Command::new("train")
        .about("Induces a PCFG from a treebank with one bracketed tree per line.")
        .arg(
            Arg::new("corpus")
                .index(1)
                .required(false)
                .help("Treebank file. Reads from stdin if not provided."),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .required(true)
                .value_name("MODEL")
                .help("File the trained model is written to."),
        )
        .arg(
            Arg::new("vertical")
                .long("vertical")
                .value_parser(value_parser!(usize))
                .default_value("0")
                .help("Number of ancestor tags kept by the binarization."),
        )
        .arg(
            Arg::new("horizontal")
                .long("horizontal")
                .value_parser(value_parser!(usize))
                .help("Number of sibling tags kept by the binarization (all if not provided)."),
        )
        .arg(
            Arg::new("precolate")
                .short('p')
                .long("precolate")
                .action(ArgAction::SetTrue)
                .help("Folds unary rules into the grammar instead of applying them while parsing."),
        )
        .arg(
            Arg::new("start")
                .short('s')
                .long("start")
                .default_value("S")
                .help("Tag of the sentence-level constituent."),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .default_value("TOP")
                .conflicts_with("no-root")
                .help("Tag of the virtual root above the start symbol in every tree."),
        )
        .arg(
            Arg::new("no-root")
                .long("no-root")
                .action(ArgAction::SetTrue)
                .help("The trees have no virtual root."),
        )
        .arg(
            Arg::new("unknown")
                .long("unknown")
                .default_value("NN")
                .help("Tag for tokens that were not seen during training."),
        )
        .arg(
            Arg::new("limit")
                .short('n')
                .long("limit")
                .value_parser(value_parser!(usize))
                .help("Only uses the first n trees."),
        )
        .arg(
            Arg::new("grammar-file")
                .long("grammar-file")
                .requires("lexicon-file")
                .help("Also writes the unary and syntactic rules to this file."),
        )
        .arg(
            Arg::new("lexicon-file")
                .long("lexicon-file")
                .requires("grammar-file")
                .help("Also writes the lexical rules to this file."),
        )
}

fn config(matches: &ArgMatches) -> ModelConfig {
    let defaults = ModelConfig::default();
    ModelConfig {
        markovization: Markovization::new(
            matches.get_one::<usize>("vertical").copied().unwrap_or(0),
            matches.get_one::<usize>("horizontal").copied(),
        ),
        unary_strategy: if matches.get_flag("precolate") {
            UnaryStrategy::Precolate
        } else {
            UnaryStrategy::InChart
        },
        start_symbol: matches
            .get_one::<String>("start")
            .cloned()
            .unwrap_or(defaults.start_symbol),
        root_tag: if matches.get_flag("no-root") {
            None
        } else {
            matches.get_one::<String>("root").cloned()
        },
        unknown_tag: matches
            .get_one::<String>("unknown")
            .cloned()
            .unwrap_or(defaults.unknown_tag),
        time_budget: None,
    }
}

pub fn handle_sub_matches(matches: &ArgMatches) -> Result<()> {
    let limit = matches.get_one::<usize>("limit").copied();
    let trees = match matches.get_one::<String>("corpus") {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("could not open corpus {}", path))?;
            read_corpus(BufReader::new(file), limit)?
        }
        None => read_corpus(stdin().lock(), limit)?,
    };

    let mut model = ParserModel::new(config(matches));
    model.train(trees)?;

    if let (Some(grammar_path), Some(lexicon_path)) = (
        matches.get_one::<String>("grammar-file"),
        matches.get_one::<String>("lexicon-file"),
    ) {
        let mut grammar_out = BufWriter::new(
            File::create(grammar_path).with_context(|| format!("could not create {}", grammar_path))?,
        );
        let mut lexicon_out = BufWriter::new(
            File::create(lexicon_path).with_context(|| format!("could not create {}", lexicon_path))?,
        );
        write_rule_files(model.grammar(), &mut grammar_out, &mut lexicon_out)?;
    }

    let output = matches
        .get_one::<String>("output")
        .context("no output file given")?;
    let file = File::create(output).with_context(|| format!("could not create model {}", output))?;
    model.save(BufWriter::new(file))?;
    Ok(())
}
