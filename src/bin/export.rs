use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::fs::File;
use std::io::{BufReader, BufWriter};

use pcfg_cky::grammars::pcfg::rule_files::write_rule_files;
use pcfg_cky::ParserModel;

pub fn get_sub_command() -> Command {
    Command::new("export")
        .about("Writes the rules of a model as plain-text grammar and lexicon files.")
        .arg(Arg::new("model").index(1).required(true).help("Model file."))
        .arg(
            Arg::new("grammar-file")
                .index(2)
                .required(true)
                .help("Output for unary and syntactic rules."),
        )
        .arg(
            Arg::new("lexicon-file")
                .index(3)
                .required(true)
                .help("Output for lexical rules."),
        )
}

pub fn handle_sub_matches(matches: &ArgMatches) -> Result<()> {
    let get = |name: &str| {
        matches
            .get_one::<String>(name)
            .with_context(|| format!("missing argument {}", name))
    };
    let model_path = get("model")?;
    let model = ParserModel::load(BufReader::new(
        File::open(model_path).with_context(|| format!("could not open model {}", model_path))?,
    ))?;

    let grammar_path = get("grammar-file")?;
    let lexicon_path = get("lexicon-file")?;
    let mut grammar_out = BufWriter::new(
        File::create(grammar_path).with_context(|| format!("could not create {}", grammar_path))?,
    );
    let mut lexicon_out = BufWriter::new(
        File::create(lexicon_path).with_context(|| format!("could not create {}", lexicon_path))?,
    );
    write_rule_files(model.grammar(), &mut grammar_out, &mut lexicon_out)?;
    Ok(())
}
