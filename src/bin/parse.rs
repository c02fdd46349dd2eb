use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use std::fs::File;
use std::io::{stdin, stdout, BufReader, BufWriter, Write};
use std::time::Duration;

use pcfg_cky::model::corpus::read_sentences;
use pcfg_cky::ParserModel;

pub fn get_sub_command() -> Command {
    Command::new("parse")
        .about(
            "Reads sentences from stdin, one per line with whitespace-separated tokens, \
             and prints their best parse trees. Sentences without a parse yield an empty line.",
        )
        .arg(
            Arg::new("model")
                .index(1)
                .required(true)
                .help("File with a model created by `pcfg train`."),
        )
        .arg(
            Arg::new("budget")
                .short('b')
                .long("budget-ms")
                .value_parser(value_parser!(u64))
                .help("Gives up on sentences that take longer than this many milliseconds."),
        )
}

pub fn handle_sub_matches(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("model")
        .context("no model given")?;
    let file = File::open(path).with_context(|| format!("could not open model {}", path))?;
    let model = ParserModel::load(BufReader::new(file))
        .with_context(|| format!("could not read model {}", path))?;
    let model = match matches.get_one::<u64>("budget") {
        Some(&millis) => model.with_time_budget(Some(Duration::from_millis(millis))),
        None => model,
    };

    let sentences = read_sentences(stdin().lock())?;
    let out = stdout();
    let mut sink = BufWriter::new(out.lock());
    model.parse_batch(sentences, &mut sink)?;
    sink.flush()?;
    Ok(())
}
