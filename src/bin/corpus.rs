use anyhow::Result;
use clap::{value_parser, Arg, ArgMatches, Command};
use std::io::{stdin, stdout, BufWriter, Write};

use pcfg_cky::model::corpus::{filter_by_length, read_corpus, sentence_yield};

pub fn get_sub_command() -> Command {
    Command::new("corpus")
        .about("Utilities for treebanks with one bracketed tree per line.")
        .subcommand_required(true)
        .subcommand(
            Command::new("yield")
                .about("Reads trees from stdin and prints their sentences."),
        )
        .subcommand(
            Command::new("filter")
                .about("Reads trees from stdin and prints those within the length bounds.")
                .arg(
                    Arg::new("min")
                        .long("min")
                        .value_parser(value_parser!(usize))
                        .default_value("0")
                        .help("Minimal number of tokens."),
                )
                .arg(
                    Arg::new("max")
                        .long("max")
                        .value_parser(value_parser!(usize))
                        .help("Maximal number of tokens."),
                ),
        )
}

pub fn handle_sub_matches(matches: &ArgMatches) -> Result<()> {
    let trees = read_corpus(stdin().lock(), None)?;
    let out = stdout();
    let mut out = BufWriter::new(out.lock());
    match matches.subcommand() {
        Some(("yield", _)) => {
            for tree in &trees {
                writeln!(out, "{}", sentence_yield(tree).join(" "))?;
            }
        }
        Some(("filter", params)) => {
            let min = params.get_one::<usize>("min").copied().unwrap_or(0);
            let max = params.get_one::<usize>("max").copied();
            for tree in filter_by_length(trees, min, max) {
                writeln!(out, "{}", tree)?;
            }
        }
        _ => (),
    }
    out.flush()?;
    Ok(())
}
