use clap::{Arg, ArgAction, Command};
use env_logger::Env;

mod corpus;
mod export;
mod parse;
mod train;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("pcfg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Treebank-induced PCFGs and probabilistic CKY parsing")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Logs debug information (overridden by RUST_LOG)."),
        )
        .subcommand_required(true)
        .subcommand(train::get_sub_command())
        .subcommand(parse::get_sub_command())
        .subcommand(export::get_sub_command())
        .subcommand(corpus::get_sub_command())
        .get_matches();

    let level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        Some(("train", train_matches)) => train::handle_sub_matches(train_matches),
        Some(("parse", parse_matches)) => parse::handle_sub_matches(parse_matches),
        Some(("export", export_matches)) => export::handle_sub_matches(export_matches),
        Some(("corpus", corpus_matches)) => corpus::handle_sub_matches(corpus_matches),
        _ => Ok(()),
    }
}
