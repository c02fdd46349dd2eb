//! Plain-text export of grammars.
//!
//! A grammar is written to two files, one line per rule:
//!
//! * the *grammar* file holds the unary and syntactic rules as
//!   `<count> <cost> <lhs> <rhs>…`, with terminals in double quotes and
//!   `"` or `\` inside them escaped by a backslash,
//! * the *lexicon* file holds the lexical rules as `<count> <cost> <lhs>
//!   <terminal>…`, with bare terminals.
//!
//! Rules are sorted, so equal grammars give equal files.

use log::info;
use nom::{
    bytes::complete::take_till1,
    character::complete::{digit1, space0, space1},
    combinator::{all_consuming, map, map_res},
    multi::many1,
    sequence::{preceded, terminated, tuple},
    IResult,
};
use std::io::{BufRead, Write};

use super::from_str::parse_symbol;
use super::{Grammar, Rule, RuleKind, RuleStats, Symbol, SymbolSeq};
use crate::error::{PcfgError, Result};
use crate::util::cost::Cost;

/// Writes `grammar` in the rule-file format, see the module documentation.
pub fn write_rule_files<G: Write, L: Write>(
    grammar: &Grammar,
    grammar_out: &mut G,
    lexicon_out: &mut L,
) -> Result<()> {
    let mut rules: Vec<(&Rule, &RuleStats)> = grammar
        .rules_of_kind(RuleKind::Unary)
        .chain(grammar.rules_of_kind(RuleKind::Syntactic))
        .collect();
    rules.sort_by(|a, b| a.0.cmp(b.0));
    for (rule, stats) in &rules {
        writeln!(grammar_out, "{} {} {}", stats.count, stats.cost, line_body(rule, false))?;
    }

    let mut entries: Vec<(&Rule, &RuleStats)> = grammar.rules_of_kind(RuleKind::Lexical).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (rule, stats) in &entries {
        writeln!(lexicon_out, "{} {} {}", stats.count, stats.cost, line_body(rule, true))?;
    }

    info!(
        "Wrote {} grammar rules and {} lexicon entries.",
        rules.len(),
        entries.len()
    );
    Ok(())
}

fn line_body(rule: &Rule, bare: bool) -> String {
    let mut body = rule.lhs.to_string();
    for symbol in rule.rhs.iter() {
        body.push(' ');
        if bare {
            body.push_str(symbol.text());
        } else {
            body.push_str(&symbol.to_string());
        }
    }
    body
}

fn parse_token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn parse_bare_terminal(input: &str) -> IResult<&str, Symbol> {
    map(parse_token, |t: &str| Symbol::terminal(t))(input)
}

fn parse_line(input: &str, lexicon: bool) -> IResult<&str, (usize, Cost, Rule)> {
    let rhs_symbol: fn(&str) -> IResult<&str, Symbol> = if lexicon {
        parse_bare_terminal
    } else {
        parse_symbol
    };
    map(
        all_consuming(terminated(
            tuple((
                map_res(digit1, str::parse::<usize>),
                preceded(space1, map_res(parse_token, str::parse::<Cost>)),
                preceded(space1, map(parse_token, |t: &str| Symbol::nonterminal(t))),
                many1(preceded(space1, rhs_symbol)),
            )),
            space0,
        )),
        |(count, cost, lhs, rhs)| {
            (
                count,
                cost,
                Rule::new(SymbolSeq::single(lhs), SymbolSeq::new(rhs)),
            )
        },
    )(input)
}

fn read_rules<R: BufRead>(grammar: &mut Grammar, reader: R, lexicon: bool) -> Result<usize> {
    let mut read = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (count, cost, rule) = match parse_line(trimmed, lexicon) {
            Ok((_, parsed)) => parsed,
            Err(_) => {
                return Err(PcfgError::RuleFile {
                    line: number + 1,
                    message: format!("malformed rule '{}'", trimmed),
                })
            }
        };
        if lexicon != rule.is_lexical() {
            return Err(PcfgError::RuleFile {
                line: number + 1,
                message: format!("'{}' does not belong into this file", rule),
            });
        }
        grammar.insert_with_stats(rule, RuleStats { count, cost });
        read += 1;
    }
    Ok(read)
}

impl Grammar {
    /// Reads a grammar written by `write_rule_files`. Rules with count 0
    /// can only stem from precolation, so a grammar containing any is
    /// considered precolated.
    pub fn from_rule_files<S, G, L>(start: S, grammar_in: G, lexicon_in: L) -> Result<Grammar>
    where
        S: Into<String>,
        G: BufRead,
        L: BufRead,
    {
        let mut grammar = Grammar::new(start);
        let rules = read_rules(&mut grammar, grammar_in, false)?;
        let entries = read_rules(&mut grammar, lexicon_in, true)?;
        grammar.mark_estimated();
        if grammar.rules().any(|(_, stats)| stats.count == 0) {
            grammar.mark_precolated();
        }
        info!("Read {} grammar rules and {} lexicon entries.", rules, entries);
        Ok(grammar)
    }
}
