use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_till1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, value, verify},
    multi::{many0, many1},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use std::str::FromStr;

use super::{Rule, Symbol, SymbolSeq};
use crate::error::PcfgError;

/// Reads rules like `S → NP VP` or `NN -> "dog"`, where quoted symbols are
/// terminals. Inside quotes, `\"` and `\\` stand for `"` and `\`.
impl FromStr for Rule {
    type Err = PcfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(delimited(multispace0, parse_rule, multispace0))(s) {
            Ok((_, rule)) => Ok(rule),
            Err(_) => Err(PcfgError::RuleSyntax {
                input: s.to_string(),
            }),
        }
    }
}

impl FromStr for Symbol {
    type Err = PcfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match all_consuming(parse_symbol)(s) {
            Ok((_, symbol)) => Ok(symbol),
            Err(_) => Err(PcfgError::RuleSyntax {
                input: s.to_string(),
            }),
        }
    }
}

fn is_arrow(token: &str) -> bool {
    token == "→" || token == "->"
}

fn parse_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        verify(
            escaped_transform(
                is_not("\"\\"),
                '\\',
                alt((value("\"", tag("\"")), value("\\", tag("\\")))),
            ),
            |t: &str| !t.is_empty(),
        ),
        char('"'),
    )(input)
}

pub(super) fn parse_symbol(input: &str) -> IResult<&str, Symbol> {
    alt((
        map(parse_quoted, Symbol::terminal),
        map(
            verify(take_till1(|c: char| c.is_whitespace()), |t: &str| {
                !is_arrow(t) && !t.starts_with('"')
            }),
            |t: &str| Symbol::nonterminal(t),
        ),
    ))(input)
}

fn parse_rule(input: &str) -> IResult<&str, Rule> {
    map(
        tuple((
            many1(terminated(parse_symbol, multispace0)),
            alt((tag("→"), tag("->"))),
            many0(preceded(multispace0, parse_symbol)),
        )),
        |(lhs, _, rhs)| Rule::new(SymbolSeq::new(lhs), SymbolSeq::new(rhs)),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_rules() {
        let rule: Rule = "S → NP VP".parse().unwrap();
        assert_eq!(
            rule,
            Rule::new(
                SymbolSeq::single(Symbol::nonterminal("S")),
                vec![Symbol::nonterminal("NP"), Symbol::nonterminal("VP")].into(),
            )
        );
        assert_eq!(rule, "  S -> NP   VP ".parse::<Rule>().unwrap());

        let rule: Rule = "NP → \"the\" NN".parse().unwrap();
        assert_eq!(
            rule.rhs.to_vec(),
            vec![Symbol::terminal("the"), Symbol::nonterminal("NN")]
        );

        let rule: Rule = "X →".parse().unwrap();
        assert!(rule.rhs.is_empty());
    }

    #[test]
    fn display_is_readable_again() {
        for s in &["S → NP VP", "NN → \"dog\"", "S^VP*NP → \"a\" NP-SBJ", "A B → C"] {
            let rule: Rule = s.parse().unwrap();
            assert_eq!(&rule.to_string(), s);
        }
    }

    #[test]
    fn symbols() {
        assert_eq!(Symbol::terminal("a b"), "\"a b\"".parse::<Symbol>().unwrap());
        assert_eq!(Symbol::nonterminal("NP"), "NP".parse::<Symbol>().unwrap());
        assert!("NP VP".parse::<Symbol>().is_err());
        assert!("".parse::<Symbol>().is_err());
        assert!("\"\"".parse::<Symbol>().is_err());
    }

    #[test]
    fn escaped_terminals() {
        for text in &["\"", "\\", "say \"hi\"", "a\\\"b"] {
            let symbol = Symbol::terminal(*text);
            assert_eq!(symbol, symbol.to_string().parse::<Symbol>().unwrap(), "{}", symbol);
        }
        assert_eq!(Symbol::terminal("\"").to_string(), "\"\\\"\"");
        assert_eq!(
            "S → \"\\\"\" NP".parse::<Rule>().unwrap().rhs.to_vec(),
            vec![Symbol::terminal("\""), Symbol::nonterminal("NP")]
        );
        assert!("\"a\\\"".parse::<Symbol>().is_err());
        assert!("\"a\\x\"".parse::<Symbol>().is_err());
    }

    #[test]
    fn illegal_rules() {
        for input in &["", "S", "→ NP", "S → \"unclosed", "S → \"\"\"", "S NP VP"] {
            assert!(
                input.parse::<Rule>().is_err(),
                "could parse illegal rule '{}'",
                input
            );
        }
    }
}
