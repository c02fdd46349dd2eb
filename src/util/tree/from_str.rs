use nom::{
    branch::alt,
    bytes::complete::take_till1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, value},
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};
use std::str::FromStr;

use super::ParseNode;
use crate::error::PcfgError;

/// Reads bracket notation. Nesting is resolved with an explicit stack, so the
/// depth of the input is not bounded by the call stack.
impl FromStr for ParseNode {
    type Err = PcfgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tree = match all_consuming(terminated(many0(preceded(multispace0, lexeme)), multispace0))(s) {
            Ok((_, lexemes)) => assemble(lexemes),
            Err(_) => None,
        };
        tree.ok_or_else(|| PcfgError::TreeSyntax {
            input: s.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme<'a> {
    Open,
    Close,
    Token(&'a str),
}

/// Parses a tag or a token, i.e. anything up to whitespace or a bracket.
fn parse_token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace() || c == '(' || c == ')')(input)
}

fn lexeme(input: &str) -> IResult<&str, Lexeme> {
    alt((
        value(Lexeme::Open, char('(')),
        value(Lexeme::Close, char(')')),
        map(parse_token, Lexeme::Token),
    ))(input)
}

/// Builds the single tree described by `lexemes`: either one token or
/// `( tag tree+ )`.
fn assemble(lexemes: Vec<Lexeme>) -> Option<ParseNode> {
    let mut open: Vec<(&str, Vec<ParseNode>)> = Vec::new();
    let mut tree = None;
    let mut lexemes = lexemes.into_iter();

    while let Some(lexeme) = lexemes.next() {
        if tree.is_some() {
            return None;
        }
        let complete = match lexeme {
            Lexeme::Open => match lexemes.next() {
                Some(Lexeme::Token(tag)) => {
                    open.push((tag, Vec::new()));
                    continue;
                }
                _ => return None,
            },
            Lexeme::Close => match open.pop() {
                Some((tag, children)) if !children.is_empty() => ParseNode::node(tag, children),
                _ => return None,
            },
            Lexeme::Token(token) => ParseNode::leaf(token),
        };
        match open.last_mut() {
            Some((_, children)) => children.push(complete),
            None => tree = Some(complete),
        }
    }

    if open.is_empty() {
        tree
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_input() {
        let tree: ParseNode = "(S (NP (DT the) (NN dog)) (VP barks))".parse().unwrap();
        assert_eq!(
            tree,
            ParseNode::node(
                "S",
                vec![
                    ParseNode::node(
                        "NP",
                        vec![
                            ParseNode::node("DT", vec![ParseNode::leaf("the")]),
                            ParseNode::node("NN", vec![ParseNode::leaf("dog")]),
                        ]
                    ),
                    ParseNode::node("VP", vec![ParseNode::leaf("barks")]),
                ]
            )
        );
    }

    #[test]
    fn whitespace() {
        let expected: ParseNode = "(S (NP dog) (VP barks))".parse().unwrap();
        for input in &[
            "  (S (NP dog) (VP barks))\n",
            "(S(NP dog)(VP barks))",
            "( S\t(NP  dog )\n (VP barks) )",
        ] {
            assert_eq!(expected, input.parse::<ParseNode>().unwrap(), "{}", input);
        }
    }

    #[test]
    fn bare_token() {
        assert_eq!(ParseNode::leaf("dog"), "dog".parse::<ParseNode>().unwrap());
    }

    #[test]
    fn tokens_with_special_characters() {
        let tree: ParseNode = "(S (X *T*-1) (Y a^b) (Z -NONE-))".parse().unwrap();
        assert_eq!(tree.leaves(), vec!["*T*-1", "a^b", "-NONE-"]);
    }

    #[test]
    fn deep_nesting() {
        let depth = 2_000;
        let input = format!("{}x{}", "(A ".repeat(depth), ")".repeat(depth));
        let tree: ParseNode = input.parse().unwrap();
        assert_eq!(tree.size(), depth + 1);
        assert_eq!(tree.leaves(), vec!["x"]);
        assert_eq!(tree.to_string(), input);
    }

    #[test]
    fn illegal_input() {
        for input in &[
            "",
            "()",
            "(S)",
            "(S (NP dog)",
            "(S (NP dog)))",
            "(S (NP dog) (VP barks)) (S x)",
            "dog barks",
            "((S x))",
            "(S x) y",
            ")",
            "(",
        ] {
            assert!(
                input.parse::<ParseNode>().is_err(),
                "could parse illegal input '{}'",
                input
            );
        }
    }
}
