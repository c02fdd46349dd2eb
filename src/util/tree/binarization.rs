//! Reversible binarization of constituent trees with bounded vertical
//! (ancestor) and horizontal (sibling) context.
//!
//! An inner node with more than two children is turned into a right-branching
//! cascade of synthetic nodes. A synthetic node is tagged
//! `<first sibling>*<remaining siblings joined by '-'>`, so that the tag both
//! marks the node for removal and keeps some of the lost sibling context.
//! With vertical context, every inner node below the root is prefixed with the
//! tags of its nearest real ancestors: `<parent-grandparent>^<tag>`.
//!
//! `debinarize` strips the ancestor prefixes and splices the children of
//! synthetic nodes back into their real parent, so that
//! `debinarize(binarize(t, m)?) == t` for every well-formed tree `t`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::mem;

use super::ParseNode;
use crate::error::{PcfgError, Result};

/// Separates the ancestor context from the tag of a node.
pub const PARENT_SEPARATOR: char = '^';
/// Separates the first sibling from the remaining siblings in synthetic tags.
pub const SIBLING_SEPARATOR: char = '*';
/// Joins tags inside a context.
pub const CONTEXT_JOIN: char = '-';

/// How much context the binarization keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markovization {
    /// Number of ancestor tags prefixed to each inner node.
    pub vertical: usize,
    /// Number of remaining siblings kept in synthetic tags; `None` keeps all.
    pub horizontal: Option<usize>,
}

impl Markovization {
    pub fn new(vertical: usize, horizontal: Option<usize>) -> Self {
        Markovization {
            vertical,
            horizontal,
        }
    }

    /// The tag that `binarize` gives to an inner node `tag` directly below
    /// the root `parent`.
    pub fn label_below(&self, parent: &str, tag: &str) -> String {
        if self.vertical > 0 {
            format!("{}{}{}", parent, PARENT_SEPARATOR, tag)
        } else {
            tag.to_string()
        }
    }
}

/// Checks that no inner tag contains one of the separators.
pub fn validate(tree: &ParseNode) -> Result<()> {
    let mut agenda = vec![tree];
    while let Some(node) = agenda.pop() {
        if let ParseNode::Node { tag, children } = node {
            if let Some(c) = tag
                .chars()
                .find(|&c| c == PARENT_SEPARATOR || c == SIBLING_SEPARATOR)
            {
                return Err(PcfgError::MalformedTree {
                    tag: tag.clone(),
                    reason: format!("inner tags must not contain the reserved symbol '{}'", c),
                });
            }
            agenda.extend(children);
        }
    }
    Ok(())
}

/// Binarizes `tree`, see the module documentation.
pub fn binarize(mut tree: ParseNode, markovization: Markovization) -> Result<ParseNode> {
    validate(&tree)?;

    {
        // (node, ancestor context, whether the node is synthetic)
        let mut agenda: Vec<(&mut ParseNode, Vec<String>, bool)> =
            vec![(&mut tree, Vec::new(), false)];

        while let Some((node, context, synthetic)) = agenda.pop() {
            if let ParseNode::Node { tag, children } = node {
                if children.len() > 2 {
                    let mut split = mem::take(children);
                    let tail = split.split_off(1);
                    let synthetic_tag = sibling_tag(&split[0], &tail, markovization.horizontal);
                    split.push(ParseNode::node(synthetic_tag, tail));
                    *children = split;
                }

                let child_context = if synthetic {
                    context.clone()
                } else if markovization.vertical > 0 {
                    let mut child_context = Vec::with_capacity(markovization.vertical);
                    child_context.push(tag.clone());
                    child_context
                        .extend(context.iter().take(markovization.vertical - 1).cloned());
                    child_context
                } else {
                    Vec::new()
                };

                if !context.is_empty() {
                    *tag = format!(
                        "{}{}{}",
                        join(context.iter().map(String::as_str)),
                        PARENT_SEPARATOR,
                        tag
                    );
                }

                for child in children.iter_mut() {
                    // children are not relabelled yet and real inner tags
                    // are free of separators
                    let child_is_synthetic = match child {
                        ParseNode::Node { tag, .. } => tag.contains(SIBLING_SEPARATOR),
                        ParseNode::Leaf(_) => false,
                    };
                    agenda.push((child, child_context.clone(), child_is_synthetic));
                }
            }
        }
    }

    Ok(tree)
}

/// Reverts `binarize`.
pub fn debinarize(mut tree: ParseNode) -> ParseNode {
    {
        let mut agenda = vec![&mut tree];

        while let Some(node) = agenda.pop() {
            if let ParseNode::Node { tag, children } = node {
                let stripped = strip_context(tag).to_string();
                *tag = stripped;

                let mut pending: VecDeque<ParseNode> = mem::take(children).into();
                while let Some(child) = pending.pop_front() {
                    match child {
                        ParseNode::Node {
                            tag: child_tag,
                            children: grandchildren,
                        } if is_synthetic(&child_tag) => {
                            for grandchild in grandchildren.into_iter().rev() {
                                pending.push_front(grandchild);
                            }
                        }
                        child => children.push(child),
                    }
                }

                agenda.extend(children.iter_mut());
            }
        }
    }

    tree
}

/// Removes the ancestor context from a tag.
pub fn strip_context(tag: &str) -> &str {
    match tag.split_once(PARENT_SEPARATOR) {
        Some((_, stripped)) => stripped,
        None => tag,
    }
}

/// Whether `tag` belongs to a node introduced by `binarize`. Sibling tags
/// may stem from leaves and thus contain a `PARENT_SEPARATOR` themselves, so
/// the whole tag is searched.
pub fn is_synthetic(tag: &str) -> bool {
    tag.contains(SIBLING_SEPARATOR)
}

fn sibling_tag(first: &ParseNode, rest: &[ParseNode], horizontal: Option<usize>) -> String {
    let kept = horizontal.unwrap_or(rest.len()).min(rest.len());
    format!(
        "{}{}{}",
        first.tag(),
        SIBLING_SEPARATOR,
        join(rest[..kept].iter().map(ParseNode::tag))
    )
}

fn join<'a, I: Iterator<Item = &'a str>>(tags: I) -> String {
    let mut buffer = String::new();
    for (i, tag) in tags.enumerate() {
        if i > 0 {
            buffer.push(CONTEXT_JOIN);
        }
        buffer.push_str(tag);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tree(s: &str) -> ParseNode {
        s.parse().unwrap()
    }

    #[test]
    fn small_nodes_are_unchanged() {
        for s in &["dog", "(NP dog)", "(S (NP dog) (VP barks))", "(S (NP (NN dog)))"] {
            assert_eq!(tree(s), binarize(tree(s), Markovization::default()).unwrap());
        }
    }

    #[test]
    fn horizontal_cascade() {
        let binarized = binarize(tree("(S (A a) (B b) (C c) (D d))"), Markovization::default()).unwrap();
        assert_eq!(
            binarized.to_string(),
            "(S (A a) (A*B-C-D (B b) (B*C-D (C c) (D d))))"
        );
    }

    #[test]
    fn horizontal_limit() {
        let binarized = binarize(
            tree("(S (A a) (B b) (C c) (D d))"),
            Markovization::new(0, Some(1)),
        )
        .unwrap();
        assert_eq!(binarized.to_string(), "(S (A a) (A*B (B b) (B*C (C c) (D d))))");

        let binarized = binarize(
            tree("(S (A a) (B b) (C c) (D d))"),
            Markovization::new(0, Some(0)),
        )
        .unwrap();
        assert_eq!(binarized.to_string(), "(S (A a) (A* (B b) (B* (C c) (D d))))");
    }

    #[test]
    fn vertical_context() {
        let binarized = binarize(
            tree("(TOP (S (NP (NN dog)) (VP (VB barks))))"),
            Markovization::new(1, None),
        )
        .unwrap();
        assert_eq!(
            binarized.to_string(),
            "(TOP (TOP^S (S^NP (NP^NN dog)) (S^VP (VP^VB barks))))"
        );

        let binarized = binarize(
            tree("(TOP (S (NP (NN dog)) (VP (VB barks))))"),
            Markovization::new(2, None),
        )
        .unwrap();
        assert_eq!(
            binarized.to_string(),
            "(TOP (TOP^S (S-TOP^NP (NP-S^NN dog)) (S-TOP^VP (VP-S^VB barks))))"
        );
    }

    #[test]
    fn synthetic_nodes_share_context_of_real_parent() {
        let binarized = binarize(
            tree("(TOP (S (A a) (B b) (C c)))"),
            Markovization::new(1, None),
        )
        .unwrap();
        assert_eq!(
            binarized.to_string(),
            "(TOP (TOP^S (S^A a) (S^A*B-C (S^B b) (S^C c))))"
        );
    }

    #[test]
    fn label_below() {
        assert_eq!(Markovization::new(0, None).label_below("TOP", "S"), "S");
        assert_eq!(Markovization::new(2, Some(1)).label_below("TOP", "S"), "TOP^S");
    }

    #[test]
    fn reserved_symbols_in_inner_tags() {
        for s in &["(S (A*B a) (C c))", "(S^X (A a))"] {
            match binarize(tree(s), Markovization::default()) {
                Err(PcfgError::MalformedTree { .. }) => (),
                other => panic!("expected a malformed tree error for {}, got {:?}", s, other),
            }
        }
    }

    #[test]
    fn reserved_symbols_in_leaves() {
        let m = Markovization::new(2, Some(1));
        for s in &["(S (X a*b) (Y c^d) (Z e-f))", "(S a c*d^e f g)", "(S (T x^y z w))"] {
            let t = tree(s);
            assert_eq!(t, debinarize(binarize(t.clone(), m).unwrap()));
        }
    }

    #[test]
    fn round_trip_examples() {
        let examples = [
            "dog",
            "(X y)",
            "(TOP (S (yyQUOT yyQUOT) (S (VP (VB THIH)) (NP (NN NQMH)) (CC W) (ADVP (RB BGDWL))) (yyDOT yyDOT)))",
            "(TOP (FRAGQ (NP (WDT AIZH) (NP (NN PCWEIM))) (yyQM yyQM)))",
            "(S a b c d e f g)",
        ];
        for s in &examples {
            for vertical in 0..3 {
                for horizontal in vec![None, Some(0), Some(1), Some(2)] {
                    let m = Markovization::new(vertical, horizontal);
                    let binarized = binarize(tree(s), m).unwrap();
                    assert!(binarized.children().len() <= 2);
                    assert_eq!(tree(s), debinarize(binarized), "{} with {:?}", s, m);
                }
            }
        }
    }

    fn arb_tree() -> impl Strategy<Value = ParseNode> {
        let leaf = "[a-z^*-]{1,3}".prop_map(ParseNode::leaf);
        leaf.prop_recursive(5, 64, 6, |inner| {
            ("[A-Z][A-Za-z-]{0,2}", prop::collection::vec(inner, 1..6))
                .prop_map(|(tag, children)| ParseNode::node(tag, children))
        })
    }

    fn is_binary(tree: &ParseNode) -> bool {
        tree.children().len() <= 2 && tree.children().iter().all(is_binary)
    }

    proptest! {
        #[test]
        fn round_trip(t in arb_tree(), vertical in 0usize..4, horizontal in prop::option::of(0usize..4)) {
            let m = Markovization::new(vertical, horizontal);
            let binarized = binarize(t.clone(), m).unwrap();
            prop_assert!(is_binary(&binarized));
            prop_assert_eq!(binarized.leaves(), t.leaves());
            prop_assert_eq!(debinarize(binarized), t);
        }
    }
}
