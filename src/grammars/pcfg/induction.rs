//! Extraction of grammar rules from (binarized) constituent trees.

use log::info;

use super::{Grammar, Rule, Symbol, SymbolSeq};
use crate::error::Result;
use crate::util::tree::ParseNode;

/// Iterator over the rules used in a tree, see `induce`.
pub struct InducedRules<'a> {
    agenda: Vec<&'a ParseNode>,
}

/// The rules used in `tree`, one per inner node, in pre-order.
///
/// The left-hand side of each rule is the node's tag. Its right-hand side
/// lists the children in order: leaves as terminals and inner nodes as
/// nonterminals.
///
/// ```
/// use pcfg_cky::grammars::pcfg::{induction::induce, Rule};
/// use pcfg_cky::util::tree::ParseNode;
///
/// let tree: ParseNode = "(S (NP dog) (VP barks))".parse().unwrap();
/// let rules: Vec<Rule> = induce(&tree).collect();
///
/// assert_eq!(rules, vec![
///     "S → NP VP".parse::<Rule>().unwrap(),
///     "NP → \"dog\"".parse::<Rule>().unwrap(),
///     "VP → \"barks\"".parse::<Rule>().unwrap(),
/// ]);
/// ```
pub fn induce(tree: &ParseNode) -> InducedRules<'_> {
    InducedRules { agenda: vec![tree] }
}

impl<'a> Iterator for InducedRules<'a> {
    type Item = Rule;

    fn next(&mut self) -> Option<Rule> {
        while let Some(node) = self.agenda.pop() {
            if let ParseNode::Node { tag, children } = node {
                self.agenda.extend(children.iter().rev());
                let rhs: SymbolSeq = children
                    .iter()
                    .map(|child| match child {
                        ParseNode::Leaf(token) => Symbol::terminal(token.as_str()),
                        ParseNode::Node { tag, .. } => Symbol::nonterminal(tag.as_str()),
                    })
                    .collect();
                return Some(Rule::new(
                    SymbolSeq::single(Symbol::nonterminal(tag.as_str())),
                    rhs,
                ));
            }
        }
        None
    }
}

impl Grammar {
    /// Adds every rule used in `tree`. Returns the number of rules added.
    pub fn add_tree(&mut self, tree: &ParseNode) -> usize {
        let mut added = 0;
        for rule in induce(tree) {
            self.add_rule(rule);
            added += 1;
        }
        added
    }

    /// Induces an estimated grammar from a treebank.
    pub fn from_treebank<S, I>(start: S, trees: I) -> Result<Grammar>
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: AsRef<ParseNode>,
    {
        let mut grammar = Grammar::new(start);
        let mut tree_count = 0;
        let mut rule_count = 0;
        for tree in trees {
            rule_count += grammar.add_tree(tree.as_ref());
            tree_count += 1;
        }
        grammar.estimate_probabilities()?;
        info!(
            "Induced {} distinct rules from {} rule occurrences in {} trees.",
            grammar.len(),
            rule_count,
            tree_count
        );
        Ok(grammar)
    }
}
