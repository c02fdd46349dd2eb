use serde::{Deserialize, Serialize};
use std::fmt;

pub mod binarization;
mod from_str;

/// A node of a constituent tree. Inner nodes own their children; leaves are
/// the tokens of the sentence.
///
/// ```
/// use pcfg_cky::util::tree::ParseNode;
///
/// let tree = ParseNode::node("S", vec![
///     ParseNode::node("NP", vec![ParseNode::leaf("dog")]),
///     ParseNode::node("VP", vec![ParseNode::leaf("barks")]),
/// ]);
///
/// assert_eq!(tree, "(S (NP dog) (VP barks))".parse::<ParseNode>().unwrap());
/// assert_eq!(tree.to_string(), "(S (NP dog) (VP barks))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseNode {
    Leaf(String),
    Node { tag: String, children: Vec<ParseNode> },
}

impl ParseNode {
    pub fn leaf<S: Into<String>>(text: S) -> Self {
        ParseNode::Leaf(text.into())
    }

    /// Builds an inner node. A node without children is a leaf.
    pub fn node<S: Into<String>>(tag: S, children: Vec<ParseNode>) -> Self {
        if children.is_empty() {
            ParseNode::Leaf(tag.into())
        } else {
            ParseNode::Node {
                tag: tag.into(),
                children,
            }
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            ParseNode::Leaf(text) => text,
            ParseNode::Node { tag, .. } => tag,
        }
    }

    pub fn children(&self) -> &[ParseNode] {
        match self {
            ParseNode::Leaf(_) => &[],
            ParseNode::Node { children, .. } => children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ParseNode::Leaf(_))
    }

    /// The yield of the tree, i.e. its leaves from left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        let mut agenda = vec![self];
        while let Some(node) = agenda.pop() {
            match node {
                ParseNode::Leaf(text) => leaves.push(text.as_str()),
                ParseNode::Node { children, .. } => agenda.extend(children.iter().rev()),
            }
        }
        leaves
    }

    /// Puts the tree below a new root node tagged `tag`.
    pub fn with_root<S: Into<String>>(self, tag: S) -> Self {
        ParseNode::node(tag, vec![self])
    }

    /// Number of nodes, leaves included.
    pub fn size(&self) -> usize {
        let mut size = 0;
        let mut agenda = vec![self];
        while let Some(node) = agenda.pop() {
            size += 1;
            agenda.extend(node.children());
        }
        size
    }
}

impl AsRef<ParseNode> for ParseNode {
    fn as_ref(&self) -> &ParseNode {
        self
    }
}

/// Bracket notation: `(tag child₁ child₂ …)` for inner nodes, the bare text
/// for leaves.
impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // `None` closes the bracket of the node opened before it
        let mut agenda = vec![Some(self)];
        let mut first = true;
        while let Some(item) = agenda.pop() {
            let node = match item {
                Some(node) => node,
                None => {
                    write!(f, ")")?;
                    continue;
                }
            };
            if !first {
                write!(f, " ")?;
            }
            first = false;
            match node {
                ParseNode::Leaf(text) => write!(f, "{}", text)?,
                ParseNode::Node { tag, children } => {
                    write!(f, "({}", tag)?;
                    agenda.push(None);
                    agenda.extend(children.iter().rev().map(Some));
                }
            }
        }
        Ok(())
    }
}
