//! Probabilistic context-free grammars induced from treebanks, and
//! probabilistic CKY parsing with them.
//!
//! Training trees are binarized (`util::tree::binarization`), their rules are
//! collected into a `grammars::pcfg::Grammar` and weighted by relative
//! frequency. Unary rules are either folded into the grammar
//! (`Grammar::precolate`) or applied inside the chart of the
//! `grammars::pcfg::cky::CkyParser`. `model::ParserModel` ties these steps
//! together.

pub mod error;
pub mod grammars;
pub mod model;
pub mod util;

pub use crate::error::{PcfgError, Result};
pub use crate::model::{ModelConfig, ParserModel, UnaryStrategy};
