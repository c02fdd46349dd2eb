use std::io;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while inducing a grammar or parsing with it.
#[derive(Debug, Error)]
pub enum PcfgError {
    /// A rule was looked up in the stats map matching its kind but is not there.
    #[error("rule not found in grammar: {rule}")]
    RuleNotFound { rule: String },

    /// The chart has no entry for the start symbol over the whole sentence.
    #[error("no derivation found for '{sentence}'")]
    NoDerivation { sentence: String },

    #[error("cannot parse an empty sentence")]
    EmptySentence,

    #[error("decoding exceeded its budget of {budget:?} after {elapsed:?}")]
    BudgetExceeded { budget: Duration, elapsed: Duration },

    /// A tree that could not survive binarization and debinarization unchanged.
    #[error("malformed tree at '{tag}': {reason}")]
    MalformedTree { tag: String, reason: String },

    #[error("could not read bracketed tree '{input}'")]
    TreeSyntax { input: String },

    #[error("could not read rule '{input}'")]
    RuleSyntax { input: String },

    #[error("line {line} of rule file: {message}")]
    RuleFile { line: usize, message: String },

    #[error("{value} is not a probability (i.e. not in the interval [0,1])")]
    InvalidProbability { value: f64 },

    #[error("rule probabilities have not been estimated yet")]
    NotEstimated,

    #[error("unary rules of this grammar have already been precolated")]
    AlreadyPrecolated,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("could not (de)serialize model: {0}")]
    Persistence(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, PcfgError>;
