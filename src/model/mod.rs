//! Training and decoding pipeline: binarization, induction and the unary
//! strategy on the way in, CKY and debinarization on the way out.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::grammars::pcfg::cky::{CkyConfig, CkyParser};
use crate::grammars::pcfg::persistence::{read_compressed, write_compressed};
use crate::grammars::pcfg::Grammar;
use crate::util::tree::binarization::{binarize, debinarize, Markovization};
use crate::util::tree::ParseNode;

pub mod corpus;

/// How unary rules are dealt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryStrategy {
    /// Fold unary chains into the grammar after training.
    Precolate,
    /// Apply unary rules inside the CKY chart.
    InChart,
}

impl Default for UnaryStrategy {
    fn default() -> Self {
        UnaryStrategy::InChart
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub markovization: Markovization,
    pub unary_strategy: UnaryStrategy,
    /// Tag of the sentence-level constituent below the root of each tree.
    pub start_symbol: String,
    /// Tag of the virtual root every training tree has, if any. It is removed
    /// for parsing and put back on top of every decoded tree.
    pub root_tag: Option<String>,
    pub unknown_tag: String,
    pub time_budget: Option<Duration>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            markovization: Markovization::default(),
            unary_strategy: UnaryStrategy::default(),
            start_symbol: "S".to_string(),
            root_tag: Some("TOP".to_string()),
            unknown_tag: "NN".to_string(),
            time_budget: None,
        }
    }
}

impl ModelConfig {
    fn virtual_root(&self) -> Option<&str> {
        self.root_tag
            .as_deref()
            .filter(|root| *root != self.start_symbol)
    }

    /// The start symbol as it appears in binarized trees.
    pub fn grammar_start(&self) -> String {
        match self.virtual_root() {
            Some(root) => self.markovization.label_below(root, &self.start_symbol),
            None => self.start_symbol.clone(),
        }
    }

    pub fn cky_config(&self) -> CkyConfig {
        CkyConfig {
            unknown_tag: self.unknown_tag.clone(),
            expand_unaries: self.unary_strategy == UnaryStrategy::InChart,
            time_budget: self.time_budget,
        }
    }
}

/// Outcome of `ParserModel::parse_batch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub parsed: usize,
    pub failed: usize,
}

/// A grammar together with the configuration it was trained with.
///
/// ```
/// use pcfg_cky::model::{ModelConfig, ParserModel};
///
/// let mut model = ParserModel::new(ModelConfig::default());
/// model.train_from_corpus(vec![
///     "(TOP (S (NP dog) (VP barks)))",
///     "(TOP (S (NP (DT the) (NN cat)) (VP sleeps)))",
/// ]).unwrap();
///
/// let tree = model.decode(&["the", "cat", "barks"]).unwrap();
/// assert_eq!(tree.to_string(), "(TOP (S (NP (DT the) (NN cat)) (VP barks)))");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserModel {
    config: ModelConfig,
    grammar: Grammar,
    #[serde(skip)]
    parser: Option<CkyParser>,
}

impl ParserModel {
    pub fn new(config: ModelConfig) -> Self {
        let grammar = Grammar::new(config.grammar_start());
        ParserModel {
            config,
            grammar,
            parser: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Replaces the grammar by one induced from `trees`.
    pub fn train<I>(&mut self, trees: I) -> Result<()>
    where
        I: IntoIterator<Item = ParseNode>,
    {
        let started = Instant::now();
        let mut grammar = Grammar::new(self.config.grammar_start());
        let mut tree_count = 0;
        let mut unrooted = 0;

        for tree in trees {
            if let Some(root) = self.config.virtual_root() {
                let rooted = tree.tag() == root
                    && tree.children().len() == 1
                    && tree.children()[0].tag() == self.config.start_symbol;
                if !rooted {
                    unrooted += 1;
                }
            }
            let binarized = binarize(tree, self.config.markovization)?;
            grammar.add_tree(&binarized);
            tree_count += 1;
        }
        if unrooted > 0 {
            warn!(
                "{} of {} training trees do not consist of the root {:?} above {}.",
                unrooted, tree_count, self.config.root_tag, self.config.start_symbol
            );
        }

        grammar.estimate_probabilities()?;
        if self.config.unary_strategy == UnaryStrategy::Precolate {
            grammar.precolate()?;
        }
        info!(
            "Trained a grammar with {} rules on {} trees in {:?}.",
            grammar.len(),
            tree_count,
            started.elapsed()
        );

        self.parser = Some(CkyParser::new(&grammar, self.config.cky_config()));
        self.grammar = grammar;
        Ok(())
    }

    /// Sets the time budget for decoding a single sentence.
    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.config.time_budget = budget;
        self.parser = Some(CkyParser::new(&self.grammar, self.config.cky_config()));
        self
    }

    /// Like `train`, but with the trees in bracket notation. Blank lines are
    /// skipped.
    pub fn train_from_corpus<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut trees: Vec<ParseNode> = Vec::new();
        for line in lines {
            let line = line.as_ref();
            if !line.trim().is_empty() {
                trees.push(line.parse()?);
            }
        }
        self.train(trees)
    }

    /// The best tree for `sentence` in the shape of the training trees.
    pub fn decode<S: AsRef<str>>(&self, sentence: &[S]) -> Result<ParseNode> {
        match &self.parser {
            Some(parser) => self.decode_with(parser, sentence),
            None => self.decode_with(&CkyParser::new(&self.grammar, self.config.cky_config()), sentence),
        }
    }

    fn decode_with<S: AsRef<str>>(&self, parser: &CkyParser, sentence: &[S]) -> Result<ParseNode> {
        let tree = parser.parse(sentence)?;
        let tree = match self.config.virtual_root() {
            Some(root) => tree.with_root(root),
            None => tree,
        };
        Ok(debinarize(tree))
    }

    /// Decodes every sentence and writes one line per sentence to `sink`:
    /// the tree in bracket notation, or nothing if decoding failed.
    pub fn parse_batch<I, S, W>(&self, sentences: I, sink: &mut W) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = Vec<S>>,
        S: AsRef<str>,
        W: Write,
    {
        let built;
        let parser = match &self.parser {
            Some(parser) => parser,
            None => {
                built = CkyParser::new(&self.grammar, self.config.cky_config());
                &built
            }
        };

        let started = Instant::now();
        let mut summary = BatchSummary::default();
        for (number, sentence) in sentences.into_iter().enumerate() {
            match self.decode_with(parser, &sentence) {
                Ok(tree) => {
                    writeln!(sink, "{}", tree)?;
                    summary.parsed += 1;
                }
                Err(e) => {
                    warn!("Sentence {}: {}", number + 1, e);
                    writeln!(sink)?;
                    summary.failed += 1;
                }
            }
            debug!("Sentence {} done after {:?}.", number + 1, started.elapsed());
        }
        info!(
            "Parsed {} of {} sentences in {:?}.",
            summary.parsed,
            summary.parsed + summary.failed,
            started.elapsed()
        );
        Ok(summary)
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        write_compressed(self, writer)
    }

    pub fn load<R: Read>(reader: R) -> Result<ParserModel> {
        let mut model: ParserModel = read_compressed(reader)?;
        model.parser = Some(CkyParser::new(&model.grammar, model.config.cky_config()));
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_start() {
        let mut config = ModelConfig::default();
        assert_eq!(config.grammar_start(), "S");
        config.markovization.vertical = 1;
        assert_eq!(config.grammar_start(), "TOP^S");
        config.root_tag = None;
        assert_eq!(config.grammar_start(), "S");
        config.root_tag = Some("S".to_string());
        assert_eq!(config.grammar_start(), "S");
    }

    #[test]
    fn cky_config() {
        let mut config = ModelConfig::default();
        assert!(config.cky_config().expand_unaries);
        config.unary_strategy = UnaryStrategy::Precolate;
        config.unknown_tag = "X".to_string();
        let cky = config.cky_config();
        assert!(!cky.expand_unaries);
        assert_eq!(cky.unknown_tag, "X");
    }

    #[test]
    fn untrained_model_decodes_nothing() {
        let model = ParserModel::new(ModelConfig::default());
        assert!(model.grammar().is_empty());
        assert!(model.decode(&["dog"]).is_err());
        let mut sink = Vec::new();
        let summary = model
            .parse_batch(vec![vec!["dog"]], &mut sink)
            .unwrap();
        assert_eq!(summary, BatchSummary { parsed: 0, failed: 1 });
        assert_eq!(sink, b"\n");
    }

    #[test]
    fn precolated_training() {
        let mut model = ParserModel::new(ModelConfig {
            unary_strategy: UnaryStrategy::Precolate,
            ..ModelConfig::default()
        });
        model
            .train_from_corpus(vec!["(TOP (S (NP (NN dog)) (VP barks)))", ""])
            .unwrap();
        assert!(model.grammar().is_precolated());
        assert_eq!(
            model.decode(&["dog", "barks"]).unwrap().to_string(),
            "(TOP (S (NP dog) (VP barks)))"
        );
    }
}
