//! Probabilistic CKY parsing with Viterbi (minimum-cost) entries.

use fnv::FnvHashMap;
use log::{debug, warn};
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use super::{Grammar, RuleKind, Symbol};
use crate::error::{PcfgError, Result};
use crate::util::cost::Cost;
use crate::util::tree::binarization::{is_synthetic, strip_context};
use crate::util::tree::ParseNode;

pub mod chart;

use self::chart::{improve, Backtrace, Cell, Chart, ChartEntry};

/// Settings of a `CkyParser`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CkyConfig {
    /// Tag assigned with cost 0 to tokens without lexical rules. In grammars
    /// with ancestor context every annotated variant of the tag is assigned.
    pub unknown_tag: String,
    /// Whether unary rules are applied inside the chart. Precolated grammars
    /// are parsed without them in any case.
    pub expand_unaries: bool,
    /// Upper bound on the wall-clock time spent on a single sentence.
    pub time_budget: Option<Duration>,
}

impl Default for CkyConfig {
    fn default() -> Self {
        CkyConfig {
            unknown_tag: "NN".to_string(),
            expand_unaries: true,
            time_budget: None,
        }
    }
}

type Parents = Vec<(Symbol, Cost)>;

/// A CKY parser for a fixed grammar.
///
/// The rules are indexed by right-hand side once, on construction:
/// lexical rules by their token, binary rules by their first and second
/// symbol and unary rules by their only symbol. Rules with more than two
/// right-hand side symbols cannot be used and are left out.
#[derive(Debug, Clone)]
pub struct CkyParser {
    start: Symbol,
    unknown: Vec<Symbol>,
    config: CkyConfig,
    lexicon: FnvHashMap<String, Parents>,
    binary: FnvHashMap<Symbol, FnvHashMap<Symbol, Parents>>,
    unary: FnvHashMap<Symbol, Parents>,
}

impl CkyParser {
    pub fn new(grammar: &Grammar, config: CkyConfig) -> Self {
        let expand_unaries = config.expand_unaries && !grammar.is_precolated();
        let mut lexicon: FnvHashMap<String, Parents> = FnvHashMap::default();
        let mut binary: FnvHashMap<Symbol, FnvHashMap<Symbol, Parents>> = FnvHashMap::default();
        let mut unary: FnvHashMap<Symbol, Parents> = FnvHashMap::default();
        let mut ignored = 0;
        let mut unknown: Vec<Symbol> = Vec::new();

        for (rule, stats) in grammar.rules() {
            unknown.extend(
                rule.lhs
                    .iter()
                    .chain(rule.rhs.iter())
                    .filter(|symbol| is_fallback_variant(symbol, &config.unknown_tag))
                    .cloned(),
            );
            let lhs = match rule.head() {
                Some(lhs) if stats.cost.is_finite() => lhs.clone(),
                _ => {
                    ignored += 1;
                    continue;
                }
            };
            match (rule.kind(), &*rule.rhs) {
                (RuleKind::Lexical, [token]) => lexicon
                    .entry(token.text().to_string())
                    .or_default()
                    .push((lhs, stats.cost)),
                (RuleKind::Unary, [child]) => {
                    if expand_unaries {
                        unary
                            .entry(child.clone())
                            .or_default()
                            .push((lhs, stats.cost));
                    }
                }
                (_, [left, right]) => binary
                    .entry(left.clone())
                    .or_default()
                    .entry(right.clone())
                    .or_default()
                    .push((lhs, stats.cost)),
                _ => ignored += 1,
            }
        }

        for parents in lexicon
            .values_mut()
            .chain(unary.values_mut())
            .chain(binary.values_mut().flat_map(|by_right| by_right.values_mut()))
        {
            parents.sort();
        }
        unknown.sort();
        unknown.dedup();
        if unknown.is_empty() {
            unknown.push(Symbol::nonterminal(config.unknown_tag.as_str()));
        }
        debug!("Unknown tokens are tagged with {} symbols.", unknown.len());
        if ignored > 0 {
            warn!(
                "Ignoring {} rules that are not in binary form or have zero probability.",
                ignored
            );
        }

        CkyParser {
            start: grammar.start().clone(),
            unknown,
            config: CkyConfig {
                expand_unaries,
                ..config
            },
            lexicon,
            binary,
            unary,
        }
    }

    pub fn config(&self) -> &CkyConfig {
        &self.config
    }

    /// The cheapest derivation of `sentence` from the start symbol.
    pub fn parse<S: AsRef<str>>(&self, sentence: &[S]) -> Result<ParseNode> {
        self.parse_with_cost(sentence).map(|(tree, _)| tree)
    }

    /// Like `parse`, but also returns the cost of the derivation, i.e. the
    /// product of the costs of its rules.
    pub fn parse_with_cost<S: AsRef<str>>(&self, sentence: &[S]) -> Result<(ParseNode, Cost)> {
        let n = sentence.len();
        if n == 0 {
            return Err(PcfgError::EmptySentence);
        }
        let started = Instant::now();
        let mut chart = Chart::new(n);

        for (position, token) in sentence.iter().enumerate() {
            let token = token.as_ref();
            let cell = chart.cell_mut(1, position);
            cell.insert(
                Symbol::terminal(token),
                ChartEntry {
                    cost: Cost::one(),
                    backtrace: Backtrace::Token,
                },
            );
            match self.lexicon.get(token) {
                Some(tags) => {
                    for (tag, cost) in tags {
                        improve(
                            cell,
                            tag,
                            ChartEntry {
                                cost: *cost,
                                backtrace: Backtrace::Lexical,
                            },
                        );
                    }
                }
                None => {
                    debug!("Unknown token '{}', tagging it as {}.", token, self.config.unknown_tag);
                    for tag in &self.unknown {
                        improve(
                            cell,
                            tag,
                            ChartEntry {
                                cost: Cost::one(),
                                backtrace: Backtrace::Fallback,
                            },
                        );
                    }
                }
            }
            self.expand_unaries(cell);
        }

        for length in 2..=n {
            for start in 0..=(n - length) {
                self.check_budget(started)?;
                let mut cell = Cell::new();
                for split in 1..length {
                    self.combine(
                        &mut cell,
                        split,
                        chart.cell(split, start),
                        chart.cell(length - split, start + split),
                    );
                }
                self.expand_unaries(&mut cell);
                *chart.cell_mut(length, start) = cell;
            }
        }
        debug!(
            "Filled chart for {} tokens with {} entries in {:?}.",
            n,
            chart.size(),
            started.elapsed()
        );

        let cost = match chart.get(n, 0, &self.start) {
            Some(entry) => entry.cost,
            None => {
                return Err(PcfgError::NoDerivation {
                    sentence: join(sentence),
                })
            }
        };
        match chart.tree(sentence, n, 0, &self.start) {
            Some(tree) => Ok((tree, cost)),
            None => Err(PcfgError::NoDerivation {
                sentence: join(sentence),
            }),
        }
    }

    fn check_budget(&self, started: Instant) -> Result<()> {
        if let Some(budget) = self.config.time_budget {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                return Err(PcfgError::BudgetExceeded { budget, elapsed });
            }
        }
        Ok(())
    }

    /// Applies every binary rule to an entry of `left` followed by an entry
    /// of `right`. Left symbols, right symbols and rules are tried in
    /// ascending order and only strictly cheaper entries replace known ones.
    fn combine(&self, cell: &mut Cell, split: usize, left: &Cell, right: &Cell) {
        for (left_symbol, left_entry) in left {
            let by_right = match self.binary.get(left_symbol) {
                Some(by_right) => by_right,
                None => continue,
            };
            for (right_symbol, right_entry) in right {
                for (parent, rule_cost) in by_right.get(right_symbol).into_iter().flatten() {
                    let cost = left_entry.cost * right_entry.cost * *rule_cost;
                    if cell.get(parent).map_or(true, |known| cost < known.cost) {
                        cell.insert(
                            parent.clone(),
                            ChartEntry {
                                cost,
                                backtrace: Backtrace::Binary {
                                    split,
                                    left: left_symbol.clone(),
                                    right: right_symbol.clone(),
                                },
                            },
                        );
                    }
                }
            }
        }
    }

    /// Closes `cell` under the unary rules. Entries are settled cheapest
    /// first, so each one is final when it is expanded, and cycles of unary
    /// rules cannot lower any cost.
    fn expand_unaries(&self, cell: &mut Cell) {
        if self.unary.is_empty() {
            return;
        }
        let mut agenda: BinaryHeap<Reverse<(Cost, Symbol)>> = cell
            .iter()
            .filter(|(symbol, _)| self.unary.contains_key(*symbol))
            .map(|(symbol, entry)| Reverse((entry.cost, symbol.clone())))
            .collect();

        while let Some(Reverse((cost, symbol))) = agenda.pop() {
            if cell.get(&symbol).map_or(true, |known| known.cost < cost) {
                continue;
            }
            for (parent, rule_cost) in self.unary.get(&symbol).into_iter().flatten() {
                let entry = ChartEntry {
                    cost: cost * *rule_cost,
                    backtrace: Backtrace::Unary {
                        child: symbol.clone(),
                    },
                };
                let parent_cost = entry.cost;
                if improve(cell, parent, entry) {
                    agenda.push(Reverse((parent_cost, parent.clone())));
                }
            }
        }
    }
}

/// Whether `symbol` is `unknown_tag`, possibly with ancestor context.
fn is_fallback_variant(symbol: &Symbol, unknown_tag: &str) -> bool {
    !symbol.is_terminal() && !is_synthetic(symbol.text()) && strip_context(symbol.text()) == unknown_tag
}

fn join<S: AsRef<str>>(sentence: &[S]) -> String {
    sentence
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(" ")
}
