use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Add, Deref};

use crate::error::{PcfgError, Result};
use crate::util::cost::Cost;

pub mod cky;
mod from_str;
pub mod induction;
pub mod persistence;
pub mod precolation;
pub mod rule_files;

/// Terminal or nonterminal symbol of a PCFG.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    NonTerminal(String),
    Terminal(String),
}

impl Symbol {
    pub fn nonterminal<S: Into<String>>(text: S) -> Self {
        Symbol::NonTerminal(text.into())
    }

    pub fn terminal<S: Into<String>>(text: S) -> Self {
        Symbol::Terminal(text.into())
    }

    pub fn text(&self) -> &str {
        match self {
            Symbol::NonTerminal(text) | Symbol::Terminal(text) => text,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

/// Nonterminals are written as they are, terminals in double quotes with
/// `"` and `\` escaped by a backslash.
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Symbol::NonTerminal(text) => write!(f, "{}", text),
            Symbol::Terminal(text) => {
                write!(f, "\"")?;
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "\"")
            }
        }
    }
}

/// An ordered sequence of symbols; one side of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolSeq(Vec<Symbol>);

impl SymbolSeq {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        SymbolSeq(symbols)
    }

    pub fn single(symbol: Symbol) -> Self {
        SymbolSeq(vec![symbol])
    }

    /// A new sequence containing the symbols of `self` followed by those of `other`.
    pub fn concat(&self, other: &SymbolSeq) -> SymbolSeq {
        let mut symbols = Vec::with_capacity(self.len() + other.len());
        symbols.extend(self.0.iter().cloned());
        symbols.extend(other.0.iter().cloned());
        SymbolSeq(symbols)
    }
}

impl Deref for SymbolSeq {
    type Target = [Symbol];

    fn deref(&self) -> &[Symbol] {
        &self.0
    }
}

impl<'a> Add for &'a SymbolSeq {
    type Output = SymbolSeq;

    fn add(self, other: &'a SymbolSeq) -> SymbolSeq {
        self.concat(other)
    }
}

impl From<Vec<Symbol>> for SymbolSeq {
    fn from(symbols: Vec<Symbol>) -> Self {
        SymbolSeq(symbols)
    }
}

impl std::iter::FromIterator<Symbol> for SymbolSeq {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        SymbolSeq(iter.into_iter().collect())
    }
}

impl fmt::Display for SymbolSeq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, symbol) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", symbol)?;
        }
        Ok(())
    }
}

/// The three disjoint classes of rules a grammar keeps apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Only terminals on the right-hand side.
    Lexical,
    /// One nonterminal rewritten to one nonterminal.
    Unary,
    /// Everything else.
    Syntactic,
}

/// A rewrite rule `lhs → rhs`. Counts and costs are kept by the grammar and
/// do not take part in equality.
///
/// ```
/// use pcfg_cky::grammars::pcfg::{Rule, RuleKind, Symbol, SymbolSeq};
///
/// let rule = Rule::new(
///     SymbolSeq::single(Symbol::nonterminal("S")),
///     vec![Symbol::nonterminal("NP"), Symbol::nonterminal("VP")].into(),
/// );
///
/// assert_eq!(rule, "S → NP VP".parse::<Rule>().unwrap());
/// assert_eq!(rule.kind(), RuleKind::Syntactic);
/// assert_eq!("NN → \"dog\"".parse::<Rule>().unwrap().kind(), RuleKind::Lexical);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub lhs: SymbolSeq,
    pub rhs: SymbolSeq,
}

impl Rule {
    pub fn new(lhs: SymbolSeq, rhs: SymbolSeq) -> Self {
        Rule { lhs, rhs }
    }

    pub fn kind(&self) -> RuleKind {
        if self.rhs.iter().all(Symbol::is_terminal) {
            RuleKind::Lexical
        } else if self.lhs.len() == 1 && self.rhs.len() == 1 {
            RuleKind::Unary
        } else {
            RuleKind::Syntactic
        }
    }

    pub fn is_lexical(&self) -> bool {
        self.kind() == RuleKind::Lexical
    }

    pub fn is_unary(&self) -> bool {
        self.kind() == RuleKind::Unary
    }

    /// The left-hand side if it is a single symbol.
    pub fn head(&self) -> Option<&Symbol> {
        match &*self.lhs {
            [head] => Some(head),
            _ => None,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} →", self.lhs)?;
        for symbol in self.rhs.iter() {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// How often a rule was seen during induction and its cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    pub count: usize,
    pub cost: Cost,
}

impl Default for RuleStats {
    fn default() -> Self {
        RuleStats {
            count: 0,
            cost: Cost::infinity(),
        }
    }
}

/// A probabilistic context-free grammar.
///
/// Rules are kept in one of three maps according to their `RuleKind`.
/// Both the `by_lhs` and the `by_rhs` index always contain exactly the rules
/// of the three maps, and `lhs_totals` holds the number of rule occurrences
/// added for each left-hand side, the denominator of the relative-frequency
/// estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    start: Symbol,
    lexical: FnvHashMap<Rule, RuleStats>,
    unary: FnvHashMap<Rule, RuleStats>,
    syntactic: FnvHashMap<Rule, RuleStats>,
    by_rhs: FnvHashMap<SymbolSeq, BTreeSet<Rule>>,
    by_lhs: FnvHashMap<SymbolSeq, BTreeSet<Rule>>,
    lhs_totals: FnvHashMap<SymbolSeq, usize>,
    estimated: bool,
    precolated: bool,
}

impl Grammar {
    /// An empty grammar with start symbol `start`.
    pub fn new<S: Into<String>>(start: S) -> Self {
        Grammar {
            start: Symbol::nonterminal(start),
            lexical: FnvHashMap::default(),
            unary: FnvHashMap::default(),
            syntactic: FnvHashMap::default(),
            by_rhs: FnvHashMap::default(),
            by_lhs: FnvHashMap::default(),
            lhs_totals: FnvHashMap::default(),
            estimated: false,
            precolated: false,
        }
    }

    pub fn start(&self) -> &Symbol {
        &self.start
    }

    fn map(&self, kind: RuleKind) -> &FnvHashMap<Rule, RuleStats> {
        match kind {
            RuleKind::Lexical => &self.lexical,
            RuleKind::Unary => &self.unary,
            RuleKind::Syntactic => &self.syntactic,
        }
    }

    fn map_mut(&mut self, kind: RuleKind) -> &mut FnvHashMap<Rule, RuleStats> {
        match kind {
            RuleKind::Lexical => &mut self.lexical,
            RuleKind::Unary => &mut self.unary,
            RuleKind::Syntactic => &mut self.syntactic,
        }
    }

    fn index(&mut self, rule: &Rule) {
        self.by_rhs
            .entry(rule.rhs.clone())
            .or_default()
            .insert(rule.clone());
        self.by_lhs
            .entry(rule.lhs.clone())
            .or_default()
            .insert(rule.clone());
    }

    /// Registers one occurrence of `rule`. The rule's cost is invalidated
    /// until the next call of `estimate_probabilities`.
    pub fn add_rule(&mut self, rule: Rule) {
        *self.lhs_totals.entry(rule.lhs.clone()).or_insert(0) += 1;
        self.index(&rule);
        let stats = self.map_mut(rule.kind()).entry(rule).or_default();
        stats.count += 1;
        stats.cost = Cost::infinity();
        self.estimated = false;
    }

    /// Inserts `rule` with the given statistics, as if it had been added
    /// `stats.count` times and estimated afterwards.
    pub fn insert_with_stats(&mut self, rule: Rule, stats: RuleStats) {
        *self.lhs_totals.entry(rule.lhs.clone()).or_insert(0) += stats.count;
        self.index(&rule);
        if let Some(old) = self.map_mut(rule.kind()).insert(rule.clone(), stats) {
            if let Some(total) = self.lhs_totals.get_mut(&rule.lhs) {
                *total -= old.count;
            }
        }
    }

    /// Inserts a rule that was not observed but derived from other rules.
    /// It has count 0 and leaves `lhs_totals` untouched.
    pub(crate) fn add_derived_rule(&mut self, rule: Rule, cost: Cost) {
        self.index(&rule);
        self.map_mut(rule.kind())
            .insert(rule, RuleStats { count: 0, cost });
    }

    /// Sets the cost of every rule to the negative log of its relative
    /// frequency among the rules with the same left-hand side.
    pub fn estimate_probabilities(&mut self) -> Result<()> {
        if self.precolated {
            return Err(PcfgError::AlreadyPrecolated);
        }
        let totals = &self.lhs_totals;
        for map in vec![&mut self.lexical, &mut self.unary, &mut self.syntactic] {
            for (rule, stats) in map.iter_mut() {
                let total = totals.get(&rule.lhs).copied().unwrap_or(0);
                stats.cost = Cost::relative_frequency(stats.count, total)?;
            }
        }
        self.estimated = true;
        Ok(())
    }

    pub fn lookup(&self, rule: &Rule) -> Result<&RuleStats> {
        self.map(rule.kind())
            .get(rule)
            .ok_or_else(|| PcfgError::RuleNotFound {
                rule: rule.to_string(),
            })
    }

    pub fn contains(&self, rule: &Rule) -> bool {
        self.map(rule.kind()).contains_key(rule)
    }

    pub fn set_cost(&mut self, rule: &Rule, cost: Cost) -> Result<()> {
        match self.map_mut(rule.kind()).get_mut(rule) {
            Some(stats) => {
                stats.cost = cost;
                Ok(())
            }
            None => Err(PcfgError::RuleNotFound {
                rule: rule.to_string(),
            }),
        }
    }

    /// All rules with their statistics, lexical rules first, then unary and
    /// syntactic rules.
    pub fn rules(&self) -> impl Iterator<Item = (&Rule, &RuleStats)> {
        self.lexical
            .iter()
            .chain(self.unary.iter())
            .chain(self.syntactic.iter())
    }

    pub fn rules_of_kind(&self, kind: RuleKind) -> impl Iterator<Item = (&Rule, &RuleStats)> {
        self.map(kind).iter()
    }

    pub fn rules_by_rhs<'a>(&'a self, rhs: &SymbolSeq) -> impl Iterator<Item = &'a Rule> + 'a {
        self.by_rhs.get(rhs).into_iter().flatten()
    }

    pub fn rules_by_lhs<'a>(&'a self, lhs: &SymbolSeq) -> impl Iterator<Item = &'a Rule> + 'a {
        self.by_lhs.get(lhs).into_iter().flatten()
    }

    pub fn lhs_total(&self, lhs: &SymbolSeq) -> usize {
        self.lhs_totals.get(lhs).copied().unwrap_or(0)
    }

    /// Left-hand sides of all rules.
    pub fn lhss(&self) -> impl Iterator<Item = &SymbolSeq> {
        self.by_lhs.keys()
    }

    /// Sum of the probabilities of all rules with left-hand side `lhs`.
    pub fn probability_mass(&self, lhs: &SymbolSeq) -> f64 {
        self.rules_by_lhs(lhs)
            .filter_map(|rule| self.lookup(rule).ok())
            .map(|stats| stats.cost.probability())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.lexical.len() + self.unary.len() + self.syntactic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_estimated(&self) -> bool {
        self.estimated
    }

    pub fn is_precolated(&self) -> bool {
        self.precolated
    }

    pub(crate) fn mark_estimated(&mut self) {
        self.estimated = true;
    }

    pub(crate) fn mark_precolated(&mut self) {
        self.precolated = true;
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use num_traits::One;

    pub fn rule(s: &str) -> Rule {
        s.parse().unwrap()
    }

    /// An estimated grammar with start symbol `S` whose rules have the
    /// given costs.
    pub fn weighted(rules: &[(&str, f64)]) -> Grammar {
        let mut grammar = Grammar::new("S");
        for (r, _) in rules {
            grammar.add_rule(rule(r));
        }
        grammar.estimate_probabilities().unwrap();
        for (r, cost) in rules {
            grammar
                .set_cost(&rule(r), Cost::from_value(*cost).unwrap())
                .unwrap();
        }
        grammar
    }

    #[test]
    fn symbol_equality() {
        assert_eq!(Symbol::terminal("a"), Symbol::terminal("a"));
        assert_ne!(Symbol::terminal("a"), Symbol::nonterminal("a"));
        assert_ne!(Symbol::nonterminal("a"), Symbol::nonterminal("b"));
    }

    #[test]
    fn concatenation() {
        let a = SymbolSeq::single(Symbol::nonterminal("A"));
        let b: SymbolSeq = vec![Symbol::terminal("b"), Symbol::nonterminal("C")].into();
        let ab = &a + &b;
        assert_eq!(ab.len(), 3);
        assert_eq!(ab, a.concat(&b));
        assert_eq!(ab.to_string(), "A \"b\" C");
        assert_eq!(a.len(), 1);
        assert_eq!(&SymbolSeq::default() + &a, a);
    }

    #[test]
    fn rule_kinds() {
        assert_eq!(rule("NN → \"dog\"").kind(), RuleKind::Lexical);
        assert_eq!(rule("X → \"New\" \"York\"").kind(), RuleKind::Lexical);
        assert_eq!(rule("NP → NN").kind(), RuleKind::Unary);
        assert_eq!(rule("S → NP VP").kind(), RuleKind::Syntactic);
        assert_eq!(rule("NP → \"the\" NN").kind(), RuleKind::Syntactic);
        assert_eq!(rule("A B → C").kind(), RuleKind::Syntactic);
    }

    #[test]
    fn add_rule_maintains_indices() {
        let mut grammar = Grammar::new("S");
        for r in &["S → NP VP", "S → NP VP", "NP → NN", "NN → \"dog\"", "S → VP"] {
            grammar.add_rule(rule(r));
        }

        assert_eq!(grammar.len(), 4);
        assert_eq!(grammar.lookup(&rule("S → NP VP")).unwrap().count, 2);
        assert_eq!(grammar.rules_of_kind(RuleKind::Unary).count(), 2);
        assert_eq!(grammar.rules_of_kind(RuleKind::Lexical).count(), 1);
        assert_eq!(grammar.rules_of_kind(RuleKind::Syntactic).count(), 1);

        let s = SymbolSeq::single(Symbol::nonterminal("S"));
        assert_eq!(grammar.lhs_total(&s), 3);
        assert_eq!(
            grammar.rules_by_lhs(&s).cloned().collect::<Vec<_>>(),
            vec![rule("S → NP VP"), rule("S → VP")]
        );
        let nn = SymbolSeq::single(Symbol::nonterminal("NN"));
        assert_eq!(
            grammar.rules_by_rhs(&nn).cloned().collect::<Vec<_>>(),
            vec![rule("NP → NN")]
        );

        // the indices are exactly the key sets of the stats maps
        let mut indexed: Vec<Rule> = grammar
            .lhss()
            .flat_map(|lhs| grammar.rules_by_lhs(lhs).cloned())
            .collect();
        let mut stored: Vec<Rule> = grammar.rules().map(|(r, _)| r.clone()).collect();
        indexed.sort();
        stored.sort();
        assert_eq!(indexed, stored);
    }

    #[test]
    fn estimation() {
        let mut grammar = Grammar::new("S");
        for r in &["S → NP VP", "S → NP VP", "S → VP", "NN → \"dog\"", "NN → \"cat\"", "NN → \"dog\""] {
            grammar.add_rule(rule(r));
        }
        assert!(!grammar.is_estimated());
        grammar.estimate_probabilities().unwrap();
        assert!(grammar.is_estimated());

        let cost = grammar.lookup(&rule("S → NP VP")).unwrap().cost;
        assert!((cost.probability() - 2.0 / 3.0).abs() < 1e-12);
        let cost = grammar.lookup(&rule("NN → \"cat\"")).unwrap().cost;
        assert!((cost.value() - 3f64.ln()).abs() < 1e-12);

        for lhs in grammar.lhss() {
            assert!((grammar.probability_mass(lhs) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn add_rule_after_estimation_invalidates() {
        let mut grammar = Grammar::new("S");
        grammar.add_rule(rule("S → A B"));
        grammar.estimate_probabilities().unwrap();
        assert_eq!(grammar.lookup(&rule("S → A B")).unwrap().cost, Cost::one());
        grammar.add_rule(rule("S → A B"));
        assert!(!grammar.is_estimated());
        assert!(!grammar.lookup(&rule("S → A B")).unwrap().cost.is_finite());
    }

    #[test]
    fn lookup_missing_rule() {
        let grammar = Grammar::new("S");
        match grammar.lookup(&rule("S → A B")) {
            Err(PcfgError::RuleNotFound { rule }) => assert_eq!(rule, "S → A B"),
            other => panic!("unexpected {:?}", other),
        }
        let mut grammar = grammar;
        assert!(grammar.set_cost(&rule("S → A B"), Cost::one()).is_err());
    }

    #[test]
    fn insert_with_stats() {
        let mut grammar = Grammar::new("S");
        let stats = RuleStats {
            count: 3,
            cost: Cost::one(),
        };
        grammar.insert_with_stats(rule("S → A B"), stats);
        grammar.insert_with_stats(rule("S → A B"), stats);
        let s = SymbolSeq::single(Symbol::nonterminal("S"));
        assert_eq!(grammar.lhs_total(&s), 3);
        assert_eq!(grammar.lookup(&rule("S → A B")).unwrap(), &stats);
    }
}
