//! Elimination of unary chains by "precolating" lexical and syntactic rules
//! upwards through the unary rules of a grammar.
//!
//! If `A ⇒⁺ B` by unary rules with minimal cost `c` and `B → α` is a
//! non-unary rule with cost `d`, then `A → α` is added with cost `c + d`.
//! Afterwards every derivation through unary chains has a counterpart of the
//! same cost that uses no unary rules, so a parser may ignore them.

use fnv::FnvHashMap;
use log::{debug, info};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use super::{Grammar, Rule, RuleKind, Symbol, SymbolSeq};
use crate::error::{PcfgError, Result};
use crate::util::cost::Cost;

/// Minimal costs of all unary chains `A ⇒⁺ B` with `A ≠ B`.
///
/// Every edge cost is non-negative, so a Dijkstra search from each
/// left-hand side suffices and cycles in the unary graph terminate.
pub fn unary_closure(grammar: &Grammar) -> BTreeMap<(Symbol, Symbol), Cost> {
    let mut edges: FnvHashMap<&Symbol, Vec<(&Symbol, Cost)>> = FnvHashMap::default();
    for (rule, stats) in grammar.rules_of_kind(RuleKind::Unary) {
        if let (Some(lhs), [rhs]) = (rule.head(), &*rule.rhs) {
            edges.entry(lhs).or_default().push((rhs, stats.cost));
        }
    }
    let sources: BTreeSet<&Symbol> = edges.keys().copied().collect();

    let mut closure = BTreeMap::new();
    for source in sources {
        let mut best: FnvHashMap<&Symbol, Cost> = FnvHashMap::default();
        let mut agenda: BinaryHeap<Reverse<(Cost, &Symbol)>> = BinaryHeap::new();
        for &(target, cost) in &edges[source] {
            if best.get(target).map_or(true, |&known| cost < known) {
                best.insert(target, cost);
                agenda.push(Reverse((cost, target)));
            }
        }

        while let Some(Reverse((cost, symbol))) = agenda.pop() {
            if best.get(symbol).map_or(false, |&known| known < cost) {
                continue;
            }
            for &(target, edge_cost) in edges.get(symbol).into_iter().flatten() {
                let candidate = cost * edge_cost;
                if best.get(target).map_or(true, |&known| candidate < known) {
                    best.insert(target, candidate);
                    agenda.push(Reverse((candidate, target)));
                }
            }
        }

        for (target, cost) in best {
            if target != source {
                closure.insert((source.clone(), target.clone()), cost);
            }
        }
    }
    closure
}

impl Grammar {
    /// Precolates the grammar, see the module documentation. Returns the
    /// number of rules that were added.
    ///
    /// When a derived rule is already in the grammar, its cost becomes the
    /// smaller one of the two. Derived rules have count 0 and do not change
    /// the totals of their left-hand side. The unary rules themselves stay in
    /// the grammar.
    pub fn precolate(&mut self) -> Result<usize> {
        if !self.is_estimated() {
            return Err(PcfgError::NotEstimated);
        }
        if self.is_precolated() {
            return Err(PcfgError::AlreadyPrecolated);
        }

        let closure = unary_closure(self);
        debug!("Unary closure has {} chains.", closure.len());

        let mut candidates: BTreeMap<Rule, Cost> = BTreeMap::new();
        for ((upper, lower), chain_cost) in &closure {
            let lower_lhs = SymbolSeq::single(lower.clone());
            for rule in self.rules_by_lhs(&lower_lhs) {
                if rule.is_unary() {
                    continue;
                }
                let cost = *chain_cost * self.lookup(rule)?.cost;
                let derived = Rule::new(SymbolSeq::single(upper.clone()), rule.rhs.clone());
                let entry = candidates.entry(derived).or_insert(cost);
                if cost < *entry {
                    *entry = cost;
                }
            }
        }

        let mut added = 0;
        let mut cheapened = 0;
        for (rule, cost) in candidates {
            match self.lookup(&rule).map(|stats| stats.cost) {
                Ok(existing) => {
                    if cost < existing {
                        self.set_cost(&rule, cost)?;
                        cheapened += 1;
                    }
                }
                Err(_) => {
                    self.add_derived_rule(rule, cost);
                    added += 1;
                }
            }
        }

        self.mark_precolated();
        info!(
            "Precolation added {} rules and lowered the cost of {} rules.",
            added, cheapened
        );
        Ok(added)
    }
}
