use std::collections::BTreeMap;

use crate::grammars::pcfg::Symbol;
use crate::util::cost::Cost;
use crate::util::tree::ParseNode;

/// How the best entry for a symbol over a span was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backtrace {
    /// The token itself.
    Token,
    /// A lexical rule over the token.
    Lexical,
    /// The fallback tag for a token without lexical rules.
    Fallback,
    /// A unary rule over an entry for `child` over the same span.
    Unary { child: Symbol },
    /// A binary rule over an entry for `left` over the first `split` tokens
    /// and an entry for `right` over the rest.
    Binary {
        split: usize,
        left: Symbol,
        right: Symbol,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartEntry {
    pub cost: Cost,
    pub backtrace: Backtrace,
}

/// The best entries of a single span, ordered by symbol.
pub type Cell = BTreeMap<Symbol, ChartEntry>;

/// Inserts `entry` for `symbol` unless `cell` holds one that is at least as
/// cheap. Returns whether the cell changed.
pub fn improve(cell: &mut Cell, symbol: &Symbol, entry: ChartEntry) -> bool {
    match cell.get_mut(symbol) {
        Some(known) if known.cost <= entry.cost => false,
        Some(known) => {
            *known = entry;
            true
        }
        None => {
            cell.insert(symbol.clone(), entry);
            true
        }
    }
}

/// A triangular CKY chart over a sentence of `n` tokens; the cell for
/// `(length, start)` covers the tokens `start .. start + length`.
#[derive(Debug, Clone)]
pub struct Chart {
    n: usize,
    cells: Vec<Cell>,
}

impl Chart {
    pub fn new(n: usize) -> Self {
        Chart {
            n,
            cells: vec![Cell::new(); n * (n + 1) / 2],
        }
    }

    fn index(&self, length: usize, start: usize) -> usize {
        debug_assert!(length >= 1 && start + length <= self.n);
        // cells of shorter spans come first, each length l has n - l + 1 starts
        let shorter = length - 1;
        shorter * (self.n + 1) - shorter * (shorter + 1) / 2 + start
    }

    pub fn cell(&self, length: usize, start: usize) -> &Cell {
        &self.cells[self.index(length, start)]
    }

    pub fn cell_mut(&mut self, length: usize, start: usize) -> &mut Cell {
        let index = self.index(length, start);
        &mut self.cells[index]
    }

    pub fn get(&self, length: usize, start: usize, symbol: &Symbol) -> Option<&ChartEntry> {
        self.cell(length, start).get(symbol)
    }

    /// Number of entries over all cells.
    pub fn size(&self) -> usize {
        self.cells.iter().map(Cell::len).sum()
    }

    /// Rebuilds the tree of the entry for `symbol` over the given span by
    /// following backtraces.
    pub fn tree<S: AsRef<str>>(
        &self,
        tokens: &[S],
        length: usize,
        start: usize,
        symbol: &Symbol,
    ) -> Option<ParseNode> {
        let mut agenda = vec![Step::Expand {
            length,
            start,
            symbol,
        }];
        let mut built: Vec<ParseNode> = Vec::new();

        while let Some(step) = agenda.pop() {
            match step {
                Step::Expand {
                    length,
                    start,
                    symbol,
                } => match &self.get(length, start, symbol)?.backtrace {
                    Backtrace::Token => built.push(ParseNode::leaf(tokens[start].as_ref())),
                    Backtrace::Lexical | Backtrace::Fallback => built.push(ParseNode::node(
                        symbol.text(),
                        vec![ParseNode::leaf(tokens[start].as_ref())],
                    )),
                    Backtrace::Unary { child } => {
                        agenda.push(Step::Assemble { symbol, arity: 1 });
                        agenda.push(Step::Expand {
                            length,
                            start,
                            symbol: child,
                        });
                    }
                    Backtrace::Binary { split, left, right } => {
                        agenda.push(Step::Assemble { symbol, arity: 2 });
                        agenda.push(Step::Expand {
                            length: length - split,
                            start: start + split,
                            symbol: right,
                        });
                        agenda.push(Step::Expand {
                            length: *split,
                            start,
                            symbol: left,
                        });
                    }
                },
                Step::Assemble { symbol, arity } => {
                    let children = built.split_off(built.len().checked_sub(arity)?);
                    built.push(ParseNode::node(symbol.text(), children));
                }
            }
        }
        built.pop()
    }
}

/// Pending work while rebuilding a tree: expanding an entry, or putting the
/// last `arity` finished subtrees under `symbol`.
enum Step<'a> {
    Expand {
        length: usize,
        start: usize,
        symbol: &'a Symbol,
    },
    Assemble {
        symbol: &'a Symbol,
        arity: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn indices_are_distinct() {
        for n in 1..8 {
            let chart = Chart::new(n);
            let mut seen = Vec::new();
            for length in 1..=n {
                for start in 0..=(n - length) {
                    seen.push(chart.index(length, start));
                }
            }
            let expected: Vec<usize> = (0..n * (n + 1) / 2).collect();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn only_cheaper_entries_replace() {
        let mut cell = Cell::new();
        let a = Symbol::nonterminal("A");
        let entry = |cost: f64, child: &str| ChartEntry {
            cost: Cost::from_value(cost).unwrap(),
            backtrace: Backtrace::Unary {
                child: Symbol::nonterminal(child),
            },
        };
        assert!(improve(&mut cell, &a, entry(1.0, "B")));
        assert!(!improve(&mut cell, &a, entry(1.0, "C")));
        assert!(!improve(&mut cell, &a, entry(2.0, "C")));
        assert!(improve(&mut cell, &a, entry(0.5, "D")));
        assert_eq!(cell[&a], entry(0.5, "D"));
    }

    #[test]
    fn tree_from_backtraces() {
        let tokens = ["dog", "barks"];
        let mut chart = Chart::new(2);
        let entry = |backtrace| ChartEntry {
            cost: Cost::one(),
            backtrace,
        };
        let s = Symbol::nonterminal("S");
        let np = Symbol::nonterminal("NP");
        let vp = Symbol::nonterminal("VP");
        chart.cell_mut(1, 0).insert(np.clone(), entry(Backtrace::Lexical));
        chart.cell_mut(1, 1).insert(Symbol::terminal("barks"), entry(Backtrace::Token));
        chart.cell_mut(1, 1).insert(
            vp.clone(),
            entry(Backtrace::Unary {
                child: Symbol::terminal("barks"),
            }),
        );
        chart.cell_mut(2, 0).insert(
            s.clone(),
            entry(Backtrace::Binary {
                split: 1,
                left: np,
                right: vp,
            }),
        );

        assert_eq!(chart.size(), 4);
        assert_eq!(
            chart.tree(&tokens, 2, 0, &s).unwrap().to_string(),
            "(S (NP dog) (VP barks))"
        );
        assert!(chart.tree(&tokens, 2, 0, &Symbol::nonterminal("X")).is_none());
    }
}
