//! Calculation of FIRST sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet, EPSILON},
    types::{Map, Set},
    util::{display_fn, write_separated},
};
use std::fmt;

/// `FIRST(α)`: the terminals that can begin a string derived from `α`,
/// plus epsilon when `α` can derive the empty string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FirstSet {
    terminals: TerminalSet,
    nullable: bool,
}

impl FirstSet {
    pub fn epsilon() -> Self {
        Self {
            terminals: TerminalSet::default(),
            nullable: true,
        }
    }

    pub fn contains(&self, id: TerminalID) -> bool {
        self.terminals.contains(id)
    }

    pub fn contains_epsilon(&self) -> bool {
        self.nullable
    }

    /// The terminal part of this set, i.e. `FIRST(α) \ {ε}`.
    pub fn terminals(&self) -> &TerminalSet {
        &self.terminals
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            let terminals = self.terminals.iter().map(|t| g.terminals[&t].name());
            let epsilon = self.nullable.then_some(EPSILON);
            write_separated(f, ", ", terminals.chain(epsilon))?;
            f.write_str("}")
        })
    }
}

#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    first_sets: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar) -> Self {
        let nulls = nulls_set(grammar);
        let first_sets = first_sets(grammar, &nulls);
        tracing::debug!("nullable nonterminals = {}", nulls.len());
        Self { nulls, first_sets }
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        match symbol {
            SymbolID::T(..) => false,
            SymbolID::N(n) => self.nulls.contains(&n),
        }
    }

    /// `FIRST(X)` for a single grammar symbol.
    pub fn first(&self, symbol: SymbolID) -> FirstSet {
        self.first_of(&[symbol])
    }

    /// `FIRST(Y1 Y2 ... Yk)`; the empty sequence yields `{ε}`.
    pub fn first_of(&self, symbols: &[SymbolID]) -> FirstSet {
        let mut res = FirstSet::epsilon();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    res.terminals.insert(*t);
                }
                SymbolID::N(n) => {
                    if let Some(added) = self.first_sets.get(n) {
                        res.terminals.union_with(added);
                    }
                }
            }
            if !self.is_nullable(*symbol) {
                res.nullable = false;
                break;
            }
        }
        res
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    // Rules with an empty right-hand side are trivially nullable.
    let mut nulls: Set<NonterminalID> = grammar
        .rules
        .values()
        .filter_map(|rule| rule.right().is_empty().then_some(rule.left()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules.values() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule
                .right()
                .iter()
                .all(|s| matches!(s, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
            }
        }
    }

    nulls
}

fn first_sets(grammar: &Grammar, nulls: &Set<NonterminalID>) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = grammar
        .nonterminals
        .keys()
        .map(|id| (*id, TerminalSet::default()))
        .collect();

    // For X -> Y1 Y2 ... Yn, scan Y1, Y2, ... up to the first non-nullable
    // symbol Yk. Terminals among them go into FIRST(X) directly, and each
    // nonterminal Yi yields the constraint FIRST(X) ⊇ FIRST(Yi).
    #[derive(Debug)]
    struct Constraint {
        sup: NonterminalID,
        sub: NonterminalID,
    }
    let mut constraints = vec![];
    for rule in grammar.rules.values() {
        for symbol in rule.right() {
            match symbol {
                SymbolID::T(t) => {
                    map[&rule.left()].insert(*t);
                    break;
                }
                SymbolID::N(n) => {
                    if *n != rule.left() {
                        constraints.push(Constraint {
                            sup: rule.left(),
                            sub: *n,
                        });
                    }
                    if !nulls.contains(n) {
                        break;
                    }
                }
            }
        }
    }

    // Propagate until every constraint holds.
    let mut changed = true;
    let mut rounds = 0;
    while changed {
        changed = false;
        rounds += 1;
        for Constraint { sup, sub } in &constraints {
            let subset = map[sub].clone();
            changed |= map[sup].union_with(&subset);
        }
    }
    tracing::trace!("FIRST sets converged after {} rounds", rounds);

    map
}
