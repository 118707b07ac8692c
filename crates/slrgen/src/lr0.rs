//! The canonical collection of LR(0) item sets.

use crate::{
    grammar::{AugmentedGrammar, Grammar, NonterminalID, RuleID, SymbolID},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StateID {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

/// The LR(0) item, a.k.a. LR item core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub rule: RuleID,
    pub marker: u16,
}

impl LR0Item {
    pub const fn new(rule: RuleID, marker: u16) -> Self {
        Self { rule, marker }
    }

    /// Return the symbol immediately after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(usize::from(self.marker)).copied()
    }

    /// Whether the marker has reached the end of the rule.
    pub fn is_complete(&self, g: &Grammar) -> bool {
        usize::from(self.marker) >= g.rule(self.rule).right().len()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "{} ->", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == usize::from(self.marker) {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if rule.right().len() == usize::from(self.marker) {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A set of LR(0) items, kept sorted and deduplicated so that
/// equal sets compare and hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ItemSet {
    items: Vec<LR0Item>,
}

impl ItemSet {
    pub fn iter(&self) -> impl Iterator<Item = &LR0Item> + '_ {
        self.items.iter()
    }

    pub fn contains(&self, item: &LR0Item) -> bool {
        self.items.binary_search(item).is_ok()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for item in &self.items {
                writeln!(f, "- {}", item.display(g))?;
            }
            Ok(())
        })
    }
}

impl FromIterator<LR0Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = LR0Item>>(iter: I) -> Self {
        let mut items: Vec<_> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self { items }
    }
}

#[derive(Debug, Clone)]
pub struct LR0State {
    pub items: ItemSet,
    /// `goto(I, X)` for every symbol `X` that appears right after a marker.
    pub transitions: Map<SymbolID, StateID>,
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
    pub start: StateID,
}

impl LR0Automaton {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## items:")?;
                write!(f, "{}", state.items.display(g))?;
                if !state.transitions.is_empty() {
                    writeln!(f, "## transitions:")?;
                    for (symbol, next) in &state.transitions {
                        writeln!(f, "- {} => {:?}", g.symbol_name(*symbol), next)?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Computes closures, gotos and the canonical collection of an augmented grammar.
#[derive(Debug)]
pub struct ItemSetBuilder<'g> {
    grammar: &'g AugmentedGrammar,
    rules_by_left: Map<NonterminalID, Vec<RuleID>>,
}

impl<'g> ItemSetBuilder<'g> {
    pub fn new(grammar: &'g AugmentedGrammar) -> Self {
        let mut rules_by_left: Map<NonterminalID, Vec<RuleID>> = Map::default();
        for (id, rule) in &grammar.rules {
            rules_by_left.entry(rule.left()).or_default().push(*id);
        }
        Self {
            grammar,
            rules_by_left,
        }
    }

    /// `closure(I)`
    ///
    /// For an epsilon rule `X -> ε`, the added item `[X -> .]` is
    /// already complete.
    pub fn closure<I>(&self, items: I) -> ItemSet
    where
        I: IntoIterator<Item = LR0Item>,
    {
        let mut closure: Set<LR0Item> = Set::default();
        let mut pending = vec![];
        for item in items {
            if closure.insert(item) {
                pending.push(item);
            }
        }

        while let Some(item) = pending.pop() {
            let x = match item.next_symbol(self.grammar) {
                Some(SymbolID::N(x)) => x,
                _ => continue,
            };
            for rule in self.rules_by_left.get(&x).into_iter().flatten() {
                let added = LR0Item::new(*rule, 0);
                if closure.insert(added) {
                    pending.push(added);
                }
            }
        }

        closure.into_iter().collect()
    }

    /// `goto(I, X)`
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        let kernels = items
            .iter()
            .filter(|item| item.next_symbol(self.grammar) == Some(symbol))
            .map(|item| LR0Item::new(item.rule, item.marker + 1));
        self.closure(kernels)
    }

    /// Build the canonical collection of LR(0) item sets.
    ///
    /// States are numbered in breadth-first order from the start state
    /// `closure({[S' -> . S]})`.
    #[tracing::instrument(skip_all)]
    pub fn canonical_collection(&self) -> LR0Automaton {
        let start_items = self.closure([LR0Item::new(self.grammar.accept_rule(), 0)]);
        let start = StateID(0);

        // item set -> state, numbered in insertion order
        let mut index = Map::<ItemSet, StateID>::default();
        index.insert(start_items.clone(), start);

        let mut states = Map::<StateID, LR0State>::default();
        let mut pending = VecDeque::<(StateID, ItemSet)>::new();
        pending.push_back((start, start_items));

        while let Some((current, items)) = pending.pop_front() {
            // symbols right after the markers, in item order
            let symbols: Set<SymbolID> = items
                .iter()
                .filter_map(|item| item.next_symbol(self.grammar))
                .collect();

            let mut transitions = Map::default();
            for symbol in symbols {
                let next_items = self.goto(&items, symbol);
                let next = match index.get(&next_items) {
                    Some(id) => *id,
                    None => {
                        let id = StateID(index.len() as u32);
                        index.insert(next_items.clone(), id);
                        pending.push_back((id, next_items));
                        id
                    }
                };
                transitions.insert(symbol, next);
            }

            states.insert(current, LR0State { items, transitions });
        }

        tracing::debug!("canonical collection: {} states", states.len());

        LR0Automaton { states, start }
    }
}
