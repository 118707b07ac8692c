//! Calculation of FOLLOW sets.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::Map,
};

#[derive(Debug)]
pub struct FollowSets {
    follow_sets: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    /// Compute `FOLLOW(A)` for every nonterminal `A` of the grammar.
    ///
    /// The end of input always follows the start symbol of `grammar`, so
    /// this is expected to be called with an augmented grammar.
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let mut follow_sets: Map<NonterminalID, TerminalSet> = grammar
            .nonterminals
            .keys()
            .map(|id| (*id, TerminalSet::default()))
            .collect();
        follow_sets[&grammar.start_symbol].insert(TerminalID::EOI);

        // For A -> α B β:
        //  1. FOLLOW(B) ⊇ FIRST(β) \ {ε}
        //  2. FOLLOW(B) ⊇ FOLLOW(A) if β is nullable
        let mut changed = true;
        let mut passes = 0;
        while changed {
            changed = false;
            passes += 1;
            for rule in grammar.rules.values() {
                let right = rule.right();
                for (i, symbol) in right.iter().enumerate() {
                    let b = match symbol {
                        SymbolID::N(b) => *b,
                        SymbolID::T(..) => continue,
                    };
                    let first_beta = first_sets.first_of(&right[i + 1..]);
                    changed |= follow_sets[&b].union_with(first_beta.terminals());
                    if first_beta.contains_epsilon() && b != rule.left() {
                        let follow_a = follow_sets[&rule.left()].clone();
                        changed |= follow_sets[&b].union_with(&follow_a);
                    }
                }
            }
        }
        tracing::trace!("FOLLOW sets converged after {} passes", passes);

        Self { follow_sets }
    }

    pub fn get(&self, id: NonterminalID) -> &TerminalSet {
        &self.follow_sets[&id]
    }
}
