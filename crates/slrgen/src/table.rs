//! Calculation of SLR(1) parse table.

use crate::{
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::{
        AugmentedGrammar, Grammar, GrammarDefError, NonterminalID, RuleID, SymbolID, TerminalID,
    },
    lr0::{ItemSetBuilder, LR0Automaton, StateID},
    types::{Map, Set},
    util::display_fn,
};
use slrgen_runtime::{ParseAction, ParseError, ParseTreeNode, Token};
use std::fmt;

/// How the builder treats ACTION cells claimed by more than one action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Keep the first computed action and report the others.
    #[default]
    Warn,

    /// Fail the build if any conflict is found.
    Deny,
}

#[derive(Debug)]
pub struct Config {
    conflict_policy: ConflictPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Warn,
        }
    }

    pub fn conflict_policy(&mut self, policy: ConflictPolicy) -> &mut Self {
        self.conflict_policy = policy;
        self
    }

    /// Reject grammars that are not SLR(1) instead of resolving their conflicts.
    pub fn deny_conflicts(&mut self, enabled: bool) -> &mut Self {
        self.conflict_policy = if enabled {
            ConflictPolicy::Deny
        } else {
            ConflictPolicy::Warn
        };
        self
    }

    /// Build the SLR(1) parse table for `grammar`.
    pub fn build(&self, grammar: &Grammar) -> Result<ParsingTable, TableError> {
        ParsingTable::generate_with_config(grammar, self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to augment the grammar")]
    Grammar(
        #[from]
        #[source]
        GrammarDefError,
    ),

    #[error("the grammar is not SLR(1): {} conflict(s) detected", .0.len())]
    Conflicts(Vec<Conflict>),

    /// Some nonterminals derive themselves (`A =>+ A`), so a parse may never end.
    #[error("cyclic derivation of {}", .0.join(", "))]
    Cyclic(Vec<String>),
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Action::Shift(n) => write!(f, "shift({:?})", n),
            Action::Reduce(r) => write!(f, "reduce({})", g.rule(*r).display(g)),
            Action::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Default)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    AcceptReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ShiftReduce => "shift/reduce",
            Self::ReduceReduce => "reduce/reduce",
            Self::AcceptReduce => "accept/reduce",
        })
    }
}

/// A cell of the ACTION table that more than one action competed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: TerminalID,
    /// The action left in the table.
    pub kept: Action,
    /// The action computed later and dropped.
    pub discarded: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match (self.kept, self.discarded) {
            (Action::Reduce(..), Action::Reduce(..)) => ConflictKind::ReduceReduce,
            (Action::Accept, _) | (_, Action::Accept) => ConflictKind::AcceptReduce,
            _ => ConflictKind::ShiftReduce,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "{} conflict in state {:?} on `{}': kept {}, discarded {}",
                self.kind(),
                self.state,
                g.terminals[&self.lookahead],
                self.kept.display(g),
                self.discarded.display(g),
            )
        })
    }
}

/// The ACTION/GOTO tables of an SLR(1) parser.
///
/// The table is immutable once generated and can be shared by any number
/// of parses, including from several threads at once.
#[derive(Debug)]
pub struct ParsingTable {
    grammar: AugmentedGrammar,
    states: Map<StateID, ParseTableRow>,
    start: StateID,
    conflicts: Vec<Conflict>,
    terminal_index: Map<String, TerminalID>,
}

impl ParsingTable {
    pub fn generate(grammar: &Grammar) -> Result<Self, TableError> {
        Self::generate_with_config(grammar, &Config::new())
    }

    #[tracing::instrument(skip_all)]
    pub fn generate_with_config(grammar: &Grammar, config: &Config) -> Result<Self, TableError> {
        let grammar = AugmentedGrammar::new(grammar)?;
        let first_sets = FirstSets::new(&grammar);
        let follow_sets = FollowSets::new(&grammar, &first_sets);

        let cyclic = cyclic_nonterminals(&grammar, &first_sets);
        if !cyclic.is_empty() {
            let names = cyclic
                .into_iter()
                .map(|n| grammar.nonterminals[&n].name().to_owned())
                .collect();
            return Err(TableError::Cyclic(names));
        }

        let lr0 = ItemSetBuilder::new(&grammar).canonical_collection();

        let (states, conflicts) = fill_rows(&grammar, &lr0, &follow_sets);

        for conflict in &conflicts {
            tracing::warn!("{}", conflict.display(&grammar));
        }
        if config.conflict_policy == ConflictPolicy::Deny && !conflicts.is_empty() {
            return Err(TableError::Conflicts(conflicts));
        }

        let terminal_index = grammar
            .terminals
            .values()
            .filter(|t| t.id() != TerminalID::EOI)
            .map(|t| (t.name().to_owned(), t.id()))
            .collect();

        tracing::debug!(
            "parse table: {} states, {} conflict(s)",
            states.len(),
            conflicts.len()
        );

        Ok(Self {
            grammar,
            states,
            start: lr0.start,
            conflicts,
            terminal_index,
        })
    }

    /// Return the augmented grammar this table was generated from.
    pub fn grammar(&self) -> &AugmentedGrammar {
        &self.grammar
    }

    pub fn start_state(&self) -> StateID {
        self.start
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &ParseTableRow)> + '_ {
        self.states.iter().map(|(id, row)| (*id, row))
    }

    pub fn row(&self, state: StateID) -> Option<&ParseTableRow> {
        self.states.get(&state)
    }

    /// Return the entry of the ACTION table, if any.
    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.states.get(&state)?.actions.get(&lookahead).copied()
    }

    /// Return the entry of the GOTO table, if any.
    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&symbol).copied()
    }

    /// The conflicts found (and resolved) while filling the table.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Parse the token sequence using this table.
    pub fn parse<TTok, I>(
        &self,
        tokens: I,
    ) -> Result<ParseTreeNode<'_, TTok>, ParseError<StateID, TTok>>
    where
        TTok: Token + fmt::Debug,
        I: IntoIterator<Item = TTok>,
    {
        slrgen_runtime::parse(self, tokens)
    }
}

impl fmt::Display for ParsingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.grammar;
        for (i, (id, row)) in self.states.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            write!(f, "#### State {:?}", id)?;
            if *id == self.start {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
            writeln!(f, "## actions")?;
            for (token, action) in &row.actions {
                writeln!(f, "- {} => {}", g.terminals[token], action.display(g))?;
            }
            writeln!(f, "## gotos")?;
            for (symbol, goto) in &row.gotos {
                writeln!(f, "- {} => goto({:?})", g.nonterminals[symbol], goto)?;
            }
        }

        if !self.conflicts.is_empty() {
            writeln!(f, "\n## conflicts")?;
            for conflict in &self.conflicts {
                writeln!(f, "- {}", conflict.display(g))?;
            }
        }

        Ok(())
    }
}

impl slrgen_runtime::ParseTable for ParsingTable {
    type State = StateID;
    type Symbol = NonterminalID;

    fn initial_state(&self) -> Self::State {
        self.start
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<&str>,
    ) -> ParseAction<Self::State, Self::Symbol> {
        let lookahead = match lookahead {
            Some(name) => match self.terminal_index.get(name) {
                Some(t) => *t,
                None => return ParseAction::Error,
            },
            None => TerminalID::EOI,
        };
        match ParsingTable::action(self, current, lookahead) {
            Some(Action::Shift(next)) => ParseAction::Shift(next),
            Some(Action::Reduce(rule)) => {
                let rule = self.grammar.rule(rule);
                ParseAction::Reduce {
                    lhs: rule.left(),
                    len: rule.right().len(),
                }
            }
            Some(Action::Accept) => ParseAction::Accept,
            None => ParseAction::Error,
        }
    }

    fn goto(&self, current: Self::State, symbol: Self::Symbol) -> Option<Self::State> {
        ParsingTable::goto(self, current, symbol)
    }

    fn symbol_name(&self, symbol: Self::Symbol) -> &str {
        self.grammar.nonterminals[&symbol].name()
    }
}

/// Collect the nonterminals `A` with `A =>+ A`.
///
/// `A -> α B β` with nullable `α` and `β` gives the edge `A -> B`; a
/// nonterminal is cyclic if it can reach itself through these edges.
fn cyclic_nonterminals(g: &Grammar, first_sets: &FirstSets) -> Vec<NonterminalID> {
    let mut edges: Map<NonterminalID, Set<NonterminalID>> = Map::default();
    for rule in g.rules.values() {
        let right = rule.right();
        for (i, symbol) in right.iter().enumerate() {
            let b = match symbol {
                SymbolID::N(b) => *b,
                SymbolID::T(..) => continue,
            };
            let others_nullable = right
                .iter()
                .enumerate()
                .all(|(j, s)| j == i || first_sets.is_nullable(*s));
            if others_nullable {
                edges.entry(rule.left()).or_default().insert(b);
            }
        }
    }

    let mut cyclic = vec![];
    for &a in g.nonterminals.keys() {
        let mut visited = Set::default();
        let mut pending: Vec<NonterminalID> =
            edges.get(&a).into_iter().flatten().copied().collect();
        while let Some(n) = pending.pop() {
            if n == a {
                cyclic.push(a);
                break;
            }
            if visited.insert(n) {
                pending.extend(edges.get(&n).into_iter().flatten().copied());
            }
        }
    }
    cyclic
}

/// Fill the ACTION/GOTO rows of every state.
///
/// Cells are claimed in the order accept, shifts (in item order) and
/// reduces (in rule order); a later claim never overwrites an earlier one.
fn fill_rows(
    g: &AugmentedGrammar,
    lr0: &LR0Automaton,
    follow_sets: &FollowSets,
) -> (Map<StateID, ParseTableRow>, Vec<Conflict>) {
    let mut states = Map::default();
    let mut conflicts = vec![];

    for (&id, lr0_state) in &lr0.states {
        let mut row = ParseTableRow::default();
        let mut claim = |row: &mut ParseTableRow, lookahead: TerminalID, action: Action| {
            match row.actions.get(&lookahead) {
                None => {
                    row.actions.insert(lookahead, action);
                }
                Some(kept) if *kept == action => (),
                Some(kept) => conflicts.push(Conflict {
                    state: id,
                    lookahead,
                    kept: *kept,
                    discarded: action,
                }),
            }
        };

        let complete: Vec<_> = lr0_state
            .items
            .iter()
            .filter(|item| item.is_complete(g))
            .collect();

        if complete.iter().any(|item| item.rule == g.accept_rule()) {
            claim(&mut row, TerminalID::EOI, Action::Accept);
        }

        for (symbol, &next) in &lr0_state.transitions {
            match *symbol {
                SymbolID::T(t) => claim(&mut row, t, Action::Shift(next)),
                SymbolID::N(n) => {
                    row.gotos.insert(n, next);
                }
            }
        }

        // Items are sorted by rule, hence reduces come in declaration order.
        for item in complete.iter().filter(|item| item.rule != g.accept_rule()) {
            let left = g.rule(item.rule).left();
            for t in follow_sets.get(left).iter() {
                claim(&mut row, t, Action::Reduce(item.rule));
            }
        }

        states.insert(id, row);
    }

    (states, conflicts)
}
