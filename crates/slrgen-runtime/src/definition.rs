//! Parser definition.

/// The trait for abstracting the generated SLR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR automaton.
    type State: Copy + PartialEq + std::fmt::Debug;

    /// The number to identify the nonterminal symbols.
    type Symbol: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead terminal name.
    ///
    /// If there is no lookahead symbol, a `None` is passsed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<&str>,
    ) -> ParseAction<Self::State, Self::Symbol>;

    /// Return the state to transition to after reducing to `symbol`
    /// in the state `current`.
    fn goto(&self, current: Self::State, symbol: Self::Symbol) -> Option<Self::State>;

    /// Return the display name of a nonterminal symbol.
    fn symbol_name(&self, symbol: Self::Symbol) -> &str;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<&str>,
    ) -> ParseAction<Self::State, Self::Symbol> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Symbol) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }

    fn symbol_name(&self, symbol: Self::Symbol) -> &str {
        (**self).symbol_name(symbol)
    }
}

impl<T: ?Sized> ParseTable for std::sync::Arc<T>
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<&str>,
    ) -> ParseAction<Self::State, Self::Symbol> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, symbol: Self::Symbol) -> Option<Self::State> {
        (**self).goto(current, symbol)
    }

    fn symbol_name(&self, symbol: Self::Symbol) -> &str {
        (**self).symbol_name(symbol)
    }
}

/// The action that the automaton performs for a (state, lookahead) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction<TState, TSymbol> {
    /// Consume the lookahead and move to the given state.
    Shift(TState),

    /// Pop `len` entries and reduce them into `lhs`.
    Reduce { lhs: TSymbol, len: usize },

    Accept,

    /// No action is defined for the lookahead.
    Error,
}
