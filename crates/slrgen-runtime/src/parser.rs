//! The shift-reduce parser engine.

use crate::{
    definition::{ParseAction, ParseTable},
    tree::ParseTreeNode,
};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token {
    /// Return the terminal name used to look up the parse table.
    fn name(&self) -> &str;
}

impl Token for &str {
    fn name(&self) -> &str {
        self
    }
}

impl Token for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

/// Parse the token sequence with the specified parse table.
///
/// The end of input is implied after the last token.
pub fn parse<'t, TDef, TTok, I>(
    definition: &'t TDef,
    tokens: I,
) -> Result<ParseTreeNode<'t, TTok>, ParseError<TDef::State, TTok>>
where
    TDef: ParseTable + ?Sized,
    TTok: Token + fmt::Debug,
    I: IntoIterator<Item = TTok>,
{
    Parser::new(definition).parse(tokens)
}

/// The parser driven based on a parse table.
///
/// Each instance owns the stacks of a single parse call, while the
/// table is only borrowed and never modified.
pub struct Parser<'t, TDef, TTok>
where
    TDef: ParseTable + ?Sized,
{
    definition: &'t TDef,
    state_stack: Vec<TDef::State>,
    node_stack: Vec<ParseTreeNode<'t, TTok>>,
}

impl<TDef, TTok> fmt::Debug for Parser<'_, TDef, TTok>
where
    TDef: ParseTable + ?Sized,
    TTok: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("state_stack", &self.state_stack)
            .field("node_stack", &self.node_stack)
            .finish_non_exhaustive()
    }
}

impl<'t, TDef, TTok> Parser<'t, TDef, TTok>
where
    TDef: ParseTable + ?Sized,
    TTok: Token + fmt::Debug,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: &'t TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            state_stack: vec![initial_state],
            node_stack: vec![],
        }
    }

    /// Drive the automaton until the input is accepted or rejected.
    pub fn parse<I>(
        mut self,
        tokens: I,
    ) -> Result<ParseTreeNode<'t, TTok>, ParseError<TDef::State, TTok>>
    where
        I: IntoIterator<Item = TTok>,
    {
        let span = tracing::trace_span!("parse");
        let _entered = span.enter();

        let mut tokens = tokens.into_iter();
        let mut lookahead = tokens.next();

        loop {
            let current = *self
                .state_stack
                .last()
                .ok_or(ParseError::InconsistentStack)?;

            let action = self
                .definition
                .action(current, lookahead.as_ref().map(|t| t.name()));

            match action {
                ParseAction::Shift(next) => {
                    // The end of input is never shifted.
                    let token = lookahead.take().ok_or(ParseError::InconsistentStack)?;
                    tracing::trace!("shift {:?} -> {:?}", token, next);
                    self.state_stack.push(next);
                    self.node_stack.push(ParseTreeNode::Leaf(token));
                    lookahead = tokens.next();
                }

                ParseAction::Reduce { lhs, len } => {
                    if len > self.node_stack.len() || len >= self.state_stack.len() {
                        return Err(ParseError::InconsistentStack);
                    }
                    let popped = current;
                    let children = self.node_stack.split_off(self.node_stack.len() - len);
                    self.state_stack.truncate(self.state_stack.len() - len);

                    let top = *self
                        .state_stack
                        .last()
                        .ok_or(ParseError::InconsistentStack)?;
                    let symbol = self.definition.symbol_name(lhs);
                    let next = self.definition.goto(top, lhs).ok_or_else(|| {
                        ParseError::MissingGoto {
                            state: top,
                            symbol: symbol.to_owned(),
                        }
                    })?;
                    tracing::trace!("reduce {} ({} nodes), goto {:?}", symbol, len, next);

                    // A unit reduction back into the same state leaves the
                    // stacks as they were and would repeat forever.
                    if len == 1 && next == popped {
                        return Err(ParseError::CyclicReduce {
                            state: next,
                            symbol: symbol.to_owned(),
                        });
                    }

                    self.state_stack.push(next);
                    self.node_stack.push(ParseTreeNode::Node { symbol, children });
                }

                ParseAction::Accept => {
                    tracing::trace!("accepted");
                    let root = self.node_stack.pop().ok_or(ParseError::InconsistentStack)?;
                    if !self.node_stack.is_empty() {
                        return Err(ParseError::InconsistentStack);
                    }
                    return Ok(root);
                }

                ParseAction::Error => {
                    tracing::debug!(
                        "syntax error: states={:?}, lookahead={:?}",
                        self.state_stack,
                        lookahead
                    );
                    let states = self.state_stack;
                    return Err(match lookahead {
                        Some(token) => ParseError::UnexpectedToken { states, token },
                        None => ParseError::UnexpectedEOI { states },
                    });
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<TState: fmt::Debug, TTok: fmt::Debug> {
    #[error("unexpected token {token:?} (state stack: {states:?})")]
    UnexpectedToken { states: Vec<TState>, token: TTok },

    #[error("unexpected end of input (state stack: {states:?})")]
    UnexpectedEOI { states: Vec<TState> },

    #[error("no goto entry for `{symbol}' in state {state:?}")]
    MissingGoto { state: TState, symbol: String },

    #[error("reducing to `{symbol}' in state {state:?} does not consume any input")]
    CyclicReduce { state: TState, symbol: String },

    #[error("inconsistent parser stacks")]
    InconsistentStack,
}

impl<TState: fmt::Debug, TTok: fmt::Debug> ParseError<TState, TTok> {
    /// Return the state stack at the point the error was detected, bottom first.
    pub fn states(&self) -> &[TState] {
        match self {
            Self::UnexpectedToken { states, .. } | Self::UnexpectedEOI { states } => {
                &states[..]
            }
            _ => &[],
        }
    }

    /// Return the offending token, or `None` when the end of input was reached.
    pub fn token(&self) -> Option<&TTok> {
        match self {
            Self::UnexpectedToken { token, .. } => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // E := E + n | n
    struct Table;

    impl ParseTable for Table {
        type State = usize;
        type Symbol = ();

        fn initial_state(&self) -> usize {
            0
        }

        fn action(&self, current: usize, lookahead: Option<&str>) -> ParseAction<usize, ()> {
            use ParseAction::*;
            match (current, lookahead) {
                (0, Some("n")) => Shift(2),
                (1, None) => Accept,
                (1, Some("+")) => Shift(3),
                (2, None | Some("+")) => Reduce { lhs: (), len: 1 },
                (3, Some("n")) => Shift(4),
                (4, None | Some("+")) => Reduce { lhs: (), len: 3 },
                _ => Error,
            }
        }

        fn goto(&self, current: usize, _: ()) -> Option<usize> {
            match current {
                0 => Some(1),
                _ => None,
            }
        }

        fn symbol_name(&self, _: ()) -> &str {
            "E"
        }
    }

    #[test]
    fn accepts_sentence() {
        let tree = parse(&Table, ["n", "+", "n", "+", "n"]).unwrap();
        assert_eq!(tree.sexp().to_string(), "E(E(E(n), +, n), +, n)");
        assert_eq!(tree.leaves().copied().collect::<Vec<_>>(), ["n", "+", "n", "+", "n"]);
    }

    #[test]
    fn table_is_reusable() {
        let table = Table;
        for _ in 0..3 {
            let tree = parse(&table, ["n"]).unwrap();
            assert_eq!(tree.sexp().to_string(), "E(n)");
        }
    }

    #[test]
    fn rejects_unexpected_token() {
        let err = parse(&Table, ["n", "n"]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { ref states, token: "n" } if states[..] == [0, 2]
        ));
        assert_eq!(err.token(), Some(&"n"));
    }

    #[test]
    fn rejects_premature_end_of_input() {
        let err = parse(&Table, ["n", "+"]).unwrap_err();
        assert_eq!(err.states(), [0, 1, 3]);
        assert!(err.token().is_none());
    }

    #[test]
    fn rejects_empty_input() {
        let err = parse(&Table, Vec::<&str>::new()).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEOI { ref states } if states[..] == [0]));
    }

    // A := A | x, where the reduction of `A -> A` leads back to state 1.
    struct UnitLoop;

    impl ParseTable for UnitLoop {
        type State = usize;
        type Symbol = ();

        fn initial_state(&self) -> usize {
            0
        }

        fn action(&self, current: usize, lookahead: Option<&str>) -> ParseAction<usize, ()> {
            use ParseAction::*;
            match (current, lookahead) {
                (0, Some("x")) => Shift(2),
                (1 | 2, None) => Reduce { lhs: (), len: 1 },
                _ => Error,
            }
        }

        fn goto(&self, current: usize, _: ()) -> Option<usize> {
            match current {
                0 => Some(1),
                _ => None,
            }
        }

        fn symbol_name(&self, _: ()) -> &str {
            "A"
        }
    }

    #[test]
    fn unit_reduce_loop_is_an_error() {
        let err = parse(&UnitLoop, ["x"]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::CyclicReduce { state: 1, ref symbol } if symbol == "A"
        ));
    }

    #[test]
    fn rejects_unknown_terminal() {
        let err = parse(&Table, ["n", "-", "n"]).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { token: "-", .. }));
    }
}
