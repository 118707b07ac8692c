//! Loader for the line-based grammar file format.
//!
//! ```text
//! # comment
//! E , T , F
//! + , * , id
//! E -> E + T | T
//! T -> T * F | F
//! F -> id
//! ```
//!
//! The first line declares the nonterminals (the first one is the start
//! symbol) and the second one the terminals. Each remaining line adds the
//! alternatives of a production. `ε` (or `epsilon`) denotes the empty string.

use crate::grammar::{Grammar, GrammarDef, GrammarDefError, SymbolID, EPSILON};
use crate::types::Map;

const EPSILON_ALIAS: &str = "epsilon";

pub fn parse(source: &str) -> Result<Grammar, GrammarDefError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut lines = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let (nonterminals_line, nonterminals) = lines.next().ok_or(GrammarDefError::Syntax {
        line: 1,
        msg: "missing nonterminal declarations".into(),
    })?;
    let (terminals_line, terminals) = lines.next().ok_or(GrammarDefError::Syntax {
        line: nonterminals_line + 1,
        msg: "missing terminal declarations".into(),
    })?;

    Grammar::define(|g| {
        let mut symbols = Map::<&str, SymbolID>::default();
        for name in split_list(nonterminals) {
            let id = g.nonterminal(name).map_err(|e| at(nonterminals_line, e))?;
            symbols.insert(name, id.into());
        }
        for name in split_list(terminals) {
            let id = g.terminal(name).map_err(|e| at(terminals_line, e))?;
            symbols.insert(name, id.into());
        }

        for (line, text) in lines {
            parse_rule(g, &symbols, line, text)?;
        }

        Ok(())
    })
}

fn split_list(line: &str) -> impl Iterator<Item = &str> {
    line.split(',').map(str::trim)
}

fn at(line: usize, err: GrammarDefError) -> GrammarDefError {
    match err {
        GrammarDefError::Syntax { .. } => err,
        err => GrammarDefError::Syntax {
            line,
            msg: err.to_string(),
        },
    }
}

fn parse_rule(
    g: &mut GrammarDef,
    symbols: &Map<&str, SymbolID>,
    line: usize,
    text: &str,
) -> Result<(), GrammarDefError> {
    let syntax_error = |msg: String| GrammarDefError::Syntax { line, msg };

    let (head, body) = text
        .split_once("->")
        .ok_or_else(|| syntax_error("expected `->' after the head of the production".into()))?;

    let head = head.trim();
    let left = match symbols.get(head) {
        Some(SymbolID::N(n)) => *n,
        Some(SymbolID::T(..)) => {
            return Err(syntax_error(format!("the terminal `{}' cannot be a head", head)))
        }
        None => return Err(syntax_error(format!("unknown nonterminal `{}'", head))),
    };

    for alternative in body.split('|') {
        let mut right = vec![];
        let mut epsilon = false;
        for name in alternative.split_whitespace() {
            if name == EPSILON || name == EPSILON_ALIAS {
                epsilon = true;
                continue;
            }
            let symbol = symbols
                .get(name)
                .ok_or_else(|| syntax_error(format!("unknown symbol `{}'", name)))?;
            right.push(*symbol);
        }
        if right.is_empty() && !epsilon {
            return Err(syntax_error(format!(
                "empty alternative for `{}' (write {} for the empty string)",
                head, EPSILON
            )));
        }
        if !right.is_empty() && epsilon {
            return Err(syntax_error(format!(
                "{} must be the only symbol of an alternative for `{}'",
                EPSILON, head
            )));
        }
        g.rule(left, right).map_err(|e| at(line, e))?;
    }

    Ok(())
}
