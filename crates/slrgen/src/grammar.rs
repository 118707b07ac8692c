//! Grammar types.

use crate::{
    types::Map,
    util::{display_fn, write_separated},
};
use std::{fmt, fs, io, ops::Deref, path::Path, str::FromStr};

/// The spelling of the empty string in displayed rules and grammar files.
pub const EPSILON: &str = "ε";

const RESERVED_NAMES: &[&str] = &["$", EPSILON, "epsilon", "->"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}

impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}

impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

impl From<TerminalID> for SymbolID {
    fn from(id: TerminalID) -> Self {
        Self::T(id)
    }
}

impl From<NonterminalID> for SymbolID {
    fn from(id: NonterminalID) -> Self {
        Self::N(id)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

/// The type that represents a production rule in grammar.
///
/// An empty right-hand side stands for an epsilon production.
#[derive(Debug, Clone)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} -> ", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                return f.write_str(EPSILON);
            }
            write_separated(f, " ", self.right.iter().map(|s| g.symbol_name(*s)))
        })
    }
}

/// A set of terminal symbols.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }

    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }

    /// Add all elements of `other`, returning whether this set has grown.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let len = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| TerminalID::from_raw(raw as u16))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            write_separated(f, ", ", self.iter().map(|t| &g.terminals[&t]))?;
            f.write_str("}")
        })
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

/// The grammar definition used to derive the parser tables.
///
/// A `Grammar` is immutable once built; augmentation and other extensions
/// always produce a new value via [`Grammar::extend`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

impl FromStr for Grammar {
    type Err = GrammarDefError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        crate::syntax::parse(source)
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        source.parse()
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef::default();
        f(&mut def)?;
        def.end()
    }

    /// Build a new grammar consisting of this grammar plus the additions
    /// made by the specified function. `self` is left untouched.
    pub fn extend<F>(&self, f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef::from_grammar(self.clone());
        f(&mut def)?;
        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Iterate over the production rules whose left-hand side is `left`.
    pub fn rules_of(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left == left)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name == name)
            .map(|n| n.id)
    }
}

/// A grammar with a fresh start symbol `S'` and the rule `S' -> S`.
#[derive(Debug, Clone)]
pub struct AugmentedGrammar {
    grammar: Grammar,
    original_start: NonterminalID,
    accept_rule: RuleID,
}

impl AugmentedGrammar {
    pub fn new(g: &Grammar) -> Result<Self, GrammarDefError> {
        let original_start = g.start_symbol;

        let mut name = format!("{}'", g.nonterminals[&original_start].name());
        while g.terminal_by_name(&name).is_some() || g.nonterminal_by_name(&name).is_some() {
            name.push('\'');
        }

        let mut accept_rule = None;
        let grammar = g.extend(|def| {
            let start = def.nonterminal(&name)?;
            accept_rule = Some(def.rule(start, [SymbolID::N(original_start)])?);
            def.start_symbol(start)
        })?;
        let accept_rule = accept_rule.ok_or("the accept rule was not registered")?;

        Ok(Self {
            grammar,
            original_start,
            accept_rule,
        })
    }

    /// Return the rule `S' -> S`.
    pub fn accept_rule(&self) -> RuleID {
        self.accept_rule
    }

    /// Return the start symbol of the grammar before augmentation.
    pub fn original_start(&self) -> NonterminalID {
        self.original_start
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

impl Deref for AugmentedGrammar {
    type Target = Grammar;

    fn deref(&self) -> &Self::Target {
        &self.grammar
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl Default for GrammarDef {
    fn default() -> Self {
        let mut def = Self {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: 0,
            next_rule_id: 0,
        };
        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$".into(),
            },
        );
        def
    }
}

impl GrammarDef {
    fn from_grammar(g: Grammar) -> Self {
        fn next<K>(keys: impl Iterator<Item = K>, raw: impl Fn(K) -> u16) -> u16 {
            keys.map(|k| raw(k) + 1).max().unwrap_or(0)
        }
        Self {
            next_terminal_id: next(g.terminals.keys(), |t| t.raw).max(TerminalID::OFFSET),
            next_nonterminal_id: next(g.nonterminals.keys(), |n| n.raw),
            next_rule_id: next(g.rules.keys(), |r| r.raw),
            terminals: g.terminals,
            nonterminals: g.nonterminals,
            rules: g.rules,
            start: Some(g.start_symbol),
        }
    }

    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.verify_new_name(name)?;
        let id = TerminalID::from_raw(self.next_terminal_id);
        self.next_terminal_id = bump(self.next_terminal_id)?;
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );
        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.verify_new_name(name)?;
        let id = NonterminalID::from_raw(self.next_nonterminal_id);
        self.next_nonterminal_id = bump(self.next_nonterminal_id)?;
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );
        Ok(id)
    }

    /// Specify a production rule into this grammer.
    ///
    /// Rules are identified by value, so registering the same rule twice
    /// returns the identifier of the existing one.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if !self.nonterminals.contains_key(&left) {
            return Err(GrammarDefError::UnknownSymbol(format!("{:?}", left)));
        }
        let right: Vec<SymbolID> = right.into_iter().collect();
        for symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => *t != TerminalID::EOI && self.terminals.contains_key(t),
                SymbolID::N(n) => self.nonterminals.contains_key(n),
            };
            if !known {
                return Err(GrammarDefError::UnknownSymbol(format!("{:?}", symbol)));
            }
        }

        if let Some(rule) = self
            .rules
            .values()
            .find(|rule| rule.left == left && rule.right == right)
        {
            tracing::warn!(
                "duplicate production rule for `{}' is ignored",
                self.nonterminals[&left]
            );
            return Ok(rule.id);
        }

        let id = RuleID::from_raw(self.next_rule_id);
        self.next_rule_id = bump(self.next_rule_id)?;
        self.rules.insert(id, Rule { id, left, right });
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarDefError::UnknownSymbol(format!("{:?}", symbol)));
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn verify_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if !verify_name(name) {
            return Err(GrammarDefError::InvalidName(name.to_owned()));
        }
        let declared = self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name);
        if declared {
            return Err(GrammarDefError::DuplicateSymbol(name.to_owned()));
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // Without an explicit start symbol, the first declared nonterminal is used.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .next()
                .copied()
                .ok_or("empty nonterminal symbols")?,
        };

        for nonterminal in self.nonterminals.values() {
            if self.rules.values().all(|rule| rule.left != nonterminal.id) {
                tracing::warn!(
                    "the nonterminal `{}' has no associated production rule",
                    nonterminal
                );
            }
        }

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            start_symbol: start,
        })
    }
}

fn bump(raw: u16) -> Result<u16, GrammarDefError> {
    raw.checked_add(1)
        .ok_or_else(|| "too many symbols or rules".into())
}

fn verify_name(name: &str) -> bool {
    !name.is_empty()
        && !RESERVED_NAMES.contains(&name)
        && !name
            .chars()
            .any(|ch| ch.is_whitespace() || ch == ',' || ch == '|')
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error at line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("invalid symbol name: `{}'", _0)]
    InvalidName(String),

    #[error("the symbol `{}' has already been declared", _0)]
    DuplicateSymbol(String),

    #[error("unknown symbol: {}", _0)]
    UnknownSymbol(String),

    #[error("Other error: {}", msg)]
    Other { msg: String },
}

impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}

impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    fn expr_grammar() -> Grammar {
        Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            let t = g.nonterminal("T")?;
            let plus = g.terminal("+")?;
            let id = g.terminal("id")?;
            g.rule(s, [N(e)])?;
            g.rule(e, [N(e), T(plus), N(t)])?;
            g.rule(e, [N(t)])?;
            g.rule(t, [T(id)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn first_nonterminal_is_start() {
        let g = expr_grammar();
        assert_eq!(g.nonterminals[&g.start_symbol].name(), "S");
        assert_eq!(g.rules.len(), 4);
        assert_eq!(g.terminals[&TerminalID::EOI].name(), "$");
    }

    #[test]
    fn rule_display() {
        let g = expr_grammar();
        let rendered: Vec<_> = g.rules.values().map(|r| r.display(&g).to_string()).collect();
        assert_eq!(rendered, ["S -> E", "E -> E + T", "E -> T", "T -> id"]);
    }

    #[test]
    fn epsilon_rule_display() {
        let g = Grammar::define(|g| {
            let a = g.nonterminal("A")?;
            g.rule(a, [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(g.rules[0].display(&g).to_string(), "A -> ε");
    }

    #[test]
    fn duplicate_rules_collapse() {
        let g = Grammar::define(|g| {
            let a = g.nonterminal("A")?;
            let x = g.terminal("x")?;
            let r1 = g.rule(a, [T(x)])?;
            let r2 = g.rule(a, [T(x)])?;
            assert_eq!(r1, r2);
            Ok(())
        })
        .unwrap();
        assert_eq!(g.rules.len(), 1);
    }

    #[test]
    fn terminals_and_nonterminals_are_disjoint() {
        let err = Grammar::define(|g| {
            g.nonterminal("A")?;
            g.terminal("A")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol(name) if name == "A"));
    }

    #[test]
    fn reserved_names_are_rejected() {
        for name in ["$", "ε", "", "a b", "a|b"] {
            let err = Grammar::define(|g| {
                g.terminal(name)?;
                Ok(())
            })
            .unwrap_err();
            assert!(matches!(err, GrammarDefError::InvalidName(..)), "{:?}", name);
        }
    }

    #[test]
    fn end_of_input_cannot_appear_in_body() {
        let err = Grammar::define(|g| {
            let a = g.nonterminal("A")?;
            g.rule(a, [T(TerminalID::EOI)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::UnknownSymbol(..)));
    }

    #[test]
    fn augmentation_leaves_source_untouched() {
        let g = expr_grammar();
        let augmented = AugmentedGrammar::new(&g).unwrap();

        assert_eq!(g.nonterminals.len(), 3);
        assert_eq!(g.rules.len(), 4);
        assert_eq!(augmented.nonterminals.len(), 4);
        assert_eq!(augmented.rules.len(), 5);

        let start = augmented.start_symbol;
        assert_eq!(augmented.nonterminals[&start].name(), "S'");
        assert_eq!(augmented.original_start(), g.start_symbol);

        let accept = augmented.rule(augmented.accept_rule());
        assert_eq!(accept.left(), start);
        assert_eq!(accept.right(), [N(g.start_symbol)]);
    }

    #[test]
    fn augmented_start_name_is_fresh() {
        let g = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let s1 = g.nonterminal("S'")?;
            let x = g.terminal("x")?;
            g.rule(s, [N(s1)])?;
            g.rule(s1, [T(x)])?;
            Ok(())
        })
        .unwrap();
        let augmented = AugmentedGrammar::new(&g).unwrap();
        assert_eq!(augmented.nonterminals[&augmented.start_symbol].name(), "S''");
    }
}
