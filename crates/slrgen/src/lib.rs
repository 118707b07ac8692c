//! An SLR(1) parser table generator.

pub mod first_sets;
pub mod follow_sets;
pub mod grammar;
pub mod lr0;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;

pub use crate::{
    grammar::{Grammar, GrammarDefError},
    table::{Config, ParsingTable, TableError},
};

/// Build the SLR(1) parse table of `grammar` with the default configuration.
pub fn build_table(grammar: &Grammar) -> Result<ParsingTable, TableError> {
    Config::new().build(grammar)
}
