//! Runtime implementation for the `slrgen` parser generator.

pub mod definition;
pub mod parser;
pub mod tree;

pub use crate::{
    definition::{ParseAction, ParseTable},
    parser::{parse, ParseError, Parser, Token},
    tree::ParseTreeNode,
};
