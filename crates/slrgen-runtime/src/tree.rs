//! Parse tree produced by the parser engine.

use crate::parser::Token;
use std::fmt;

/// A node of the parse tree.
///
/// Leaves wrap the shifted tokens, and inner nodes correspond to the
/// completed production rules. The symbol names of inner nodes are
/// borrowed from the parse table that produced the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTreeNode<'t, TTok> {
    Leaf(TTok),
    Node {
        symbol: &'t str,
        children: Vec<ParseTreeNode<'t, TTok>>,
    },
}

impl<'t, TTok> ParseTreeNode<'t, TTok>
where
    TTok: Token,
{
    /// Return the grammar symbol labeling this node.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Leaf(token) => token.name(),
            Self::Node { symbol, .. } => symbol,
        }
    }

    pub fn children(&self) -> &[Self] {
        match self {
            Self::Leaf(..) => &[],
            Self::Node { children, .. } => &children[..],
        }
    }

    pub fn into_children(self) -> Vec<Self> {
        match self {
            Self::Leaf(..) => vec![],
            Self::Node { children, .. } => children,
        }
    }

    pub fn token(&self) -> Option<&TTok> {
        match self {
            Self::Leaf(token) => Some(token),
            Self::Node { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(..))
    }

    /// Iterate over the wrapped tokens from left to right.
    pub fn leaves(&self) -> Leaves<'_, 't, TTok> {
        Leaves { stack: vec![self] }
    }

    /// Render this tree in the compact form, e.g. `E(E(T(id)), +, T(id))`.
    pub fn sexp(&self) -> Sexp<'_, 't, TTok> {
        Sexp { node: self }
    }

    fn write_drawing(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        children_prefix: &str,
    ) -> fmt::Result {
        writeln!(f, "{}{}", prefix, self.symbol())?;
        let children = self.children();
        for (i, child) in children.iter().enumerate() {
            if i + 1 < children.len() {
                child.write_drawing(
                    f,
                    &format!("{}├── ", children_prefix),
                    &format!("{}│   ", children_prefix),
                )?;
            } else {
                child.write_drawing(
                    f,
                    &format!("{}└── ", children_prefix),
                    &format!("{}    ", children_prefix),
                )?;
            }
        }
        Ok(())
    }
}

/// Draws the tree horizontally, one symbol per line.
impl<TTok> fmt::Display for ParseTreeNode<'_, TTok>
where
    TTok: Token,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_drawing(f, "", "")
    }
}

/// Iterator over the leaves of a parse tree.
#[derive(Debug)]
pub struct Leaves<'a, 't, TTok> {
    stack: Vec<&'a ParseTreeNode<'t, TTok>>,
}

impl<'a, 't, TTok> Iterator for Leaves<'a, 't, TTok> {
    type Item = &'a TTok;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                ParseTreeNode::Leaf(token) => return Some(token),
                ParseTreeNode::Node { children, .. } => {
                    self.stack.extend(children.iter().rev());
                }
            }
        }
        None
    }
}

#[derive(Debug)]
pub struct Sexp<'a, 't, TTok> {
    node: &'a ParseTreeNode<'t, TTok>,
}

impl<TTok> fmt::Display for Sexp<'_, '_, TTok>
where
    TTok: Token,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            ParseTreeNode::Leaf(token) => f.write_str(token.name()),
            ParseTreeNode::Node { symbol, children } => {
                write!(f, "{}(", symbol)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child.sexp())?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &'static str) -> ParseTreeNode<'static, &'static str> {
        ParseTreeNode::Leaf(name)
    }

    fn sample() -> ParseTreeNode<'static, &'static str> {
        ParseTreeNode::Node {
            symbol: "E",
            children: vec![
                ParseTreeNode::Node {
                    symbol: "E",
                    children: vec![leaf("n")],
                },
                leaf("+"),
                leaf("n"),
            ],
        }
    }

    #[test]
    fn sexp_form() {
        assert_eq!(sample().sexp().to_string(), "E(E(n), +, n)");
    }

    #[test]
    fn horizontal_drawing() {
        let expected = "\
E
├── E
│   └── n
├── +
└── n
";
        assert_eq!(sample().to_string(), expected);
    }

    #[test]
    fn leaves_in_order() {
        let tree = sample();
        let leaves: Vec<_> = tree.leaves().copied().collect();
        assert_eq!(leaves, ["n", "+", "n"]);
    }

    #[test]
    fn empty_node_has_no_leaves() {
        let tree: ParseTreeNode<'_, &str> = ParseTreeNode::Node {
            symbol: "A",
            children: vec![],
        };
        assert_eq!(tree.leaves().count(), 0);
        assert_eq!(tree.sexp().to_string(), "A()");
    }
}
