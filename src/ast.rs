//! # vSQL - Abstract Syntax Tree
//!
//! This module defines the expression tree the compiler consumes. Trees are
//! produced upstream (by the host language's parser, by the
//! [function namespace](crate::namespace) or by decoding the JSON interchange
//! form) and are never mutated by the compiler: validation produces a separate
//! [`Checked`](crate::Checked) tree that mirrors the shape of the input.
//!
//! ## Architecture Overview
//!
//! - **[expressions]** - The [`Node`] wrapper (expression plus origin) and the [`Expr`] variants
//! - **[operators]** - Unary and binary operators with their encodings and precedences
//! - **[kinds]** - The [`NodeKind`] discriminator and its `const_int`/`binop_add` style encodings
//! - **[source]** - Canonical vSQL source rendering for nodes without a parser-supplied origin
//! - **[json]** - The `{"nodetype", "value", "children"}` interchange format
//!
//! ## Node Variants
//!
//! | Kind | Example | Children |
//! |------|---------|----------|
//! | constants | `None`, `True`, `42`, `4.2`, `'foo'`, `@(2000-02-29)` | none |
//! | field | `name` | none |
//! | unary | `not x`, `-x`, `~x` | operand |
//! | binary | `a + b`, `a in b`, `a[b]` | left, right |
//! | conditional | `a if c else b` | then, condition, else |
//! | function | `lower(x)`, `today()` | arguments |
//! | method | `x.startswith(y)` | object, arguments |
//! | attribute | `d.year` | object |
//! | aggregate | `sum(x)`, `group(x)` | arguments |
//!
//! ## Example
//!
//! ```
//! use vsql::ast::{BinaryOp, Node};
//!
//! let expr = Node::binary(BinaryOp::Add, Node::field("price"), Node::int(1));
//! assert_eq!(expr.source(), "price + 1");
//! assert_eq!(expr.kind().to_string(), "binop_add");
//! ```
pub mod expressions;
pub mod json;
pub mod kinds;
pub mod operators;
pub mod source;

pub use expressions::{Expr, Node, Origin};
pub use kinds::NodeKind;
pub use operators::{BinaryOp, UnaryOp};
