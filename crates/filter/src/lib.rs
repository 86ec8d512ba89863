//! Compiles JSON filter expressions into parameterized SQL predicates.

pub mod compile;
pub mod config;
pub mod context;
pub mod error;
pub mod join;
pub mod json;
pub mod operator;
pub mod parse;
pub mod validate;

pub use compile::{CompiledClause, CompiledFilter, Compiler};
pub use config::{CompilerOptions, DialectKind};
pub use error::FilterError;
