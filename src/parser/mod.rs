//! Markup parser and serializer

pub mod ast;
pub mod lexer;
mod serialize;
mod tree;

pub use ast::*;
pub use serialize::to_html;
pub use tree::parse;
