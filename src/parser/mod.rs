//! Template parsing: tag-body lexer, attribute grammar, element arena and the
//! tree-building scanner

pub mod attributes;
pub mod element;
pub mod lexer;
mod scanner;

pub use attributes::{parse_attributes, AttrValue, Attributes};
pub use element::{Content, Document, Element, NodeId, Outputs};
pub use scanner::Parser;
