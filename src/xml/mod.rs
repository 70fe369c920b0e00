//! XML part loading, editing and writing.

mod part;
mod tree;

pub use part::{Namespaces, RELATIONSHIPS_NS, WORDML_NS, XmlPart, load, save};
pub use tree::{Element, Node, XmlAttribute, XmlDocument};
