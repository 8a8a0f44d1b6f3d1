//! Valve Map Format documents: KeyValues text, typed map objects, reading and writing

mod document;
mod model;
pub mod parse;
pub mod write;

pub use document::Document;
pub use model::*;
pub use parse::{load_vmf, parse_vmf, ParseError};
pub use write::{export_vmf, render_vmf, VMFBuilder};

/// A KeyValues block: `name { "key" "value" ... child { ... } }`
///
/// Keys may repeat (`visgroupid` does), so pairs are kept as an ordered list rather than a map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub name: String,
    pub pairs: Vec<(String, String)>,
    pub blocks: Vec<Block>,
}

impl Block {
    pub fn new<S: Into<String>>(name: S) -> Block {
        Block {
            name: name.into(),
            pairs: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Builder-style `push`
    pub fn with<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Block {
        self.push(key, value);
        self
    }

    pub fn with_block(mut self, block: Block) -> Block {
        self.blocks.push(block);
        self
    }

    pub fn push<K: Into<String>, V: ToString>(&mut self, key: K, value: V) {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// First value stored under `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.pairs.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item=&'a str> + 'a {
        self.pairs.iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the first value under `key`, or appends it
    pub fn set<V: ToString>(&mut self, key: &str, value: V) {
        match self.pairs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.push(key, value),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.name.eq_ignore_ascii_case(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|block| block.name.eq_ignore_ascii_case(name))
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item=&'a Block> + 'a {
        self.blocks.iter().filter(move |block| block.name.eq_ignore_ascii_case(name))
    }

    /// Parses the value under `key`, reporting which block it came from on failure
    pub fn parse_value<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ParseError> {
        match self.value(key) {
            Some(value) => value.trim().parse::<T>()
                .map(Some)
                .map_err(|_| ParseError::InvalidValue {
                    block: self.name.clone(),
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn require_value<T: std::str::FromStr>(&self, key: &str) -> Result<T, ParseError> {
        self.parse_value(key)?.ok_or_else(|| ParseError::MissingKey {
            block: self.name.clone(),
            key: key.to_string(),
        })
    }
}
