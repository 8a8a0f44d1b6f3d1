use std::path::Path;

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use super::{Block, Document};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid value \"{value}\" for \"{key}\" in {block}")]
    InvalidValue {
        block: String,
        key: String,
        value: String,
    },

    #[error("\"{key}\" missing in {block}")]
    MissingKey {
        block: String,
        key: String,
    },

    #[error("invalid plane \"{0}\"")]
    InvalidPlane(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[grammar = "vmf/keyvalues.pest"]
struct KeyValuesParser;

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(error: pest::error::Error<Rule>) -> Self {
        let (line, column) = match error.line_col {
            LineColLocation::Pos(position) => position,
            LineColLocation::Span(start, _) => start,
        };
        ParseError::Syntax {
            line,
            column,
            message: error.variant.message().into_owned(),
        }
    }
}

fn text(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::quoted => pair.into_inner().next().map(|inner| inner.as_str()).unwrap_or_default().to_string(),
        _ => pair.as_str().to_string(),
    }
}

fn build_block(pair: Pair<Rule>) -> Block {
    let mut inner = pair.into_inner();
    let mut block = Block::new(inner.next().map(text).unwrap_or_default());
    for child in inner {
        match child.as_rule() {
            Rule::block => block.blocks.push(build_block(child)),
            Rule::keyvalue => {
                let mut texts = child.into_inner().map(text);
                if let (Some(key), Some(value)) = (texts.next(), texts.next()) {
                    block.pairs.push((key, value));
                }
            }
            _ => {}
        }
    }
    block
}

/// Parses KeyValues text into its top level blocks
pub fn parse_blocks(input: &str) -> Result<Vec<Block>, ParseError> {
    let file = KeyValuesParser::parse(Rule::file, input)?;
    Ok(file
        .flat_map(|pair| pair.into_inner())
        .filter(|pair| pair.as_rule() == Rule::block)
        .map(build_block)
        .collect())
}

pub fn parse_vmf(input: &str) -> Result<Document, ParseError> {
    Document::from_blocks(parse_blocks(input)?)
}

pub fn load_vmf<P: AsRef<Path>>(path: P) -> Result<Document, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_vmf(&content)
}
