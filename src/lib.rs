pub mod cap;
pub mod cli;
pub mod driver;
pub mod error;
pub mod fmt;
pub mod logger;
pub mod parse;
pub mod transport;
pub mod vcp;

#[cfg(test)]
mod testing;

pub use parse::{parse, parse_root, tokenize, CapabilityNode, Token, Value};
