//! Extraction of typed IBC messages from raw transaction event logs.

pub mod attribute;
pub mod parser;
