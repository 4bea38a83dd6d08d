//! Core engine of a cross-chain message relayer.
//!
//! This crate contains the chain-agnostic heart of the relayer: the parser
//! that turns a chain's raw per-transaction event logs into typed IBC
//! messages, and the path-level state tracker that correlates the message
//! streams of two chains into queues of pending relay actions.
//!
//! Chain connectivity, transaction signing and message construction are
//! collaborator concerns, reached through the [`chain::ChainProcessor`] and
//! [`processor::RelaySubmitter`] traits.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod chain;
pub mod config;
pub mod error;
pub mod event;
pub mod processor;
pub mod types;
