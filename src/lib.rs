//! Hash-linked ledger core and the wallet relay built on it.
//!
//! - [`blockchain`]: blocks, chain, transactions, signing and the canonical
//!   encoding shared by hashing and signature verification
//! - [`gateway`]: client for the node that owns authoritative ledger state
//! - [`service`]: wallet façade that signs and relays transfers
//! - [`api`]: HTTP handlers and routes for the wallet server

pub mod api;
pub mod blockchain;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod service;
