//! quantledger — versioned financial time-series data store.
//!
//! Hexagonal architecture: entity types in [`domain`], port traits in
//! [`ports`], concrete SQLite/Postgres/CSV/INI implementations in
//! [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
