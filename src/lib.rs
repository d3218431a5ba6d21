/// Account rows and the business rules on their balances.
pub mod account;

/// Validated operation commands, later executed by [`service`].
pub mod command;

/// Transactional account store interface, plus in memory and PostgreSQL
/// implementations.
pub mod store;

/// Transfer and delete operations, each run inside a single store transaction.
pub mod service;

pub mod config;

pub mod logging;

/// Ideally, this module should exist in its own crate, as a way to
/// bootstrap core logic. However, the integration tests use it, so it lives here.
pub mod bin_utils;
