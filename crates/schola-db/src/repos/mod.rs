//! Repository implementations.
//!
//! Each module implements one port from `schola_core::ports` on
//! [`crate::store::LibsqlTx`], plus any read-only queries that run outside a
//! transaction on [`crate::store::LibsqlStore`].

pub mod outbox;
pub mod schedule;
pub mod section;
pub mod subject;
