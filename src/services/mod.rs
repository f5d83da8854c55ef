//! Store-facing operations shared by the HTTP handlers. Every function is
//! generic over the connection so handlers can pass a pool or a transaction.

pub mod accounts;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stats;
