//! Types as stored in the database.

pub mod candidate;
pub mod election;
pub mod vote;
