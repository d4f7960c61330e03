//! Data model: database records, their API representations, and the MongoDB
//! plumbing that ties them together.

pub mod api;
pub mod db;
pub mod mongodb;
