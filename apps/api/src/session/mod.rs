//! Interactive assessment sessions: per-user state, the workflow driving it,
//! field edits, and the HTTP handlers on top.

pub mod edits;
pub mod handlers;
pub mod store;
pub mod validation;
pub mod view;
pub mod workflow;
