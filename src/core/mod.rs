//! Core data structures: variables, the state-vector store, rigid bodies.

pub mod rigidbody;
pub mod variable;
pub mod vars;
