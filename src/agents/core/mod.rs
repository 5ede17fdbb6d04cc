//! Core agent implementation
//!
//! [`SqlReActAgent`] runs the Reasoning + Action loop: it calls the model,
//! parses the response, executes database tools and feeds observations back
//! until the model gives a final answer or the iteration budget runs out.

mod react;

pub use react::{SqlReActAgent, CORRECTION_MESSAGE};
