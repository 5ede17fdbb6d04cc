//! Domain types for the SQL agent

mod action;
mod message;
mod trace;

pub use action::*;
pub use message::*;
pub use trace::*;
