//! Turns an uploaded PDF into the plain text the interview runs on.

pub mod extract;
pub mod handlers;
