//! Command dispatch
//!
//! A qualified command goes to the response generator; the reply (or a
//! fixed apology) is spoken and published as an assistant response.

mod dispatcher;
mod generator;

pub use dispatcher::{CommandDispatcher, APOLOGY};
pub use generator::{GenerationError, HttpGenerator, ResponseGenerator, UnconfiguredGenerator};
