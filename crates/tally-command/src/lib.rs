//! Command grammar for Tally chat messages.
//!
//! Pipeline:
//!   raw line
//!     └─ trim
//!          └─ parse()        → Command (first matching rule wins)
//!               └─ evaluate() → Decimal, for `+<expr>` incomes

mod arith;
mod grammar;

pub mod error;

pub use arith::evaluate;
pub use error::{ArithError, ParseError};
pub use grammar::{Command, Grammar, SlashCommand, parse};
