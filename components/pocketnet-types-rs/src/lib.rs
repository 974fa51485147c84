extern crate serde;

#[macro_use]
extern crate serde_derive;

mod chain;
mod social;

pub use chain::*;
pub use social::*;
