mod board;
mod rules;
mod symmetry;

pub use board::*;
pub use rules::*;
pub use symmetry::*;
