mod gate;
mod tally;

pub use gate::*;
pub use tally::*;
