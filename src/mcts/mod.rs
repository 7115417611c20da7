mod boost;
mod node;
mod noise;
mod search;
mod ttable;

pub use boost::*;
pub use node::*;
pub use noise::dirichlet_mix;
pub use search::*;
pub use ttable::*;
