mod threatspace;

pub use threatspace::*;
