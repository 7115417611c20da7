mod buffer;
mod pool;
mod sample;
mod worker;

pub use buffer::*;
pub use pool::*;
pub use sample::*;
pub use worker::*;
