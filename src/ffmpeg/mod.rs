mod commands;
mod progress;
mod runner;
mod wrapper;

pub use commands::*;
pub use progress::*;
pub use runner::*;
pub use wrapper::*;
