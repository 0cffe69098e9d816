// Execution substrate: the worker pool and the operation runner

pub mod executor;
pub mod scheduler;

pub use executor::*;
pub use scheduler::*;
