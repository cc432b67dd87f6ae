pub mod audience;
pub mod collector;
pub mod scheduler;
pub mod stats;
