pub mod error;
pub mod paths;
pub mod runner;
pub mod size;
