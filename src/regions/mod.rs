pub mod error;
pub mod region;
