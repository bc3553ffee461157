pub mod state;
pub mod tables;
