pub mod kma;
pub mod simulated;
