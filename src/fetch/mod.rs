pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod provider;
