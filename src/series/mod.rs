pub mod annotate;
pub mod merge;
pub mod row;
pub mod sample;
