// zps-core/src/pipeline/mod.rs
pub mod engine;
mod worker;
