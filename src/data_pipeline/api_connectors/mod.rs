// DANS : src/data_pipeline/api_connectors/mod.rs

pub mod jupiter;
pub mod rugcheck;
