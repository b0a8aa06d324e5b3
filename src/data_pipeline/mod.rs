// DANS : src/data_pipeline/mod.rs

pub mod api_connectors;
pub mod tx_details;
