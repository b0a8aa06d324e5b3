// src/lib.rs

// On déclare tous nos modules principaux pour les rendre publics et
// utilisables par notre programme binaire (src/bin/sniper.rs).
pub mod config;
pub mod data_pipeline;
pub mod execution;
pub mod filtering;
pub mod monitoring;
pub mod pipeline;
pub mod rpc;
pub mod watcher;
