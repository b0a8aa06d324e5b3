pub mod swapper;

pub use swapper::JupiterSwapper;
