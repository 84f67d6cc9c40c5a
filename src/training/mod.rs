pub mod metrics;
pub mod trainer;
