pub mod adjuster;
pub mod assessment;
pub mod band;
pub mod entity;
pub mod error;
pub mod estimator;
pub mod fallback;
pub mod history;
pub mod pipeline;
pub mod reasoning;
pub mod sample;
pub mod seed;
pub mod trend;

#[cfg(test)]
pub(crate) mod testing;
