/// Periodic aggregation task.
pub mod aggregator;
/// Scalable, pausable simulation clock.
pub mod clock;
pub mod engine;
/// ADSR envelope math.
pub mod envelope;
pub mod house;
pub mod types;
