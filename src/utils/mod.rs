pub mod constants;
pub mod dates;
pub mod progress;
pub mod resolution;

pub use progress::ProgressReporter;
