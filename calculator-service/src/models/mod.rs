//! Wire types for the calculation endpoint.

pub mod calculation;

pub use calculation::{CalculationResponse, CalculationStatus, ImageData};
