pub mod analyzers;
pub mod calculator;
pub mod canvas;
pub mod metrics;

pub use calculator::{CalculationError, Calculator};
pub use canvas::{CanvasError, CanvasImage};
