//! Calculation metrics, exported through the core Prometheus recorder.

use super::calculator::CalculationError;
use serde_json::Value;

/// Count a finished calculation by outcome and, on failure, by error kind.
pub fn record_calculation(outcome: &Result<Vec<Value>, CalculationError>) {
    match outcome {
        Ok(answers) => {
            ::metrics::counter!("calculations_total", "status" => "success").increment(1);
            ::metrics::histogram!("calculation_answers").record(answers.len() as f64);
        }
        Err(err) => {
            ::metrics::counter!("calculations_total", "status" => "failure").increment(1);
            ::metrics::counter!("calculation_errors_total", "error_type" => err.kind())
                .increment(1);
        }
    }
}
