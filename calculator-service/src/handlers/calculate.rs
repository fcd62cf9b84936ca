use axum::{extract::State, Json};

use crate::{
    models::{CalculationResponse, ImageData},
    services::metrics::record_calculation,
    startup::AppState,
};

/// Solve the math in a canvas snapshot.
///
/// Malformed bodies are rejected by the `Json` extractor before this runs.
/// Every other failure is folded into the envelope: the status code is always
/// 200 and callers inspect `status`.
pub async fn calculate(
    State(state): State<AppState>,
    Json(payload): Json<ImageData>,
) -> Json<CalculationResponse> {
    tracing::info!(
        image_len = payload.image.len(),
        variable_count = payload.dict_of_vars.len(),
        "Received calculation request"
    );

    let outcome = state.calculator.calculate(&payload).await;
    record_calculation(&outcome);

    match &outcome {
        Ok(answers) => tracing::info!(answer_count = answers.len(), "Image processed"),
        Err(e) => tracing::error!(error = %e, error_type = e.kind(), "Error in processing"),
    }

    Json(outcome.into())
}
