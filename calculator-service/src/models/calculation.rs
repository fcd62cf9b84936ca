use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Message attached to a successful envelope.
pub const SUCCESS_MESSAGE: &str = "Image processed";

/// Message attached to a failed envelope; the detail goes in `error`.
pub const FAILURE_MESSAGE: &str = "An error occurred";

/// Inbound request: a canvas snapshot plus the variables assigned so far.
#[derive(Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Data URI, e.g. `data:image/png;base64,<payload>`.
    pub image: String,

    /// Variable name to value, substituted into the expressions in the image.
    pub dict_of_vars: Map<String, Value>,
}

impl Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ImageData {{ image: <{} bytes>, dict_of_vars: {:?} }}",
            self.image.len(),
            self.dict_of_vars
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationStatus {
    Success,
    Failure,
}

/// Response envelope. `data` is set on success and `error` on failure;
/// the unset one is omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: CalculationStatus,
}

impl CalculationResponse {
    pub fn success(data: Vec<Value>) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(data),
            error: None,
            status: CalculationStatus::Success,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            message: FAILURE_MESSAGE.to_string(),
            data: None,
            error: Some(error.to_string()),
            status: CalculationStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CalculationStatus::Success
    }
}

impl<E: ToString> From<Result<Vec<Value>, E>> for CalculationResponse {
    fn from(outcome: Result<Vec<Value>, E>) -> Self {
        match outcome {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_omits_error() {
        let response = CalculationResponse::success(vec![json!({"expr": "1+1", "result": "2"})]);

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "message": "Image processed",
                "data": [{"expr": "1+1", "result": "2"}],
                "status": "success"
            })
        );
    }

    #[test]
    fn failure_envelope_omits_data() {
        let response = CalculationResponse::failure("bad payload");

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "message": "An error occurred",
                "error": "bad payload",
                "status": "failure"
            })
        );
        assert!(!response.is_success());
    }

    #[test]
    fn envelope_fields_serialize_in_declared_order() {
        let body = serde_json::to_string(&CalculationResponse::success(vec![])).unwrap();
        assert_eq!(body, r#"{"message":"Image processed","data":[],"status":"success"}"#);
    }

    #[test]
    fn converts_from_result() {
        let ok: Result<Vec<Value>, String> = Ok(vec![json!(1)]);
        assert!(CalculationResponse::from(ok).is_success());

        let err: Result<Vec<Value>, String> = Err("boom".to_string());
        assert_eq!(CalculationResponse::from(err).error.as_deref(), Some("boom"));
    }

    #[test]
    fn request_requires_object_variables() {
        let parsed: Result<ImageData, _> =
            serde_json::from_value(json!({"image": "data:,", "dict_of_vars": ["x"]}));
        assert!(parsed.is_err());

        let parsed: Result<ImageData, _> = serde_json::from_value(json!({"image": "data:,"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn request_accepts_arbitrary_variable_values() {
        let parsed: ImageData = serde_json::from_value(json!({
            "image": "data:image/png;base64,aGVsbG8=",
            "dict_of_vars": {"x": 3, "y": "4", "z": [1, 2], "w": null}
        }))
        .unwrap();
        assert_eq!(parsed.dict_of_vars.len(), 4);
    }

    #[test]
    fn debug_output_hides_image_payload() {
        let request = ImageData {
            image: "data:image/png;base64,aGVsbG8=".to_string(),
            dict_of_vars: Map::new(),
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("aGVsbG8="));
        assert!(rendered.contains("30 bytes"));
    }
}
