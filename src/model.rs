use serde::{Deserialize, Serialize};

/// Raw request body for `POST /api/execute`. Every field is optional text;
/// nothing is validated at deserialization time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecuteRequest {
    pub template: Option<String>,
    pub data_model: Option<String>,
    pub output_format: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
}

/// The request field a problem is scoped to, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemField {
    Template,
    DataModel,
    OutputFormat,
    Locale,
    TimeZone,
}

/// A field-scoped validation or content error. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub field: ProblemField,
    pub message: String,
}

impl Problem {
    pub fn new(field: ProblemField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Completed-pipeline response body: either a non-empty problem list or a
/// rendered result. The tagged variants make emitting both impossible.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecuteResponse {
    Problems {
        problems: Vec<Problem>,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        result: String,
        truncated_result: bool,
        problems: Vec<Problem>,
    },
}

impl ExecuteResponse {
    /// A problem response. Callers only reach this with at least one problem.
    pub fn from_problems(problems: Vec<Problem>) -> Self {
        debug_assert!(!problems.is_empty());
        Self::Problems { problems }
    }

    /// A result response; the problem list is always empty here.
    pub fn from_result(result: String, truncated: bool) -> Self {
        Self::Result {
            result,
            truncated_result: truncated,
            problems: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_fields_serialize_screaming_snake() {
        let json = serde_json::to_value(ProblemField::DataModel).unwrap();
        assert_eq!(json, "DATA_MODEL");
        let json = serde_json::to_value(ProblemField::OutputFormat).unwrap();
        assert_eq!(json, "OUTPUT_FORMAT");
    }

    #[test]
    fn result_response_carries_empty_problem_list() {
        let resp = ExecuteResponse::from_result("Hello World".into(), false);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["result"], "Hello World");
        assert_eq!(json["truncatedResult"], false);
        assert_eq!(json["problems"], serde_json::json!([]));
    }

    #[test]
    fn problem_response_has_no_result_key() {
        let resp = ExecuteResponse::from_problems(vec![Problem::new(
            ProblemField::Locale,
            "Unknown locale: xx_XX",
        )]);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["problems"][0]["field"], "LOCALE");
    }

    #[test]
    fn request_accepts_partial_bodies() {
        let req: ExecuteRequest = serde_json::from_str(r#"{"template": "hi"}"#).unwrap();
        assert_eq!(req.template.as_deref(), Some("hi"));
        assert!(req.data_model.is_none());
        assert!(req.time_zone.is_none());
    }
}
