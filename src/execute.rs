//! The validation-and-dispatch pipeline behind `POST /api/execute`.
//!
//! Every field is validated independently so one request surfaces all of
//! its problems at once; dispatch to the rendering engine happens only
//! when the aggregated problem list is empty. The outcome taxonomy is
//! strict: empty requests are client errors, validation and content
//! failures are 200-level problem lists, and capacity rejection is the
//! one system-level error.

use crate::datamodel::{self, DataValue};
use crate::engine::{RenderEngine, RenderError, RenderInput};
use crate::model::{ExecuteRequest, ExecuteResponse, Problem, ProblemField};
use crate::settings::{
    self, OutputFormat, ResolvedTimeZone, default_locale, default_output_format,
    default_time_zone,
};
use indexmap::IndexMap;

pub const MAX_TEMPLATE_INPUT_LENGTH: usize = 10_000;
pub const MAX_DATA_MODEL_INPUT_LENGTH: usize = 10_000;

pub const SERVICE_OVERLOADED_MESSAGE: &str =
    "Sorry, the service is overloaded and couldn't handle your request now. Try again later.";

pub(crate) const DATA_MODEL_ERROR_HEADING: &str = "Failed to parse data model:";
pub(crate) const DATA_MODEL_ERROR_FOOTER: &str = "Note: this is NOT a Tera error message. \
     The data model syntax is specific to this online service.";

/// Terminal states of one pipeline run. The HTTP layer maps these onto
/// transport statuses.
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// Template and data model were both blank; nothing was validated.
    EmptyRequest,
    /// The pipeline completed with either problems or a result.
    Completed(ExecuteResponse),
    /// The engine refused the work; report a fixed system error.
    Overloaded,
    /// A render worker died or a validator broke its own contract.
    Internal(String),
}

/// Runs the full pipeline for one request.
pub async fn execute(engine: &RenderEngine, req: &ExecuteRequest) -> ExecuteOutcome {
    let template_raw = req.template.as_deref().unwrap_or("");
    let data_model_raw = req.data_model.as_deref().unwrap_or("");

    if template_raw.trim().is_empty() && data_model_raw.trim().is_empty() {
        return ExecuteOutcome::EmptyRequest;
    }

    // All five validators run regardless of earlier failures; problems
    // land in field declaration order.
    let mut problems = Vec::new();
    let (template, problem) = validate_template(template_raw);
    problems.extend(problem);
    let (data_model, problem) = validate_data_model(data_model_raw);
    problems.extend(problem);
    let (output_format, problem) = validate_output_format(req.output_format.as_deref());
    problems.extend(problem);
    let (locale, problem) = validate_locale(req.locale.as_deref());
    problems.extend(problem);
    let (time_zone, problem) = validate_time_zone(req.time_zone.as_deref());
    problems.extend(problem);

    if !problems.is_empty() {
        return ExecuteOutcome::Completed(ExecuteResponse::from_problems(problems));
    }

    let (Some(template), Some(data_model), Some(output_format), Some(locale), Some(time_zone)) =
        (template, data_model, output_format, locale, time_zone)
    else {
        return ExecuteOutcome::Internal(
            "a field validator produced neither a value nor a problem".to_string(),
        );
    };

    let input = RenderInput {
        template,
        data_model,
        output_format,
        locale,
        time_zone,
    };
    match engine.render(input).await {
        Ok(output) => {
            ExecuteOutcome::Completed(ExecuteResponse::from_result(output.text, output.truncated))
        }
        Err(RenderError::Overloaded) => ExecuteOutcome::Overloaded,
        Err(RenderError::Evaluation(err)) => {
            // A defect in the submitted template, not a system fault.
            problems.push(Problem::new(ProblemField::Template, flatten_causes(&err)));
            ExecuteOutcome::Completed(ExecuteResponse::from_problems(problems))
        }
        Err(RenderError::Worker(err)) => ExecuteOutcome::Internal(err.to_string()),
    }
}

fn validate_template(raw: &str) -> (Option<String>, Option<Problem>) {
    if raw.chars().count() > MAX_TEMPLATE_INPUT_LENGTH {
        let message = format!(
            "The template length has exceeded the {MAX_TEMPLATE_INPUT_LENGTH} character limit set for this service."
        );
        return (None, Some(Problem::new(ProblemField::Template, message)));
    }
    (Some(raw.to_string()), None)
}

fn validate_data_model(raw: &str) -> (Option<IndexMap<String, DataValue>>, Option<Problem>) {
    if raw.chars().count() > MAX_DATA_MODEL_INPUT_LENGTH {
        let message = format!(
            "The data model length has exceeded the {MAX_DATA_MODEL_INPUT_LENGTH} character limit set for this service."
        );
        return (None, Some(Problem::new(ProblemField::DataModel, message)));
    }
    // The parser anchors naive date-times in the process default zone, so
    // this validator never depends on the time-zone validator's outcome.
    match datamodel::parse(raw, default_time_zone().offset) {
        Ok(model) => (Some(model), None),
        Err(err) => {
            let message = format!(
                "{DATA_MODEL_ERROR_HEADING}\n\n{err}\n\n{DATA_MODEL_ERROR_FOOTER}"
            );
            (None, Some(Problem::new(ProblemField::DataModel, message)))
        }
    }
}

fn validate_output_format(raw: Option<&str>) -> (Option<OutputFormat>, Option<Problem>) {
    let token = raw.unwrap_or("").trim();
    if token.is_empty() {
        return (Some(default_output_format()), None);
    }
    match settings::resolve_output_format(token) {
        Some(format) => (Some(format), None),
        None => (
            None,
            Some(Problem::new(
                ProblemField::OutputFormat,
                format!("Unknown output format: {token}"),
            )),
        ),
    }
}

fn validate_locale(raw: Option<&str>) -> (Option<&'static str>, Option<Problem>) {
    let token = raw.unwrap_or("").trim();
    if token.is_empty() {
        return (Some(default_locale()), None);
    }
    match settings::resolve_locale(token) {
        Some(locale) => (Some(locale), None),
        None => (
            None,
            Some(Problem::new(
                ProblemField::Locale,
                format!("Unknown locale: {token}"),
            )),
        ),
    }
}

fn validate_time_zone(raw: Option<&str>) -> (Option<ResolvedTimeZone>, Option<Problem>) {
    let token = raw.unwrap_or("").trim();
    if token.is_empty() {
        return (Some(default_time_zone()), None);
    }
    match settings::resolve_time_zone(token) {
        Some(zone) => (Some(zone), None),
        None => (
            None,
            Some(Problem::new(
                ProblemField::TimeZone,
                format!("Unknown time zone: {token}"),
            )),
        ),
    }
}

/// Flattens an error's cause chain into one line: outermost message first,
/// each distinct cause appended as `; caused by: <message>`. Consecutive
/// duplicates are skipped because Tera repeats the template name in nested
/// errors.
pub fn flatten_causes(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut previous = message.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if text != previous {
            message.push_str("; caused by: ");
            message.push_str(&text);
            previous = text;
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn engine() -> RenderEngine {
        RenderEngine::new(2, 100_000)
    }

    fn request(template: &str, data_model: &str) -> ExecuteRequest {
        ExecuteRequest {
            template: Some(template.to_string()),
            data_model: Some(data_model.to_string()),
            ..ExecuteRequest::default()
        }
    }

    fn problems(outcome: ExecuteOutcome) -> Vec<Problem> {
        match outcome {
            ExecuteOutcome::Completed(ExecuteResponse::Problems { problems }) => problems,
            other => panic!("expected a problem response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_template_and_data_model_short_circuit() {
        let outcome = execute(&engine(), &ExecuteRequest::default()).await;
        assert_matches!(outcome, ExecuteOutcome::EmptyRequest);

        let outcome = execute(&engine(), &request("   \n", "\t")).await;
        assert_matches!(outcome, ExecuteOutcome::EmptyRequest);
    }

    #[tokio::test]
    async fn oversized_template_cites_the_limit() {
        let req = request(&"x".repeat(MAX_TEMPLATE_INPUT_LENGTH + 1), "");
        let problems = problems(execute(&engine(), &req).await);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field, ProblemField::Template);
        assert!(problems[0].message.contains("10000"));
    }

    #[tokio::test]
    async fn oversized_data_model_cites_the_limit() {
        let req = request("", &"x".repeat(MAX_DATA_MODEL_INPUT_LENGTH + 1));
        let problems = problems(execute(&engine(), &req).await);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field, ProblemField::DataModel);
        assert!(problems[0].message.contains("10000"));
    }

    #[tokio::test]
    async fn data_model_parse_failure_is_wrapped() {
        let req = request("hi", "not an entry at all!");
        let problems = problems(execute(&engine(), &req).await);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field, ProblemField::DataModel);
        assert!(problems[0].message.starts_with(DATA_MODEL_ERROR_HEADING));
        assert!(problems[0].message.ends_with(DATA_MODEL_ERROR_FOOTER));
    }

    #[tokio::test]
    async fn unknown_tokens_name_the_token_and_block_dispatch() {
        let req = ExecuteRequest {
            output_format: Some("bogus".into()),
            ..request("Hello", "")
        };
        let problems = problems(execute(&engine(), &req).await);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field, ProblemField::OutputFormat);
        assert_eq!(problems[0].message, "Unknown output format: bogus");
    }

    #[tokio::test]
    async fn problems_arrive_in_field_declaration_order() {
        let req = ExecuteRequest {
            template: Some("x".repeat(MAX_TEMPLATE_INPUT_LENGTH + 1)),
            data_model: Some("broken!".into()),
            output_format: Some("nope".into()),
            locale: Some("xx_XX".into()),
            time_zone: Some("Mars/Olympus_Mons".into()),
        };
        let problems = problems(execute(&engine(), &req).await);
        let fields: Vec<_> = problems.iter().map(|p| p.field).collect();
        assert_eq!(
            fields,
            [
                ProblemField::Template,
                ProblemField::DataModel,
                ProblemField::OutputFormat,
                ProblemField::Locale,
                ProblemField::TimeZone,
            ]
        );
        assert!(problems[4].message.contains("Mars/Olympus_Mons"));
    }

    #[tokio::test]
    async fn blank_settings_fall_back_to_defaults_without_problems() {
        let req = ExecuteRequest {
            output_format: Some("  ".into()),
            locale: Some(String::new()),
            ..request("{{ locale }} {{ time_zone }}", "")
        };
        let outcome = execute(&engine(), &req).await;
        let ExecuteOutcome::Completed(ExecuteResponse::Result { result, .. }) = outcome else {
            panic!("expected a result response");
        };
        assert_eq!(result, "en_US UTC");
    }

    #[tokio::test]
    async fn valid_request_renders() {
        let req = request("Hello {{ name }}", "name: \"World\"");
        let outcome = execute(&engine(), &req).await;
        let ExecuteOutcome::Completed(ExecuteResponse::Result {
            result,
            truncated_result,
            problems,
        }) = outcome
        else {
            panic!("expected a result response");
        };
        assert_eq!(result, "Hello World");
        assert!(!truncated_result);
        assert!(problems.is_empty());
    }

    #[tokio::test]
    async fn evaluation_failure_becomes_a_template_problem() {
        let req = request("{{ name | no_such_filter }}", "name: \"x\"");
        let problems = problems(execute(&engine(), &req).await);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].field, ProblemField::Template);
        assert!(problems[0].message.contains("no_such_filter"));
    }

    #[tokio::test]
    async fn saturated_engine_is_a_system_error_even_for_valid_fields() {
        let starved = RenderEngine::new(0, 100_000);
        let req = request("Hello {{ name }}", "name: \"World\"");
        let outcome = execute(&starved, &req).await;
        assert_matches!(outcome, ExecuteOutcome::Overloaded);
    }

    #[test]
    fn flatten_causes_joins_outermost_first() {
        #[derive(Debug, thiserror::Error)]
        #[error("{message}")]
        struct Link {
            message: &'static str,
            #[source]
            source: Option<Box<Link>>,
        }

        let err = Link {
            message: "outer",
            source: Some(Box::new(Link {
                message: "middle",
                source: Some(Box::new(Link {
                    message: "inner",
                    source: None,
                })),
            })),
        };
        assert_eq!(
            flatten_causes(&err),
            "outer; caused by: middle; caused by: inner"
        );
    }

    #[test]
    fn flatten_causes_skips_consecutive_duplicates() {
        #[derive(Debug, thiserror::Error)]
        #[error("{message}")]
        struct Link {
            message: &'static str,
            #[source]
            source: Option<Box<Link>>,
        }

        let err = Link {
            message: "same",
            source: Some(Box::new(Link {
                message: "same",
                source: Some(Box::new(Link {
                    message: "deeper",
                    source: None,
                })),
            })),
        };
        assert_eq!(flatten_causes(&err), "same; caused by: deeper");
    }
}
