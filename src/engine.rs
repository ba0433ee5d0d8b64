//! The rendering engine: a thin admission-controlled wrapper around Tera.
//!
//! Each request gets its own single-template `Tera` instance; user
//! templates are untrusted and must never land in a shared registry. A
//! semaphore caps how many renders run at once, and a render that cannot
//! get a permit is refused outright rather than queued.

use crate::datamodel::DataValue;
use crate::settings::{OutputFormat, ResolvedTimeZone};
use indexmap::IndexMap;
use std::sync::Arc;
use tera::Tera;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Rendered output capped at the configured length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub text: String,
    pub truncated: bool,
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// Admission control is saturated; the work was never started.
    #[error("the rendering engine is at capacity")]
    Overloaded,
    /// The engine accepted the work but evaluating the template failed.
    #[error("template evaluation failed")]
    Evaluation(#[source] tera::Error),
    /// A render worker died before producing an outcome.
    #[error("render worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Fully normalized inputs for one render. Exists only when every field
/// validated cleanly.
#[derive(Debug, Clone)]
pub struct RenderInput {
    pub template: String,
    pub data_model: IndexMap<String, DataValue>,
    pub output_format: OutputFormat,
    pub locale: &'static str,
    pub time_zone: ResolvedTimeZone,
}

pub struct RenderEngine {
    permits: Arc<Semaphore>,
    max_output_len: usize,
}

impl RenderEngine {
    pub fn new(workers: usize, max_output_len: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            max_output_len,
        }
    }

    /// Renders one template, refusing immediately when no worker permit is
    /// available. The render itself runs on the blocking pool.
    pub async fn render(&self, input: RenderInput) -> Result<RenderedOutput, RenderError> {
        let _permit = self
            .permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| RenderError::Overloaded)?;
        let max_output_len = self.max_output_len;
        tokio::task::spawn_blocking(move || render_blocking(input, max_output_len)).await?
    }

    /// Permits currently free, for readiness reporting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

// Tera autoescapes by template-name suffix, so the suffix is how the
// output format reaches the engine.
fn template_name(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Xml => "input.xml",
        f if f.escapes() => "input.html",
        _ => "input.txt",
    }
}

fn render_blocking(
    input: RenderInput,
    max_output_len: usize,
) -> Result<RenderedOutput, RenderError> {
    let name = template_name(input.output_format);
    let mut tera = Tera::default();
    tera.add_raw_template(name, &input.template)
        .map_err(RenderError::Evaluation)?;

    let mut context = tera::Context::new();
    for (key, value) in &input.data_model {
        context.insert(key.as_str(), &bind_value(value, &input));
    }
    // Settings are visible to templates unless the data model shadows them.
    if !input.data_model.contains_key("locale") {
        context.insert("locale", input.locale);
    }
    if !input.data_model.contains_key("time_zone") {
        context.insert("time_zone", input.time_zone.name);
    }

    let text = tera.render(name, &context).map_err(RenderError::Evaluation)?;
    Ok(truncate(text, max_output_len))
}

fn bind_value(value: &DataValue, input: &RenderInput) -> serde_json::Value {
    match value {
        DataValue::Text(text) => serde_json::Value::String(text.clone()),
        DataValue::Json(json) => json.clone(),
        DataValue::DateTime(dt) => {
            let localized = dt.with_timezone(&input.time_zone.offset);
            serde_json::Value::String(
                localized.format(date_time_pattern(input.locale)).to_string(),
            )
        }
    }
}

// Day-first everywhere except English-speaking defaults; good enough for a
// playground, and deterministic.
fn date_time_pattern(locale: &str) -> &'static str {
    if locale.starts_with("en") {
        "%m/%d/%Y %H:%M:%S %:z"
    } else {
        "%d/%m/%Y %H:%M:%S %:z"
    }
}

fn truncate(text: String, max_chars: usize) -> RenderedOutput {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => RenderedOutput {
            text: text[..byte_idx].to_string(),
            truncated: true,
        },
        None => RenderedOutput {
            text,
            truncated: false,
        },
    }
}
