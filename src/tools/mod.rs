/*!
MLoop tool handlers.

One module per MCP tool. Each exposes:
  - `NAME`          the protocol tool name
  - `*Params`       serde + JsonSchema parameter struct (camelCase on the wire)
  - `args(&params)` the `mloop` argument vector
  - `run(ctx, params)` -> CallToolResult (never fails; errors become error results)

`call` dispatches by name for the local `call` subcommand; the MCP server
routes through `crate::mcp::MloopServer` instead.
*/

pub mod compare;
pub mod evaluate;
pub mod info;
pub mod list;
pub mod predict;
pub mod promote;
pub mod serve;
pub mod status;
pub mod train;

use anyhow::{Context, Result, bail};
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{Settings, Timeouts};
use crate::exec::{ExecError, ExecuteResult, MloopRunner};
use crate::parse::{clean_output, parse_key_value_pairs, parse_table, try_parse_structured};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub runner: MloopRunner,
    pub timeouts: Timeouts,
}

impl ToolContext {
    pub fn new(runner: MloopRunner, timeouts: Timeouts) -> Self {
        ToolContext { runner, timeouts }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(ToolContext::new(settings.runner()?, settings.timeouts))
    }
}

/// How a tool's stdout is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Cleaned terminal text
    #[default]
    Text,
    /// JSON extracted from the output (tables / key-value pairs)
    Json,
}

/// What structure to look for when JSON output is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Table,
    KeyValue,
}

/// Every tool name, in registration order.
pub const ALL: [&str; 9] = [
    train::NAME,
    predict::NAME,
    list::NAME,
    promote::NAME,
    info::NAME,
    status::NAME,
    compare::NAME,
    evaluate::NAME,
    serve::NAME,
];

/// Invoke a tool by name with raw JSON arguments.
pub async fn call(
    ctx: &ToolContext,
    name: &str,
    arguments: Map<String, Value>,
) -> Result<CallToolResult> {
    let value = Value::Object(arguments);
    let result = match name {
        train::NAME => train::run(ctx, parse_params(name, value)?).await,
        predict::NAME => predict::run(ctx, parse_params(name, value)?).await,
        list::NAME => list::run(ctx, parse_params(name, value)?).await,
        promote::NAME => promote::run(ctx, parse_params(name, value)?).await,
        info::NAME => info::run(ctx, parse_params(name, value)?).await,
        status::NAME => status::run(ctx, parse_params(name, value)?).await,
        compare::NAME => compare::run(ctx, parse_params(name, value)?).await,
        evaluate::NAME => evaluate::run(ctx, parse_params(name, value)?).await,
        serve::NAME => serve::run(ctx, parse_params(name, value)?).await,
        other => bail!("unknown tool: {other} (expected one of: {})", ALL.join(", ")),
    };
    Ok(result)
}

fn parse_params<T: serde::de::DeserializeOwned>(tool: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).with_context(|| format!("invalid arguments for {tool}"))
}

/// Treat empty strings like missing values.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Success result; `placeholder` stands in for empty output.
pub(crate) fn reply(text: String, placeholder: impl FnOnce() -> String) -> CallToolResult {
    let text = if text.is_empty() { placeholder() } else { text };
    CallToolResult::success(vec![Content::text(text)])
}

pub(crate) fn reply_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

/// Stdout of a successful run; stderr chatter only reaches the log.
pub(crate) fn stdout_of(out: &ExecuteResult) -> &str {
    if !out.stderr.is_empty() {
        debug!(exit_code = out.exit_code, stderr = %out.stderr.trim_end(), "mloop wrote to stderr");
    }
    &out.stdout
}

pub(crate) fn exec_failure(err: &ExecError) -> CallToolResult {
    debug!(exit_code = ?err.exit_code(), timeout = err.is_timeout(), "mloop call failed");
    reply_error(err.format_for_user())
}

/// Render stdout per the requested format.
///
/// JSON mode prefers output that already is JSON, then the extracted shape,
/// then falls back to the cleaned text.
pub(crate) fn render(stdout: &str, format: Option<OutputFormat>, shape: Shape) -> String {
    let text = clean_output(stdout);
    if format.unwrap_or_default() == OutputFormat::Text || text.is_empty() {
        return text;
    }

    if let Some(value) = try_parse_structured::<Value>(&text) {
        return serde_json::to_string_pretty(&value).unwrap_or(text);
    }

    let extracted = match shape {
        Shape::Table => {
            let rows = parse_table(&text);
            (!rows.is_empty()).then(|| serde_json::to_string_pretty(&rows))
        }
        Shape::KeyValue => {
            let pairs = parse_key_value_pairs(&text);
            (!pairs.is_empty()).then(|| serde_json::to_string_pretty(&pairs))
        }
    };

    match extracted {
        Some(Ok(json)) => json,
        _ => text,
    }
}
