//! `mloop_evaluate` - metrics on held-out data.
//!
//! mloop evaluate [<experiment-id> [<test-data>]] [--name N]
//!
//! Both positionals are optional but ordered, so a data file without an
//! experiment id is preceded by the literal `production`.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{OutputFormat, Shape, ToolContext, exec_failure, present, render, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};

pub const NAME: &str = "mloop_evaluate";

/// Stands in for the experiment id when only a data file is given.
pub const PRODUCTION_PLACEHOLDER: &str = "production";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Test data file for evaluation
    pub data_file: Option<String>,
    /// Model name to evaluate
    pub model_name: Option<String>,
    /// Specific experiment ID to evaluate (otherwise uses production)
    pub experiment_id: Option<String>,
    /// Response format: "text" (default) or "json" (parsed metrics)
    pub format: Option<OutputFormat>,
}

pub fn args(p: &EvaluateParams) -> Vec<String> {
    let experiment = present(&p.experiment_id);
    let mut positional = Vec::with_capacity(2);
    if let Some(exp) = experiment {
        positional.push(exp);
    }
    if let Some(data) = present(&p.data_file) {
        if experiment.is_none() {
            positional.push(PRODUCTION_PLACEHOLDER);
        }
        positional.push(data);
    }

    build_args(
        "evaluate",
        positional,
        [("name", ArgValue::from(present(&p.model_name)))],
    )
}

pub async fn run(ctx: &ToolContext, params: EvaluateParams) -> CallToolResult {
    let options = ExecuteOptions::default().in_dir(&params.project_path);
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(render(stdout_of(&out), params.format, Shape::KeyValue), || {
            "No evaluation results available.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
