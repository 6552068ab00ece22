//! `mloop_compare` - side-by-side experiment metrics.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{
    OutputFormat, Shape, ToolContext, exec_failure, present, render, reply, reply_error, stdout_of,
};
use crate::exec::{ArgValue, ExecuteOptions, build_args};

pub const NAME: &str = "mloop_compare";

pub const MIN_EXPERIMENTS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompareParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// List of experiment IDs to compare (e.g., ["exp-001", "exp-002"])
    #[schemars(length(min = 2))]
    pub experiments: Vec<String>,
    /// Model name for namespacing
    pub model_name: Option<String>,
    /// Response format: "text" (default) or "json" (parsed comparison table)
    pub format: Option<OutputFormat>,
}

pub fn args(p: &CompareParams) -> Vec<String> {
    build_args(
        "compare",
        p.experiments.iter().map(String::as_str),
        [("name", ArgValue::from(present(&p.model_name)))],
    )
}

pub async fn run(ctx: &ToolContext, params: CompareParams) -> CallToolResult {
    if params.experiments.len() < MIN_EXPERIMENTS {
        return reply_error(format!(
            "At least {MIN_EXPERIMENTS} experiments are required for comparison, got {}",
            params.experiments.len()
        ));
    }

    let options = ExecuteOptions::default().in_dir(&params.project_path);
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(render(stdout_of(&out), params.format, Shape::Table), || {
            "No comparison data available.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
