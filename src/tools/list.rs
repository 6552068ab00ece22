//! `mloop_list` - experiments and their metrics.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{OutputFormat, Shape, ToolContext, exec_failure, present, render, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};

pub const NAME: &str = "mloop_list";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Filter experiments by model name
    pub model_name: Option<String>,
    /// Show all experiments including failed ones
    pub show_all: Option<bool>,
    /// Response format: "text" (default) or "json" (parsed experiment table)
    pub format: Option<OutputFormat>,
}

pub fn args(p: &ListParams) -> Vec<String> {
    build_args(
        "list",
        None::<String>,
        [
            ("name", ArgValue::from(present(&p.model_name))),
            ("all", p.show_all.into()),
        ],
    )
}

pub async fn run(ctx: &ToolContext, params: ListParams) -> CallToolResult {
    let options = ExecuteOptions::default().in_dir(&params.project_path);
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(render(stdout_of(&out), params.format, Shape::Table), || {
            "No experiments found.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
