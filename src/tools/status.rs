//! `mloop_status` - project overview.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{OutputFormat, Shape, ToolContext, exec_failure, render, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};

pub const NAME: &str = "mloop_status";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Response format: "text" (default) or "json" (parsed key/value summary)
    pub format: Option<OutputFormat>,
}

pub fn args(_: &StatusParams) -> Vec<String> {
    build_args("status", None::<&str>, None::<(&str, ArgValue)>)
}

pub async fn run(ctx: &ToolContext, params: StatusParams) -> CallToolResult {
    let options = ExecuteOptions::default().in_dir(&params.project_path);
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(render(stdout_of(&out), params.format, Shape::KeyValue), || {
            "No status information available.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
