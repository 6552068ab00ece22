//! `mloop_info` - dataset profiling.
//!
//! The only tool where the project path is optional; without it the process
//! inherits the server's working directory.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{OutputFormat, Shape, ToolContext, exec_failure, present, render, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};

pub const NAME: &str = "mloop_info";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoParams {
    /// Path to the data file to analyze (CSV)
    pub data_file: String,
    /// MLoop project path for resolving relative paths
    pub project_path: Option<String>,
    /// Label column name (overrides mloop.yaml setting)
    pub label: Option<String>,
    /// Model name to read label configuration from mloop.yaml (default: "default")
    pub model_name: Option<String>,
    /// Response format: "text" (default) or "json" (parsed key/value summary)
    pub format: Option<OutputFormat>,
}

pub fn args(p: &InfoParams) -> Vec<String> {
    build_args(
        "info",
        [p.data_file.as_str()],
        [
            ("label", ArgValue::from(present(&p.label))),
            ("name", present(&p.model_name).into()),
        ],
    )
}

pub async fn run(ctx: &ToolContext, params: InfoParams) -> CallToolResult {
    let mut options = ExecuteOptions::default();
    if let Some(dir) = present(&params.project_path) {
        options = options.in_dir(dir);
    }
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(render(stdout_of(&out), params.format, Shape::KeyValue), || {
            "No data analysis available.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
