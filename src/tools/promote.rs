//! `mloop_promote` - make an experiment the production model.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::{ToolContext, exec_failure, present, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};
use crate::parse::clean_output;

pub const NAME: &str = "mloop_promote";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoteParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Experiment ID to promote (e.g., exp-003)
    pub experiment_id: String,
    /// Model name for namespacing
    pub model_name: Option<String>,
    /// Skip confirmation prompt
    pub force: Option<bool>,
}

pub fn args(p: &PromoteParams) -> Vec<String> {
    build_args(
        "promote",
        [p.experiment_id.as_str()],
        [
            ("name", ArgValue::from(present(&p.model_name))),
            ("force", p.force.into()),
        ],
    )
}

pub async fn run(ctx: &ToolContext, params: PromoteParams) -> CallToolResult {
    info!(experiment = %params.experiment_id, "promoting experiment");
    let options = ExecuteOptions::default().in_dir(&params.project_path);
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(clean_output(stdout_of(&out)), || {
            format!(
                "Experiment {} promoted to production successfully.",
                params.experiment_id
            )
        }),
        Err(e) => exec_failure(&e),
    }
}
