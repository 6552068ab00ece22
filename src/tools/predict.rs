//! `mloop_predict` - batch predictions with the production (or named) model.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{ToolContext, exec_failure, present, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};
use crate::parse::clean_output;

pub const NAME: &str = "mloop_predict";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Input data file for predictions (default: datasets/predict.csv)
    pub data_file: Option<String>,
    /// Model name to use for prediction
    pub model_name: Option<String>,
    /// Output file path for predictions
    pub output: Option<String>,
    /// Enable prediction logging to DataStore
    pub log: Option<bool>,
}

pub fn args(p: &PredictParams) -> Vec<String> {
    build_args(
        "predict",
        present(&p.data_file),
        [
            ("name", ArgValue::from(present(&p.model_name))),
            ("output", present(&p.output).into()),
            ("log", p.log.into()),
        ],
    )
}

pub async fn run(ctx: &ToolContext, params: PredictParams) -> CallToolResult {
    let options = ExecuteOptions::default().in_dir(&params.project_path);
    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(clean_output(stdout_of(&out)), || {
            "Prediction completed successfully.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
