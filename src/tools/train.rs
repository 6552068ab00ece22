//! `mloop_train` - AutoML training.
//!
//! mloop train [dataFile] [label] [--task T] [--time S] [--metric M] [--name N]

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::{ToolContext, exec_failure, present, reply, reply_error, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};
use crate::parse::clean_output;

pub const NAME: &str = "mloop_train";

/// ML task type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    BinaryClassification,
    MulticlassClassification,
    Regression,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::BinaryClassification => "binary-classification",
            TaskType::MulticlassClassification => "multiclass-classification",
            TaskType::Regression => "regression",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Training data file path (default: datasets/train.csv)
    pub data_file: Option<String>,
    /// Label column name for training
    pub label: Option<String>,
    /// ML task type
    pub task: Option<TaskType>,
    /// Training time limit in seconds
    pub time: Option<f64>,
    /// Optimization metric (e.g., Accuracy, F1Score, RSquared)
    pub metric: Option<String>,
    /// Model name for namespacing (default: "default")
    pub model_name: Option<String>,
}

pub fn args(p: &TrainParams) -> Vec<String> {
    let positional = [present(&p.data_file), present(&p.label)];
    build_args(
        "train",
        positional.into_iter().flatten(),
        [
            ("task", ArgValue::from(p.task.map(|t| t.as_str()))),
            ("time", p.time.filter(|t| *t != 0.0).into()),
            ("metric", present(&p.metric).into()),
            ("name", present(&p.model_name).into()),
        ],
    )
}

pub async fn run(ctx: &ToolContext, params: TrainParams) -> CallToolResult {
    if let Some(t) = params.time
        && (t.is_nan() || t <= 0.0)
    {
        return reply_error(format!("time must be a positive number of seconds, got {t}"));
    }

    let argv = args(&params);
    info!(project = %params.project_path, "training model");
    let options = ExecuteOptions::default()
        .in_dir(&params.project_path)
        .with_timeout(ctx.timeouts.train());

    match ctx.runner.execute(&argv, options).await {
        Ok(out) => reply(clean_output(stdout_of(&out)), || {
            "Training completed successfully.".into()
        }),
        Err(e) => exec_failure(&e),
    }
}
