//! MCP surface: the nine `mloop_*` tools over rmcp.
//!
//! MloopServer -> ToolRouter (one #[tool] per handler in crate::tools)
//! serve_stdio  -> runs until the client disconnects or Ctrl-C

use anyhow::{Context, Result};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use tracing::{debug, info};

use crate::tools::{
    ToolContext, compare::CompareParams, evaluate::EvaluateParams, info::InfoParams,
    list::ListParams, predict::PredictParams, promote::PromoteParams, serve::ServeParams,
    status::StatusParams, train::TrainParams,
};

const INSTRUCTIONS: &str = "\
Drives the MLoop CLI (ML.NET AutoML + MLOps). Every tool except mloop_info needs \
projectPath, the directory containing mloop.yaml.

Typical loop: mloop_info on the dataset, mloop_train, mloop_list / mloop_compare \
to pick an experiment, mloop_promote it, then mloop_predict or mloop_serve.

Pass format=\"json\" to list, compare, status, info or evaluate to get the \
tabular / key-value output as JSON.";

#[derive(Clone)]
pub struct MloopServer {
    ctx: ToolContext,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MloopServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    /// Tool metadata as the protocol lists it.
    pub fn tool_definitions(&self) -> Vec<serde_json::Value> {
        self.tool_router
            .list_all()
            .into_iter()
            .filter_map(|tool| serde_json::to_value(tool).ok())
            .collect()
    }

    #[tool(
        description = "Train an ML model using AutoML. Runs mloop train command with specified parameters."
    )]
    async fn mloop_train(
        &self,
        Parameters(params): Parameters<TrainParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_train", project = %params.project_path, "tool call");
        Ok(crate::tools::train::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Run predictions using a trained model. Uses production model by default."
    )]
    async fn mloop_predict(
        &self,
        Parameters(params): Parameters<PredictParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_predict", project = %params.project_path, "tool call");
        Ok(crate::tools::predict::run(&self.ctx, params).await)
    }

    #[tool(
        description = "List all experiments and their metrics for a model."
    )]
    async fn mloop_list(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_list", project = %params.project_path, "tool call");
        Ok(crate::tools::list::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Promote an experiment to production. The experiment's model will be used for predictions."
    )]
    async fn mloop_promote(
        &self,
        Parameters(params): Parameters<PromoteParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_promote", project = %params.project_path, "tool call");
        Ok(crate::tools::promote::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Analyze and profile a dataset. Shows column types, statistics, missing values, and more. Can read label column from mloop.yaml configuration."
    )]
    async fn mloop_info(
        &self,
        Parameters(params): Parameters<InfoParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_info", data = %params.data_file, "tool call");
        Ok(crate::tools::info::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Show MLoop project status including models, experiments, and production deployments."
    )]
    async fn mloop_status(
        &self,
        Parameters(params): Parameters<StatusParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_status", project = %params.project_path, "tool call");
        Ok(crate::tools::status::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Compare metrics across multiple experiments to identify the best performing model."
    )]
    async fn mloop_compare(
        &self,
        Parameters(params): Parameters<CompareParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_compare", project = %params.project_path, "tool call");
        Ok(crate::tools::compare::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Evaluate a model's performance on test data. Shows detailed metrics."
    )]
    async fn mloop_evaluate(
        &self,
        Parameters(params): Parameters<EvaluateParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_evaluate", project = %params.project_path, "tool call");
        Ok(crate::tools::evaluate::run(&self.ctx, params).await)
    }

    #[tool(
        description = "Start the MLoop REST API server for serving predictions via HTTP."
    )]
    async fn mloop_serve(
        &self,
        Parameters(params): Parameters<ServeParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "mloop_serve", project = %params.project_path, "tool call");
        Ok(crate::tools::serve::run(&self.ctx, params).await)
    }
}

#[tool_handler]
impl ServerHandler for MloopServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Serve over stdin/stdout until the peer disconnects or the process is interrupted.
pub async fn serve_stdio(ctx: ToolContext) -> Result<()> {
    info!(
        program = ctx.runner.executable().program(),
        mloop = %ctx.runner.executable(),
        "starting MCP server on stdio"
    );
    let service = MloopServer::new(ctx)
        .serve(rmcp::transport::io::stdio())
        .await
        .context("failed to start MCP server")?;

    let token = service.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            token.cancel();
        }
    });

    let reason = service.waiting().await.context("MCP server task failed")?;
    debug!(?reason, "MCP server stopped");
    Ok(())
}
