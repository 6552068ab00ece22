//! `mloop_serve` - start the prediction REST API.
//!
//! `mloop serve` never exits on its own. The call runs under the short serve
//! deadline and a timeout is reported as a successful start.
//!
//! Known limitation: the executor still terminates the process at that
//! deadline (SIGTERM, then a hard kill after the grace period), so the server
//! does not actually keep running after the reply.

use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::{ToolContext, exec_failure, present, reply, stdout_of};
use crate::exec::{ArgValue, ExecuteOptions, build_args};
use crate::parse::clean_output;

pub const NAME: &str = "mloop_serve";

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServeParams {
    /// Path to MLoop project directory
    pub project_path: String,
    /// Port number to listen on (default: 5000)
    pub port: Option<u16>,
    /// Host address to bind to
    pub host: Option<String>,
}

pub fn args(p: &ServeParams) -> Vec<String> {
    build_args(
        "serve",
        None::<String>,
        [
            ("port", ArgValue::from(p.port.filter(|port| *port != 0))),
            ("host", present(&p.host).into()),
        ],
    )
}

pub async fn run(ctx: &ToolContext, params: ServeParams) -> CallToolResult {
    let port = params.port.unwrap_or(DEFAULT_PORT);
    let options = ExecuteOptions::default()
        .in_dir(&params.project_path)
        .with_timeout(ctx.timeouts.serve());

    match ctx.runner.execute(&args(&params), options).await {
        Ok(out) => reply(clean_output(stdout_of(&out)), || {
            format!("API server starting on port {port}...")
        }),
        Err(e) if e.is_timeout() => {
            info!(port, "serve still running at deadline; treating as started");
            reply(
                format!(
                    "API server started on port {port}. The server is running in the background."
                ),
                String::new,
            )
        }
        Err(e) => exec_failure(&e),
    }
}
