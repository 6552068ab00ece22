/*!
`call.rs`

Implements `mloop-mcp call <TOOL>`: invoke one handler directly, no transport.

Parameter injection:
  --param KEY=VALUE               (repeatable, coerced by the tool's schema)
  --param-file params.(json|yaml) (merged; --param overrides file entries)

JSON Output Shape:
{
  "status": "ok" | "error",
  "tool": "mloop_train",
  "elapsed_ms": 42,
  "arguments": { ... },
  "result": { ...serialized CallToolResult... }
}

The process exits non-zero when the tool reports an error.
*/

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use rmcp::model::CallToolResult;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

use crate::cmd::shared::{
    build_arguments_from_schema, find_tool_case_insensitive, load_param_file_into_map,
    parse_param_pairs, tool_catalog,
};
use crate::tools::{self, ToolContext};

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name to invoke (e.g. mloop_train)
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Provide parameter (KEY=VALUE), repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Load parameters from file (JSON or YAML). CLI --param overrides file entries
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute_call(ctx: &ToolContext, args: CallArgs) -> Result<()> {
    let requested = args.tool.trim();
    if requested.is_empty() {
        bail!("tool name cannot be empty");
    }

    let catalog = tool_catalog(ctx);
    let tool = find_tool_case_insensitive(&catalog, requested)
        .ok_or_else(|| anyhow!("tool '{requested}' not found (see `mloop-mcp tools`)"))?;
    let tool_obj = tool
        .as_object()
        .ok_or_else(|| anyhow!("tool JSON is not an object"))?;
    let name = tool_obj
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(requested)
        .to_string();

    let mut provided = parse_param_pairs(&args.params)?;
    if let Some(path) = &args.param_file {
        load_param_file_into_map(path, &mut provided)?;
    }
    let arguments =
        build_arguments_from_schema(tool_obj, &provided).context("Failed to build arguments")?;
    debug!(tool = %name, ?arguments, "invoking tool locally");

    let started = Instant::now();
    let result = tools::call(ctx, &name, arguments.clone()).await?;
    let elapsed_ms = started.elapsed().as_millis();
    let failed = result.is_error.unwrap_or(false);

    if args.json {
        let out = serde_json::json!({
            "status": if failed { "error" } else { "ok" },
            "tool": name,
            "elapsed_ms": elapsed_ms,
            "arguments": arguments,
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if failed {
        eprintln!("{}", result_text(&result));
    } else {
        println!("{}", result_text(&result));
    }

    if failed {
        bail!("{name} reported an error");
    }
    Ok(())
}

/// Concatenated text blocks of a result.
fn result_text(result: &CallToolResult) -> String {
    let value = serde_json::to_value(result).unwrap_or(Value::Null);
    value
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}
