/*!
`tools.rs`

Implements `mloop-mcp tools`: print the registered MCP tools without
starting a transport.

JSON Output Shape:
{
  "status": "ok",
  "count": 9,
  "tools": [ { "name": "...", "description": "...", "inputSchema": {...} } ]
}
*/

use anyhow::Result;
use clap::Args;
use serde_json::Value;

use crate::cmd::shared::{param_summary, tool_catalog};
use crate::tools::ToolContext;

/// CLI arguments for `mloop-mcp tools`
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

pub fn execute_tools(ctx: &ToolContext, args: ToolsArgs) -> Result<()> {
    let catalog = tool_catalog(ctx);
    let tools = catalog
        .get("tools")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if args.json {
        let out = serde_json::json!({
            "status": "ok",
            "count": tools.len(),
            "tools": tools,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Tools ({}) - mloop: {}", tools.len(), ctx.runner.executable());
    for (idx, tool) in tools.iter().enumerate() {
        let name = tool.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
        let description = tool
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        println!("\n{:>2}. {name}", idx + 1);
        if !description.is_empty() {
            println!("    {description}");
        }
        if let Some(obj) = tool.as_object() {
            let params = param_summary(obj);
            if !params.is_empty() {
                println!("    params: {params}");
            }
        }
    }
    println!("\n(* = required)");
    Ok(())
}
