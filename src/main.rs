use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod exec;
mod mcp;
mod parse;
mod tools;
mod utils;

use cmd::{CallArgs, ToolsArgs};
use config::{CONFIG_ENV, Settings};
use tools::ToolContext;

/// mloop-mcp - MCP server for the MLoop CLI
///
/// Command layout:
///   mloop-mcp [serve]                          MCP server on stdio (default)
///   mloop-mcp tools [--json]                   list registered tools
///   mloop-mcp call <TOOL> [--param k=v ...]    invoke one tool locally
///
/// Global flags / env:
///   -v / -vv          Increase verbosity (logs go to stderr)
///   -q / --quiet      Errors only
///   --mloop-path      mloop command line (or MLOOP_PATH), e.g. "dotnet /opt/mloop/mloop.dll"
///   --config          YAML settings file (or MLOOP_MCP_CONFIG)
///   RUST_LOG          Overrides the -v/-q level
///
/// Examples:
///   mloop-mcp
///   mloop-mcp tools --json
///   mloop-mcp call mloop_train --param projectPath=./churn --param time=120
///   mloop-mcp call mloop_compare --param-file compare.yaml --json
#[derive(Parser, Debug)]
#[command(
    name = "mloop-mcp",
    version,
    author,
    about = "MCP server exposing the MLoop ML CLI as tools",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// mloop executable command line
    #[arg(long = "mloop-path", env = exec::PATH_ENV, global = true, value_name = "COMMAND")]
    mloop_path: Option<String>,

    /// YAML settings file (timeouts, mloop path, extra environment)
    #[arg(long, env = CONFIG_ENV, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server over stdio
    Serve,

    /// List registered tools
    Tools(ToolsArgs),

    /// Invoke a tool directly
    Call(CallArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", exec::format_error(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?.with_mloop_path(cli.mloop_path);
    let ctx = ToolContext::from_settings(&settings)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => mcp::serve_stdio(ctx).await,
        Commands::Tools(args) => cmd::execute_tools(&ctx, args),
        Commands::Call(args) => cmd::execute_call(&ctx, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["mloop-mcp", "-v"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn call_collects_params() {
        let cli = Cli::try_parse_from([
            "mloop-mcp",
            "call",
            "mloop_train",
            "--param",
            "projectPath=/p",
            "--param",
            "time=60",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Call(args)) => {
                assert_eq!(args.tool, "mloop_train");
                assert_eq!(args.params.len(), 2);
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
