/*!
Local subcommands (everything except `serve`).

  tools.rs   (ToolsArgs + execute_tools)  list registered tools
  call.rs    (CallArgs  + execute_call)   invoke one tool without a transport
  shared.rs  catalog lookup, parameter parsing + schema coercion
*/

pub mod call;
pub mod shared;
pub mod tools;

pub use call::{CallArgs, execute_call};
pub use tools::{ToolsArgs, execute_tools};
