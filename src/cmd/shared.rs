/*!
shared.rs - helpers shared by the `tools` and `call` subcommands.

Focus:
  - tool_catalog: the server's tool definitions as `{"tools": [...]}`
  - find_tool_case_insensitive / required_params / param_summary
  - parse_param_pairs / load_param_file_into_map (KEY=VALUE and JSON/YAML files)
  - build_arguments_from_schema + primitive coercion
*/

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::mcp::MloopServer;
use crate::tools::ToolContext;

/// Tool definitions exactly as `tools/list` reports them.
pub fn tool_catalog(ctx: &ToolContext) -> Value {
    let server = MloopServer::new(ctx.clone());
    serde_json::json!({ "tools": server.tool_definitions() })
}

/// Find a tool (case-insensitive name match) returning a cloned JSON object.
pub fn find_tool_case_insensitive(catalog: &Value, name: &str) -> Option<Value> {
    catalog
        .get("tools")?
        .as_array()?
        .iter()
        .find(|t| {
            t.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .cloned()
}

fn input_schema(tool: &Map<String, Value>) -> Option<&Map<String, Value>> {
    tool.get("inputSchema")
        .or_else(|| tool.get("input_schema"))
        .and_then(Value::as_object)
}

pub fn required_params(tool: &Map<String, Value>) -> HashSet<String> {
    input_schema(tool)
        .and_then(|s| s.get("required"))
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Primitive JSON type of one schema property.
///
/// Optional fields come out as `["string", "null"]`; the first non-null entry
/// wins. Enum references and anything unrecognized are strings.
pub fn schema_type(property: &Value) -> &str {
    match property.get("type") {
        Some(Value::String(t)) => t,
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("string"),
        _ => "string",
    }
}

/// `projectPath*, dataFile, time:number` style summary (required marked with `*`).
pub fn param_summary(tool: &Map<String, Value>) -> String {
    let required = required_params(tool);
    let Some(props) = input_schema(tool)
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object)
    else {
        return String::new();
    };

    props
        .iter()
        .map(|(name, prop)| {
            let mut entry = name.clone();
            if required.contains(name) {
                entry.push('*');
            }
            match schema_type(prop) {
                "string" => {}
                other => {
                    entry.push(':');
                    entry.push_str(other);
                }
            }
            entry
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse repeated `--param KEY=VALUE` strings.
pub fn parse_param_pairs(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut provided = HashMap::new();
    for kv in pairs {
        let Some((k, v)) = kv.split_once('=') else {
            bail!("invalid --param (expected KEY=VALUE): {kv}");
        };
        let key = k.trim();
        if key.is_empty() {
            bail!("invalid --param (empty key): {kv}");
        }
        provided.insert(key.to_string(), v.trim().to_string());
    }
    Ok(provided)
}

/// Merge a JSON or YAML object file into `provided`; keys already present win.
pub fn load_param_file_into_map(path: &Path, provided: &mut HashMap<String, String>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let value: Value = if is_yaml {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let Value::Object(obj) = value else {
        bail!("param file root must be an object");
    };

    for (k, v) in obj {
        if provided.contains_key(&k) {
            continue;
        }
        let s = match v {
            Value::String(s) => s,
            Value::Array(items) => items
                .iter()
                .map(|i| match i {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            other => other.to_string(),
        };
        provided.insert(k, s);
    }
    Ok(())
}

/// Build a JSON arguments object from raw strings using the tool's input schema.
///
/// Each known property is coerced by its declared type; a missing required
/// property is an error. Keys the schema does not declare pass through as strings.
pub fn build_arguments_from_schema(
    tool: &Map<String, Value>,
    provided: &HashMap<String, String>,
) -> Result<Map<String, Value>> {
    let required = required_params(tool);
    let mut remaining = provided.clone();
    let mut result = Map::new();

    if let Some(props) = input_schema(tool)
        .and_then(|s| s.get("properties"))
        .and_then(Value::as_object)
    {
        for (name, prop) in props {
            if let Some(raw) = remaining.remove(name) {
                result.insert(name.clone(), coerce_value(&raw, schema_type(prop)));
            } else if required.contains(name) {
                bail!("missing required parameter: {name}");
            }
        }
    }

    for (k, v) in remaining {
        result.insert(k, Value::String(v));
    }
    Ok(result)
}

/// Coerce a raw string into a JSON value using a primitive type hint.
pub fn coerce_value(raw: &str, type_hint: &str) -> Value {
    let fallback = || Value::String(raw.to_string());
    match type_hint {
        "integer" => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| fallback()),
        "number" => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(fallback),
        "boolean" => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => fallback(),
        },
        "array" => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        _ => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::echo_context;
    use serde_json::json;
    use std::io::Write;

    fn tool(catalog: &Value, name: &str) -> Map<String, Value> {
        find_tool_case_insensitive(catalog, name)
            .and_then(|v| v.as_object().cloned())
            .unwrap()
    }

    #[test]
    fn coerce_primitives() {
        assert_eq!(coerce_value("42", "integer"), json!(42));
        assert_eq!(coerce_value("x42", "integer"), json!("x42"));
        assert_eq!(coerce_value("120", "number"), json!(120.0));
        assert_eq!(coerce_value("No", "boolean"), json!(false));
        assert_eq!(coerce_value("maybe", "boolean"), json!("maybe"));
        assert_eq!(coerce_value("exp-1, exp-2,", "array"), json!(["exp-1", "exp-2"]));
    }

    #[test]
    fn nullable_types_resolve_to_the_concrete_type() {
        assert_eq!(schema_type(&json!({"type": ["number", "null"]})), "number");
        assert_eq!(schema_type(&json!({"type": "array"})), "array");
        assert_eq!(schema_type(&json!({"anyOf": [{"$ref": "#/$defs/TaskType"}]})), "string");
    }

    #[test]
    fn catalog_lookup_ignores_case() {
        let catalog = tool_catalog(&echo_context());
        let found = find_tool_case_insensitive(&catalog, "MLOOP_STATUS").unwrap();
        assert_eq!(found["name"], "mloop_status");
        assert!(find_tool_case_insensitive(&catalog, "mloop_missing").is_none());
    }

    #[test]
    fn train_arguments_are_coerced_from_schema() {
        let catalog = tool_catalog(&echo_context());
        let train = tool(&catalog, "mloop_train");

        let provided = parse_param_pairs(&[
            "projectPath=/proj".into(),
            "time=120".into(),
            "task=regression".into(),
        ])
        .unwrap();
        let args = build_arguments_from_schema(&train, &provided).unwrap();
        assert_eq!(args["projectPath"], json!("/proj"));
        assert_eq!(args["time"], json!(120.0));
        assert_eq!(args["task"], json!("regression"));
    }

    #[test]
    fn compare_experiments_become_an_array() {
        let catalog = tool_catalog(&echo_context());
        let compare = tool(&catalog, "mloop_compare");
        let provided =
            parse_param_pairs(&["projectPath=/p".into(), "experiments=exp-1,exp-2".into()])
                .unwrap();
        let args = build_arguments_from_schema(&compare, &provided).unwrap();
        assert_eq!(args["experiments"], json!(["exp-1", "exp-2"]));
    }

    #[test]
    fn missing_required_parameter() {
        let catalog = tool_catalog(&echo_context());
        let promote = tool(&catalog, "mloop_promote");
        let provided = parse_param_pairs(&["projectPath=/p".into()]).unwrap();
        let err = build_arguments_from_schema(&promote, &provided).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: experimentId"));
    }

    #[test]
    fn summary_marks_required_and_typed_params() {
        let catalog = tool_catalog(&echo_context());
        let summary = param_summary(&tool(&catalog, "mloop_serve"));
        assert!(summary.contains("projectPath*"));
        assert!(summary.contains("port:integer"));
    }

    #[test]
    fn malformed_param_pairs() {
        assert!(parse_param_pairs(&["novalue".into()]).is_err());
        assert!(parse_param_pairs(&["=x".into()]).is_err());
    }

    #[test]
    fn param_file_yaml_merge_keeps_cli_values() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "projectPath: /from-file\nexperiments: [exp-1, exp-2]\nforce: true").unwrap();

        let mut provided = HashMap::from([("projectPath".to_string(), "/cli".to_string())]);
        load_param_file_into_map(file.path(), &mut provided).unwrap();
        assert_eq!(provided["projectPath"], "/cli");
        assert_eq!(provided["experiments"], "exp-1,exp-2");
        assert_eq!(provided["force"], "true");
    }

    #[test]
    fn param_file_json_root_must_be_object() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[1, 2]").unwrap();
        let mut provided = HashMap::new();
        let err = load_param_file_into_map(file.path(), &mut provided).unwrap_err();
        assert!(err.to_string().contains("root must be an object"));
    }
}
