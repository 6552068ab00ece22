//! Argument vector construction for `mloop` invocations.
//!
//! build_args(command, positional, options) -> Vec<String>
//!   command first, then positionals in caller order, then flags in option order.
//! Option keys are camelCase and become `--kebab-case` flags.

use std::fmt;

/// A scalar option value as it should appear on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Not supplied: emits nothing.
    Absent,
    /// `true` emits the bare flag, `false` emits nothing.
    Switch(bool),
    /// Emits the flag followed by this text.
    Text(String),
}

impl ArgValue {
    fn is_emitted(&self) -> bool {
        !matches!(self, ArgValue::Absent | ArgValue::Switch(false))
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Absent => Ok(()),
            ArgValue::Switch(b) => write!(f, "{b}"),
            ArgValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Switch(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Text(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Text(v)
    }
}

impl From<&String> for ArgValue {
    fn from(v: &String) -> Self {
        ArgValue::Text(v.clone())
    }
}

// f64 Display prints integral values without a fraction (120.0 -> "120").
macro_rules! numeric_arg_value {
    ($($t:ty),*) => {
        $(impl From<$t> for ArgValue {
            fn from(v: $t) -> Self {
                ArgValue::Text(v.to_string())
            }
        })*
    };
}

numeric_arg_value!(u16, u32, u64, i32, i64, f64);

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ArgValue::Absent)
    }
}

/// Convert a camelCase option name into a `--kebab-case` flag.
///
/// "modelName" -> "--model-name", "all" -> "--all".
pub fn flag_name(key: &str) -> String {
    let mut flag = String::with_capacity(key.len() + 4);
    flag.push_str("--");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            flag.push('-');
        }
        flag.extend(c.to_lowercase());
    }
    flag
}

/// Build the full argument vector for one `mloop` subcommand.
///
/// Ordering is fixed because the CLI is positional-sensitive:
/// `command`, every positional in order, then one flag (plus value) per
/// emitted option in iteration order.
pub fn build_args<I, S, O, K>(command: &str, positional: I, options: O) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    O: IntoIterator<Item = (K, ArgValue)>,
    K: AsRef<str>,
{
    let mut args = vec![command.to_string()];
    args.extend(positional.into_iter().map(Into::into));

    for (key, value) in options {
        if !value.is_emitted() {
            continue;
        }
        let flag = flag_name(key.as_ref());
        match value {
            ArgValue::Switch(_) => args.push(flag),
            other => {
                args.push(flag);
                args.push(other.to_string());
            }
        }
    }

    args
}
