//! `--set` style value options.

use serde_json::{Map, Value};

/// Raw per-request value overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueOptions {
    /// Each item is a comma-separated list of `path.to.key=value` pairs
    pub set: Vec<String>,
}

impl ValueOptions {
    /// Options from a request `args` string; blank means no overrides.
    pub fn from_args(args: &str) -> Self {
        let args = args.trim();
        if args.is_empty() {
            Self::default()
        } else {
            Self {
                set: vec![args.to_string()],
            }
        }
    }

    /// Merge every `set` item, later assignments winning.
    pub fn merge_values(&self) -> anyhow::Result<Value> {
        let mut root = Map::new();
        for item in &self.set {
            parse_into(item, &mut root)?;
        }
        Ok(Value::Object(root))
    }
}

/// Parse `a.b=c,d=e` into `root`.
pub fn parse_into(input: &str, root: &mut Map<String, Value>) -> anyhow::Result<()> {
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("key \"{}\" has no value", pair))?;
        let segments: Vec<&str> = key.trim().split('.').collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            anyhow::bail!("invalid key \"{}\"", key);
        }
        assign(root, &segments, typed_value(raw.trim()));
    }
    Ok(())
}

fn assign(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    let key = first.trim().to_string();
    if rest.is_empty() {
        map.insert(key, value);
        return;
    }

    let child = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(child) = child {
        assign(child, rest, value);
    }
}

fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => match raw.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(raw.to_string()),
        },
    }
}
