use serde_json::Value;

pub fn compact_error(value: &str) -> String {
    const LIMIT: usize = 120;
    let cleaned = value.replace('\n', " ");
    if cleaned.chars().count() <= LIMIT {
        return cleaned;
    }
    let truncated = cleaned.chars().take(LIMIT).collect::<String>();
    format!("{truncated}...")
}

/// Short label for a pipeline input, used in logs and error lines.
pub fn describe_input(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => ["key", "name", "id"]
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .unwrap_or("-")
            .to_string(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
