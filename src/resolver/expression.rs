//! Path expressions over call arguments / 基于调用参数的路径表达式
//!
//! Grammar: `#root(.segment)*` where `root` is an argument name or a
//! positional alias (`p0`, `a0`, ..) and each segment is an identifier or
//! an array index. Scalars render as strings, `null`, objects and arrays
//! render as nothing.

use serde_json::Value;

use crate::error::{Result, StorageError};
use crate::invocation::Invocation;

use super::DYNAMIC_PREFIX;

pub fn evaluate(invocation: &Invocation, marker: &str) -> Result<Option<String>> {
    let body = marker
        .strip_prefix(DYNAMIC_PREFIX)
        .ok_or_else(|| StorageError::malformed(marker, "not a dynamic marker"))?;
    if body.trim().is_empty() {
        return Err(StorageError::malformed(marker, "empty expression"));
    }

    let segments: Vec<&str> = body.split('.').collect();
    for segment in &segments {
        validate_segment(marker, segment)?;
    }

    let root = segments[0];
    let mut current = match lookup_root(invocation, root) {
        Some(v) => v,
        None => return Ok(None),
    };
    for segment in &segments[1..] {
        current = match step(current, segment) {
            Some(v) => v,
            None => return Ok(None),
        };
    }
    Ok(render(current))
}

fn validate_segment(marker: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(StorageError::malformed(marker, "empty path segment"));
    }
    let is_index = segment.chars().all(|c| c.is_ascii_digit());
    let is_ident = segment
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_index || is_ident {
        Ok(())
    } else {
        Err(StorageError::malformed(marker, format!("invalid path segment [{}]", segment)))
    }
}

fn lookup_root<'a>(invocation: &'a Invocation, root: &str) -> Option<&'a Value> {
    if let Some(value) = invocation.argument(root) {
        return Some(value);
    }
    positional_index(root).and_then(|i| invocation.argument_at(i))
}

/// `p0` / `a0` style positional aliases
fn positional_index(root: &str) -> Option<usize> {
    let digits = root.strip_prefix('p').or_else(|| root.strip_prefix('a'))?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) | Value::Array(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::MethodId;
    use serde_json::json;

    fn invocation() -> Invocation {
        Invocation::new(MethodId::new("OrderService", "archive"), "OrderService")
            .arg("order", json!({ "tenant": { "client": "OSS" }, "tags": ["hot", "cold"] }))
            .arg("region", "eu")
            .arg("shard", 3)
    }

    #[test]
    fn test_nested_paths() {
        let inv = invocation();
        assert_eq!(evaluate(&inv, "#order.tenant.client").unwrap().as_deref(), Some("OSS"));
        assert_eq!(evaluate(&inv, "#order.tags.1").unwrap().as_deref(), Some("cold"));
        assert_eq!(evaluate(&inv, "#shard").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_positional_aliases() {
        let inv = invocation();
        assert_eq!(evaluate(&inv, "#p1").unwrap().as_deref(), Some("eu"));
        assert_eq!(evaluate(&inv, "#a2").unwrap().as_deref(), Some("3"));
        assert_eq!(evaluate(&inv, "#p9").unwrap(), None);
    }

    #[test]
    fn test_non_scalars_and_missing_render_nothing() {
        let inv = invocation();
        assert_eq!(evaluate(&inv, "#order.tenant").unwrap(), None);
        assert_eq!(evaluate(&inv, "#order.tags.7").unwrap(), None);
        assert_eq!(evaluate(&inv, "#missing.deep").unwrap(), None);
        assert_eq!(evaluate(&inv, "#region.length").unwrap(), None);
    }

    #[test]
    fn test_malformed_paths() {
        let inv = invocation();
        for marker in ["#", "#order..client", "#order.", "#or-der", "#order.tenant client"] {
            assert!(
                matches!(evaluate(&inv, marker), Err(StorageError::MalformedMarker { .. })),
                "{} should be malformed",
                marker
            );
        }
    }
}
