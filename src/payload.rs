//! Payload 解析模块 - 从不可信的推送 payload 中提取结构化字段
//!
//! The push transport hands over an arbitrary JSON document. Its shape
//! cannot be trusted: the "aps" section may be missing, mistyped, or
//! adversarial. Extraction therefore never fails; malformed input degrades
//! to empty fields so the intake path stays alive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// 原始推送 payload（由推送通道投递，不可信）
///
/// Expected to be a JSON object; any other shape degrades to an empty
/// [`ParsedNotification`].
pub type RawPayload = Value;

/// 解析后的通知
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedNotification {
    /// aps.alert 文本（裸字符串，或 alert 字典的 body）
    pub alert: Option<String>,
    /// aps.sound 指定的声音文件名（仅当为非空字符串时存在）
    pub sound_file_name: Option<String>,
    /// aps.category 通知分类
    pub category_id: Option<String>,
    /// aps 以外的自定义键值对（值可转为字符串时保留）
    pub custom_fields: BTreeMap<String, String>,
}

impl ParsedNotification {
    /// Whether the payload asked for a sound to be played.
    pub fn has_sound(&self) -> bool {
        self.sound_file_name.is_some()
    }

    /// Category identifier, or "" when the payload carried none.
    pub fn category(&self) -> &str {
        self.category_id.as_deref().unwrap_or("")
    }
}

/// 从原始 payload 提取 [`ParsedNotification`]
///
/// Total over every possible `Value`: missing "aps", wrong types, and
/// non-object roots all degrade to empty fields instead of an error.
pub fn parse(raw: &RawPayload) -> ParsedNotification {
    let Some(root) = raw.as_object() else {
        debug!("payload root is not an object, degrading to empty notification");
        return ParsedNotification::default();
    };

    let aps = root.get("aps").and_then(Value::as_object);
    if aps.is_none() && root.contains_key("aps") {
        debug!("payload carries a non-object aps section, ignoring it");
    }

    let alert = aps.and_then(|a| a.get("alert")).and_then(alert_text);

    let sound_file_name = aps
        .and_then(|a| a.get("sound"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let category_id = aps
        .and_then(|a| a.get("category"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut custom_fields = BTreeMap::new();
    let mut dropped = 0usize;
    for (key, value) in root {
        if key == "aps" {
            continue;
        }
        match coerce_to_string(value) {
            Some(s) => {
                custom_fields.insert(key.clone(), s);
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "dropped custom fields not representable as strings");
    }

    ParsedNotification {
        alert,
        sound_file_name,
        category_id,
        custom_fields,
    }
}

/// aps.alert 支持两种形态：裸字符串，或带 body 的字典
fn alert_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(o) => o
            .get("body")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Strings pass through; numbers and booleans coerce via display.
/// Null, arrays and objects are not representable and are dropped.
fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sound_and_category() {
        let raw = json!({
            "aps": {"sound": "tarzanwut.aiff", "category": "TIMER_EXPIRED"}
        });
        let parsed = parse(&raw);

        assert_eq!(parsed.sound_file_name.as_deref(), Some("tarzanwut.aiff"));
        assert_eq!(parsed.category_id.as_deref(), Some("TIMER_EXPIRED"));
        assert!(parsed.has_sound());
        assert_eq!(parsed.category(), "TIMER_EXPIRED");
    }

    #[test]
    fn test_parse_missing_aps_yields_empty_fields() {
        let raw = json!({"myKey": "myValue"});
        let parsed = parse(&raw);

        assert!(parsed.alert.is_none());
        assert!(parsed.sound_file_name.is_none());
        assert!(parsed.category_id.is_none());
        // 自定义键不受 aps 缺失影响
        assert_eq!(parsed.custom_fields.get("myKey").map(String::as_str), Some("myValue"));
    }

    #[test]
    fn test_parse_non_object_root_degrades() {
        for raw in [json!(null), json!(42), json!("aps"), json!(["aps"])] {
            let parsed = parse(&raw);
            assert_eq!(parsed, ParsedNotification::default());
        }
    }

    #[test]
    fn test_parse_non_object_aps_degrades() {
        let raw = json!({"aps": "not-a-dict", "extra": "kept"});
        let parsed = parse(&raw);

        assert!(parsed.sound_file_name.is_none());
        assert!(parsed.category_id.is_none());
        assert_eq!(parsed.custom_fields.get("extra").map(String::as_str), Some("kept"));
    }

    #[test]
    fn test_parse_empty_or_mistyped_sound_is_absent() {
        let empty = json!({"aps": {"sound": ""}});
        assert!(parse(&empty).sound_file_name.is_none());

        let number = json!({"aps": {"sound": 7}});
        assert!(parse(&number).sound_file_name.is_none());

        let nested = json!({"aps": {"sound": {"name": "x.aiff"}}});
        assert!(parse(&nested).sound_file_name.is_none());
    }

    #[test]
    fn test_parse_alert_string_form() {
        let raw = json!({"aps": {"alert": "Timer finished"}});
        assert_eq!(parse(&raw).alert.as_deref(), Some("Timer finished"));
    }

    #[test]
    fn test_parse_alert_dictionary_form() {
        let raw = json!({"aps": {"alert": {"title": "Timer", "body": "Time is up"}}});
        assert_eq!(parse(&raw).alert.as_deref(), Some("Time is up"));

        let no_body = json!({"aps": {"alert": {"title": "Timer"}}});
        assert!(parse(&no_body).alert.is_none());
    }

    #[test]
    fn test_parse_custom_field_coercion() {
        let raw = json!({
            "aps": {"sound": "ding.aiff"},
            "myKey": "myValue",
            "retries": 3,
            "urgent": true,
            "blob": {"nested": "dropped"},
            "list": [1, 2, 3],
            "nothing": null
        });
        let parsed = parse(&raw);

        assert_eq!(parsed.custom_fields.get("myKey").map(String::as_str), Some("myValue"));
        assert_eq!(parsed.custom_fields.get("retries").map(String::as_str), Some("3"));
        assert_eq!(parsed.custom_fields.get("urgent").map(String::as_str), Some("true"));
        // 嵌套结构、数组、null 被丢弃而不是强转
        assert!(!parsed.custom_fields.contains_key("blob"));
        assert!(!parsed.custom_fields.contains_key("list"));
        assert!(!parsed.custom_fields.contains_key("nothing"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let raw = json!({
            "aps": {"sound": "ding.aiff", "category": "TIMER_EXPIRED"},
            "b": "2", "a": "1"
        });
        assert_eq!(parse(&raw), parse(&raw));
    }
}
