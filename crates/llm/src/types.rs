use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Structured summary of a video or article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleSummary {
    /// Short prose summary
    pub summary: String,

    /// Key takeaways, in order
    pub key_points: Vec<String>,

    /// Topic tags, in order
    pub topics: Vec<String>,
}

/// Mindmap document as emitted by the model
///
/// `nodeData`, `arrows` and `summaries` are siblings at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapDocument {
    /// Root node
    pub node_data: MindmapNode,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub arrows: Option<Vec<MindmapArrow>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Vec<MindmapSummary>>,
}

/// Recursive mindmap node
///
/// Only the root's `topic`/`id` are guaranteed by validation. Everything
/// below is read leniently: wrong-typed fields fall back to defaults and
/// list entries that are not objects are skipped, so a validated document
/// always deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub topic: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    /// Tags, meaningful on the root only
    #[serde(default, deserialize_with = "lenient_tags", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MindmapNode>>,

    /// Renderer-specific keys kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Bracket annotation summarising children `start..=end` of `parent`
///
/// `parent` is never the root; the model is instructed so, nothing here
/// checks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapSummary {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parent: String,
    #[serde(default, deserialize_with = "lenient_index")]
    pub start: i64,
    #[serde(default, deserialize_with = "lenient_index")]
    pub end: i64,
}

/// Labelled arrow between two arbitrary nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapArrow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: String,
    /// Control point offset from the start node
    #[serde(default, deserialize_with = "lenient_delta")]
    pub delta1: Delta,
    /// Control point offset from the end node
    #[serde(default, deserialize_with = "lenient_delta")]
    pub delta2: Delta,
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub bidirectional: Option<bool>,
}

/// 2D offset of an arrow control point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub x: f64,
    pub y: f64,
}

impl Default for Delta {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accept numbers (`"id": 3`) or null alongside strings
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

/// A tag list, a single tag string, or nothing
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Array(items) => Some(items.into_iter().map(value_to_string).collect()),
        other => Some(vec![value_to_string(other)]),
    })
}

/// Array of objects; entries that do not deserialize are skipped
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

/// Child index; floats are truncated, anything else is 0
fn lenient_index<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let index = match value.as_i64() {
        Some(i) => i,
        None => value_to_f64(&value).map(|f| f as i64).unwrap_or_default(),
    };
    Ok(index)
}

/// `{x, y}` with missing or non-numeric parts at their defaults
fn lenient_delta<'de, D>(deserializer: D) -> Result<Delta, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let default = Delta::default();
    Ok(Delta {
        x: value_to_f64(&value["x"]).unwrap_or(default.x),
        y: value_to_f64(&value["y"]).unwrap_or(default.y),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl MindmapNode {
    /// This node and all descendants, breadth first
    pub fn walk(&self) -> Vec<&MindmapNode> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let node = out[i];
            if let Some(children) = &node.children {
                out.extend(children.iter());
            }
            i += 1;
        }
        out
    }
}

impl MindmapDocument {
    /// Total number of nodes including the root
    pub fn node_count(&self) -> usize {
        self.node_data.walk().len()
    }

    /// Node ids that appear more than once
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for node in self.node_data.walk() {
            if !seen.insert(node.id.as_str()) && !dups.contains(&node.id) {
                dups.push(node.id.clone());
            }
        }
        dups
    }
}
