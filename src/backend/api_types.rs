//! Wire-level encodings that do not map one-to-one onto serde derives.
//!
//! The backend wraps every reply in a result envelope and encodes tagged
//! variants as single-key objects. These helpers keep that knowledge out of
//! the domain types.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::types::ActivityType;

/// Reply envelope returned by every remote procedure
#[derive(Debug, Deserialize)]
pub enum RpcReply {
  Ok(Value),
  Err(String),
}

// ============================================================================
// Activity variant
// ============================================================================

impl From<Value> for ActivityType {
  fn from(value: Value) -> Self {
    match value {
      // Tag-only variants may arrive as a bare string
      Value::String(tag) => activity_from_tag(tag, Value::Null),
      Value::Object(map) => activity_from_object(map),
      other => {
        tracing::warn!(value = %other, "malformed activity payload");
        ActivityType::Unknown(other.to_string())
      }
    }
  }
}

impl From<ActivityType> for Value {
  fn from(activity: ActivityType) -> Self {
    match activity {
      ActivityType::Project(v) => json!({ "project": v }),
      ActivityType::Service(v) => json!({ "service": v }),
      ActivityType::GenericActivity(v) => json!({ "genericActivity": v }),
      ActivityType::Weekend => json!({ "weekend": null }),
      ActivityType::Workshops => json!({ "workshops": null }),
      ActivityType::Unknown(tag) => {
        let mut map = Map::new();
        map.insert(tag, Value::Null);
        Value::Object(map)
      }
    }
  }
}

fn activity_from_object(map: Map<String, Value>) -> ActivityType {
  let mut entries = map.into_iter();
  match (entries.next(), entries.next()) {
    (Some((tag, payload)), None) => activity_from_tag(tag, payload),
    _ => {
      tracing::warn!("activity payload must carry exactly one tag");
      ActivityType::Unknown(String::new())
    }
  }
}

fn activity_from_tag(tag: String, payload: Value) -> ActivityType {
  let text = || payload.as_str().unwrap_or_default().to_string();
  match tag.as_str() {
    "project" => ActivityType::Project(text()),
    "service" => ActivityType::Service(text()),
    "genericActivity" => ActivityType::GenericActivity(text()),
    "weekend" => ActivityType::Weekend,
    "workshops" => ActivityType::Workshops,
    _ => {
      tracing::warn!(%tag, "unknown activity tag");
      ActivityType::Unknown(tag)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reply_envelope() {
    let ok: RpcReply = serde_json::from_value(json!({"Ok": [1, 2]})).unwrap();
    assert!(matches!(ok, RpcReply::Ok(Value::Array(ref v)) if v.len() == 2));

    let err: RpcReply = serde_json::from_value(json!({"Err": "Invite code already used"})).unwrap();
    assert!(matches!(err, RpcReply::Err(ref m) if m.contains("already used")));
  }

  #[test]
  fn test_activity_from_tagged_object() {
    assert_eq!(
      ActivityType::from(json!({"genericActivity": "Inventory"})),
      ActivityType::GenericActivity("Inventory".to_string())
    );
    assert_eq!(ActivityType::from(json!({"weekend": null})), ActivityType::Weekend);
    assert_eq!(ActivityType::from(json!("workshops")), ActivityType::Workshops);
  }

  #[test]
  fn test_unknown_activity_tag_is_flagged_not_fatal() {
    assert_eq!(
      ActivityType::from(json!({"training": "Rust"})),
      ActivityType::Unknown("training".to_string())
    );
    assert!(matches!(
      ActivityType::from(json!(42)),
      ActivityType::Unknown(_)
    ));
  }

  #[test]
  fn test_activity_wire_shape() {
    assert_eq!(
      Value::from(ActivityType::Project("Apollo".to_string())),
      json!({"project": "Apollo"})
    );
    assert_eq!(Value::from(ActivityType::Weekend), json!({"weekend": null}));
  }
}
