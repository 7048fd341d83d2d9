use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// A single inventory record as persisted in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// File name inside the uploads directory.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(id: String, name: String, description: String, photo: Option<String>) -> Self {
        Self {
            id,
            name,
            description,
            photo,
            created_at: now(),
            updated_at: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(now());
    }
}

/// Current time at the precision timestamps are persisted with, so a
/// returned item compares equal to the same item read back from disk.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// The whole persisted document: `{ "items": [...] }`, insertion ordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    pub items: Vec<Item>,
}

impl Collection {
    pub fn find(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|it| it.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|it| it.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn remove(&mut self, id: &str) -> Option<Item> {
        let idx = self.items.iter().position(|it| it.id == id)?;
        Some(self.items.remove(idx))
    }
}

// ── Response projection ───────────────────────────────────────────────────────

/// Item as returned by read endpoints, with a derived `photo_url`.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub photo_url: Option<String>,
}

impl ItemView {
    /// `origin` is `scheme://host`; pass `None` to suppress the URL.
    pub fn project(item: Item, origin: Option<&str>) -> Self {
        let photo_url = match (origin, item.photo.as_ref()) {
            (Some(origin), Some(_)) => Some(format!("{}/inventory/{}/photo", origin, item.id)),
            _ => None,
        };
        Self { item, photo_url }
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Partial update. A field that is absent stays untouched; an empty string
/// is still applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Text fields of a registration form.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterFields {
    pub inventory_name: Option<String>,
    pub description: Option<String>,
}

/// Query string of `GET /search`. Keys may repeat, so every value is kept.
#[derive(Debug, Default)]
pub struct SearchQuery {
    pub id: Vec<String>,
    pub include_photo: Vec<String>,
}

/// What a query `id` asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum QueryId<'a> {
    Missing,
    One(&'a str),
    /// Repeated key; never equal to a stored id.
    Many,
}

impl SearchQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "id" => query.id.push(value),
                "includePhoto" => query.include_photo.push(value),
                _ => {}
            }
        }
        query
    }

    pub fn id(&self) -> QueryId<'_> {
        match self.id.as_slice() {
            [] => QueryId::Missing,
            [one] if one.is_empty() => QueryId::Missing,
            [one] => QueryId::One(one),
            _ => QueryId::Many,
        }
    }

    /// Any non-empty value is truthy, `false` and `0` included.
    pub fn wants_photo(&self) -> bool {
        match self.include_photo.as_slice() {
            [] => false,
            [one] => !one.is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    pub id: Option<serde_json::Value>,
    pub has_photo: Option<serde_json::Value>,
}

impl SearchBody {
    pub fn wants_photo(&self) -> bool {
        self.has_photo.as_ref().is_some_and(is_truthy)
    }
}

/// JSON truthiness: `false`, `0`, `""` and `null` are falsy.
pub fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget() -> Item {
        Item::new("1_1".into(), "Widget".into(), String::new(), None)
    }

    #[test]
    fn serializes_with_camel_case_and_null_photo() {
        let value = serde_json::to_value(widget()).unwrap();
        assert_eq!(value["name"], "Widget");
        assert_eq!(value["description"], "");
        assert!(value["photo"].is_null());
        assert!(value["createdAt"].is_string());
        assert!(value.get("updatedAt").is_none(), "updatedAt absent until first update");
    }

    #[test]
    fn timestamps_survive_a_round_trip() {
        let item = widget();
        let back: Item = serde_json::from_value(serde_json::to_value(&item).unwrap()).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn updated_at_appears_after_touch() {
        let mut item = widget();
        item.touch();
        let value = serde_json::to_value(&item).unwrap();
        assert!(value["updatedAt"].is_string());
    }

    #[test]
    fn reads_document_written_by_older_versions() {
        let doc = json!({
            "items": [{
                "id": "1712345678901_42",
                "name": "Lamp",
                "photo": null,
                "createdAt": "2024-04-05T19:34:38.901Z"
            }]
        });
        let coll: Collection = serde_json::from_value(doc).unwrap();
        assert_eq!(coll.items.len(), 1);
        assert_eq!(coll.items[0].description, "");
        assert!(coll.items[0].updated_at.is_none());
    }

    #[test]
    fn collection_remove_preserves_order() {
        let mut coll = Collection::default();
        for id in ["a", "b", "c"] {
            coll.items.push(Item::new(id.into(), id.into(), String::new(), None));
        }
        let removed = coll.remove("b").unwrap();
        assert_eq!(removed.id, "b");
        let ids: Vec<&str> = coll.items.iter().map(|it| it.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(coll.remove("b").is_none());
    }

    // ── Projection ────────────────────────────────────────────────────────────

    #[test]
    fn projection_without_photo_has_null_url() {
        let view = ItemView::project(widget(), Some("http://localhost:3000"));
        let value = serde_json::to_value(view).unwrap();
        assert!(value["photo_url"].is_null());
        assert_eq!(value["id"], "1_1");
    }

    #[test]
    fn projection_with_photo_builds_url() {
        let mut item = widget();
        item.photo = Some("1-abc-cat.jpg".into());
        let view = ItemView::project(item, Some("http://localhost:3000"));
        assert_eq!(
            view.photo_url.as_deref(),
            Some("http://localhost:3000/inventory/1_1/photo")
        );
    }

    #[test]
    fn projection_suppressed_without_origin() {
        let mut item = widget();
        item.photo = Some("x.jpg".into());
        assert!(ItemView::project(item, None).photo_url.is_none());
    }

    // ── Flags ─────────────────────────────────────────────────────────────────

    #[test]
    fn update_distinguishes_absent_from_empty() {
        let update: UpdateItem = serde_json::from_value(json!({ "description": "" })).unwrap();
        assert!(update.name.is_none());
        assert_eq!(update.description.as_deref(), Some(""));
    }

    #[test]
    fn query_flag_truthiness() {
        let q = |v: Option<&str>| SearchQuery {
            id: vec!["x".into()],
            include_photo: v.map(str::to_string).into_iter().collect(),
        };
        assert!(q(Some("true")).wants_photo());
        assert!(q(Some("1")).wants_photo());
        assert!(q(Some("false")).wants_photo());
        assert!(q(Some("0")).wants_photo());
        assert!(!q(Some("")).wants_photo());
        assert!(!q(None).wants_photo());
    }

    #[test]
    fn query_pairs_keep_repeated_keys() {
        let pairs = |raw: &[(&str, &str)]| {
            SearchQuery::from_pairs(
                raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            )
        };
        assert_eq!(pairs(&[]).id(), QueryId::Missing);
        assert_eq!(pairs(&[("id", "")]).id(), QueryId::Missing);
        assert_eq!(pairs(&[("id", "7_1"), ("other", "x")]).id(), QueryId::One("7_1"));
        assert_eq!(pairs(&[("id", "a"), ("id", "b")]).id(), QueryId::Many);

        let both_empty = pairs(&[("includePhoto", ""), ("includePhoto", "")]);
        assert!(both_empty.wants_photo());
    }

    #[test]
    fn json_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(null)));
    }
}
