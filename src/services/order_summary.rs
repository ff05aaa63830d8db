//! Delivery and bundle summary for a raw platform order.
//!
//! Works on `serde_json::Value` rather than typed structs so that a missing or
//! oddly-typed field degrades to an empty output instead of failing the whole
//! summary.

use serde::Serialize;
use serde_json::Value;

const DELIVERY_DATE_ATTRIBUTE: &str = "__deliveryDate";
const FIRST_ORDER_TAG: &str = "Subscription First Order";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub delivery_date: Option<String>,
    pub pack_size: String,
    pub dog_label: String,
    pub items: Vec<BundleItem>,
    pub order_name: Option<String>,
    pub order_id: Option<Value>,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleItem {
    pub name: Option<String>,
    pub sku: String,
    pub bundle_size: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderType {
    #[serde(rename = "First Order")]
    FirstOrder,
    #[serde(rename = "Recurring Order")]
    RecurringOrder,
}

/// Summarize an order object (the value under `"order"` in the REST payload).
pub fn summarize(order: &Value) -> OrderSummary {
    let items: Vec<BundleItem> = order
        .get("line_items")
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(bundle_item).collect())
        .unwrap_or_default();

    let pack_size = items
        .iter()
        .map(|item| item.bundle_size.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" + ");

    OrderSummary {
        delivery_date: delivery_date(order),
        pack_size,
        dog_label: dog_label(items.len()),
        items,
        order_name: order.get("name").and_then(Value::as_str).map(str::to_string),
        order_id: order.get("id").filter(|id| !id.is_null()).cloned(),
        order_type: order_type(order),
    }
}

fn delivery_date(order: &Value) -> Option<String> {
    order
        .get("note_attributes")?
        .as_array()?
        .iter()
        .find(|attr| attr.get("name").and_then(Value::as_str) == Some(DELIVERY_DATE_ATTRIBUTE))?
        .get("value")
        .and_then(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
}

/// Line items whose SKU carries both bundle markers (`w` and `g`, any case)
fn bundle_item(line: &Value) -> Option<BundleItem> {
    let sku = line.get("sku").and_then(Value::as_str)?;
    let lowered = sku.to_lowercase();
    if !(lowered.contains('w') && lowered.contains('g')) {
        return None;
    }

    let text = |key: &str| line.get(key).and_then(Value::as_str).map(str::to_string);
    Some(BundleItem {
        name: text("name"),
        sku: sku.to_string(),
        bundle_size: bundle_size(sku),
        title: text("title"),
    })
}

/// Grams per pack encoded after the first uppercase `W`, e.g. `ABC-W30G` -> `30`
fn bundle_size(sku: &str) -> Option<String> {
    let segment = sku.split('W').nth(1)?;
    Some(segment.to_lowercase().replacen('g', "", 1))
}

fn dog_label(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => "1 Dog".to_string(),
        n => format!("{} Dogs", n),
    }
}

fn order_type(order: &Value) -> OrderType {
    let first = match order.get("tags") {
        Some(Value::String(tags)) => tags.contains(FIRST_ORDER_TAG),
        Some(Value::Array(tags)) => tags
            .iter()
            .filter_map(Value::as_str)
            .any(|tag| tag.trim() == FIRST_ORDER_TAG),
        _ => false,
    };
    if first {
        OrderType::FirstOrder
    } else {
        OrderType::RecurringOrder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn two_bundles_make_two_dogs() {
        let order = json!({
            "id": 4424521646137u64,
            "name": "#1001",
            "line_items": [
                { "sku": "ABC-W30G", "name": "Chicken", "title": "Chicken Pack" },
                { "sku": "XYZ-W30G", "name": "Beef", "title": "Beef Pack" },
                { "sku": "TREATS-1", "name": "Treats", "title": "Treats" }
            ]
        });

        let summary = summarize(&order);
        assert_eq!(summary.dog_label, "2 Dogs");
        assert_eq!(summary.pack_size, "30 + 30");
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.items[0].bundle_size.as_deref(), Some("30"));
        assert_eq!(summary.order_name.as_deref(), Some("#1001"));
        assert_eq!(summary.order_id, Some(json!(4424521646137u64)));
    }

    #[test]
    fn single_bundle() {
        let order = json!({ "line_items": [{ "sku": "DOG-W120G" }] });
        let summary = summarize(&order);
        assert_eq!(summary.dog_label, "1 Dog");
        assert_eq!(summary.pack_size, "120");
    }

    #[test]
    fn no_matching_skus() {
        let order = json!({ "line_items": [{ "sku": "TREATS-1" }, { "sku": "BOWL" }] });
        let summary = summarize(&order);
        assert!(summary.items.is_empty());
        assert_eq!(summary.dog_label, "");
        assert_eq!(summary.pack_size, "");
    }

    #[test]
    fn lowercase_marker_matches_but_has_no_size() {
        let order = json!({ "line_items": [{ "sku": "abc-w30g" }] });
        let summary = summarize(&order);
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].bundle_size, None);
        assert_eq!(summary.pack_size, "");
    }

    #[test]
    fn delivery_date_from_note_attributes() {
        let order = json!({
            "note_attributes": [
                { "name": "gift", "value": "no" },
                { "name": "__deliveryDate", "value": "2023-03-14" }
            ]
        });
        assert_eq!(summarize(&order).delivery_date.as_deref(), Some("2023-03-14"));
    }

    #[test]
    fn first_order_tag_in_string_or_array() {
        let tagged = json!({ "tags": "Subscription, Subscription First Order" });
        assert_eq!(summarize(&tagged).order_type, OrderType::FirstOrder);

        let array = json!({ "tags": ["Subscription First Order"] });
        assert_eq!(summarize(&array).order_type, OrderType::FirstOrder);

        let recurring = json!({ "tags": "Subscription Recurring Order" });
        assert_eq!(summarize(&recurring).order_type, OrderType::RecurringOrder);
    }

    #[test]
    fn malformed_order_degrades_to_empty_summary() {
        let summary = summarize(&json!({
            "line_items": "nope",
            "note_attributes": 7,
            "tags": null,
            "name": 12,
            "id": null
        }));
        assert!(summary.items.is_empty());
        assert_eq!(summary.delivery_date, None);
        assert_eq!(summary.order_name, None);
        assert_eq!(summary.order_id, None);
        assert_eq!(summary.order_type, OrderType::RecurringOrder);

        let summary = summarize(&json!({ "line_items": [{ "name": "no sku" }, { "sku": 5 }] }));
        assert!(summary.items.is_empty());

        assert_eq!(summarize(&Value::Null).dog_label, "");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(summarize(&json!({ "tags": "Subscription First Order" }))).unwrap();
        assert_eq!(value["orderType"], "First Order");
        assert!(value.get("dogLabel").is_some());
        assert!(value.get("packSize").is_some());
        assert!(value.get("deliveryDate").is_some());
    }
}
