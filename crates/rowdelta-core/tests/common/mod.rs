use rowdelta_core::{DiffRow, ExError, Record, RowStore, Schema, SidePair};
use serde_json::json;

/// Orders schema: key `id` (integer), values `name` (string) and `total` (money)
#[allow(dead_code)]
pub fn orders_schema() -> Schema {
    Schema::from_tags(
        &[("id", "integer")],
        &[("name", "string"), ("total", "money")],
    )
    .unwrap()
}

/// Build an order record
#[allow(dead_code)]
pub fn order(id: i64, name: &str, total: &str) -> Record {
    json!({ "id": id, "name": name, "total": total })
        .as_object()
        .cloned()
        .unwrap()
}

/// Record holding only the key field
#[allow(dead_code)]
pub fn key_only(id: i64) -> Record {
    json!({ "id": id }).as_object().cloned().unwrap()
}

/// Collect canonical keys from a classification stream, panicking on errors
#[allow(dead_code)]
pub fn keys<I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = Result<DiffRow, ExError>>,
{
    rows.into_iter()
        .map(|r| r.unwrap().canonical_key().to_string())
        .collect()
}

/// Load the reference scenario:
/// A holds ids 1..=500 (id 50 has total 60.00), B holds ids 1..=499 and 501.
#[allow(dead_code)]
pub fn load_scenario<S: RowStore>(pair: &mut SidePair<S>) {
    let mut a = pair.a_mut();
    for id in 1..=500 {
        let total = if id == 50 { "60.00" } else { "59.99" };
        a.add_row(&order(id, &format!("order {id}"), total)).unwrap();
    }

    let mut b = pair.b_mut();
    for id in (1..=499).chain(std::iter::once(501)) {
        b.add_row(&order(id, &format!("order {id}"), "59.99")).unwrap();
    }
}
