use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::Value;

use crate::resources::{ColumnSpec, FieldKind};

/// One backend entity instance as shown in a list. The payload is kept
/// opaque; only the id is lifted out because every list operation needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: serde_json::Map<String, Value>,
}

impl Record {
    /// Build a record from one element of a list response. Objects without
    /// an `id` are dropped by the caller, they cannot be selected or edited.
    pub fn from_value(value: Value) -> Option<Self> {
        let fields = match value {
            Value::Object(map) => map,
            _ => return None,
        };
        let id = match fields.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };
        Some(Record { id, fields })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Render a field for display. Nested objects show their label-ish
    /// member ("name", "title" or "label"), the way the backend nests
    /// category/role references into list payloads.
    pub fn display(&self, key: &str) -> String {
        match self.fields.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Object(map)) => ["name", "title", "label"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .unwrap_or("…")
                .to_string(),
            Some(Value::Array(items)) => format!("[{}]", items.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Ephemeral per-screen list state: never persisted, rebuilt on navigation.
#[derive(Debug, Clone)]
pub struct ListViewState {
    pub search_term: String,
    pub sort_key: Option<String>,
    pub sort_direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
    pub selected: HashSet<String>,
}

impl ListViewState {
    pub fn new(page_size: usize) -> Self {
        ListViewState {
            search_term: String::new(),
            sort_key: None,
            sort_direction: SortDirection::Ascending,
            page: 1,
            page_size: page_size.max(1),
            selected: HashSet::new(),
        }
    }

    /// Flip membership of one id in the selection.
    pub fn toggle_one(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Select-all checkbox semantics, scoped to the visible page: if every
    /// given id is already selected, clear exactly those; otherwise add all
    /// of them. Ids selected on other pages are untouched either way.
    pub fn toggle_all(&mut self, current_page_ids: &[String]) {
        if current_page_ids.is_empty() {
            return;
        }
        let all_selected = current_page_ids.iter().all(|id| self.selected.contains(id));
        if all_selected {
            for id in current_page_ids {
                self.selected.remove(id);
            }
        } else {
            for id in current_page_ids {
                self.selected.insert(id.clone());
            }
        }
    }
}

#[derive(Debug)]
pub struct PageView<'a> {
    pub page_records: Vec<&'a Record>,
    pub total_pages: usize,
    /// Page after clamping into `[1, max(total_pages, 1)]`.
    pub page: usize,
    /// Size of the filtered set before pagination.
    pub filtered_len: usize,
}

impl PageView<'_> {
    pub fn page_ids(&self) -> Vec<String> {
        self.page_records.iter().map(|r| r.id.clone()).collect()
    }
}

/// Derive the visible page from the full record set and the list state.
/// Pure function: filter, stable sort, slice. Out of range pages clamp
/// instead of panicking; an empty filtered set reports zero pages.
pub fn page_of<'a>(
    records: &'a [Record],
    state: &ListViewState,
    columns: &[ColumnSpec],
) -> PageView<'a> {
    let mut filtered: Vec<&Record> = records
        .iter()
        .filter(|r| matches_search(r, &state.search_term, columns))
        .collect();

    if let Some(key) = &state.sort_key {
        let kind = columns
            .iter()
            .find(|c| c.key == key.as_str())
            .map(|c| c.kind)
            .unwrap_or(FieldKind::Text);
        // Vec::sort_by is stable, ties keep their fetch order.
        filtered.sort_by(|a, b| {
            let ord = compare_field(a, b, key, kind);
            match state.sort_direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }

    let filtered_len = filtered.len();
    let total_pages = filtered_len.div_ceil(state.page_size);
    let page = state.page.clamp(1, total_pages.max(1));

    let begin = (page - 1) * state.page_size;
    let end = (begin + state.page_size).min(filtered_len);
    let page_records = if begin < filtered_len {
        filtered[begin..end].to_vec()
    } else {
        Vec::new()
    };

    PageView {
        page_records,
        total_pages,
        page,
        filtered_len,
    }
}

fn matches_search(record: &Record, term: &str, columns: &[ColumnSpec]) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    columns
        .iter()
        .filter(|c| c.searchable)
        .any(|c| record.display(c.key).to_lowercase().contains(&needle))
}

fn compare_field(a: &Record, b: &Record, key: &str, kind: FieldKind) -> Ordering {
    let va = a.display(key);
    let vb = b.display(key);
    match kind {
        FieldKind::Text => va.to_lowercase().cmp(&vb.to_lowercase()),
        FieldKind::Number => compare_numeric(&va, &vb),
        FieldKind::Date => compare_date(&va, &vb),
    }
}

// Values that fail to parse sort after the ones that do, falling back to a
// plain string compare when neither side parses.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn compare_date(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.date_naive())
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
    };
    match (parse(a), parse(b)) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("name", "Name", FieldKind::Text).searchable(),
            ColumnSpec::new("price", "Price", FieldKind::Number),
            ColumnSpec::new("created_at", "Created", FieldKind::Date),
        ]
    }

    fn record(id: u64, name: &str, price: f64, created: &str) -> Record {
        Record::from_value(json!({
            "id": id,
            "name": name,
            "price": price,
            "created_at": created,
        }))
        .unwrap()
    }

    fn state(page_size: usize) -> ListViewState {
        ListViewState::new(page_size)
    }

    #[test]
    fn record_needs_an_id() {
        assert!(Record::from_value(json!({"name": "x"})).is_none());
        assert!(Record::from_value(json!("bare string")).is_none());
        let r = Record::from_value(json!({"id": "abc", "name": "x"})).unwrap();
        assert_eq!(r.id(), "abc");
    }

    #[test]
    fn nested_labels_render() {
        let r = Record::from_value(json!({
            "id": 1,
            "category": {"name": "Vaccines"},
            "tags": ["a", "b"],
        }))
        .unwrap();
        assert_eq!(r.display("category"), "Vaccines");
        assert_eq!(r.display("tags"), "[2]");
        assert_eq!(r.display("missing"), "");
    }

    #[test]
    fn empty_search_matches_all() {
        let records = vec![record(1, "Flea Comb", 3.5, "2024-01-01")];
        let view = page_of(&records, &state(10), &columns());
        assert_eq!(view.page_records.len(), 1);
        assert_eq!(view.total_pages, 1);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let records = vec![
            record(1, "Flea Comb", 3.5, "2024-01-01"),
            record(2, "Dog Leash", 9.0, "2024-01-02"),
            record(3, "flea shampoo", 7.0, "2024-01-03"),
        ];
        let mut s = state(10);
        s.search_term = "FLEA".into();
        let view = page_of(&records, &s, &columns());
        let ids: Vec<_> = view.page_records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn unsearchable_columns_are_ignored() {
        // price is not flagged searchable
        let records = vec![record(1, "Comb", 42.0, "2024-01-01")];
        let mut s = state(10);
        s.search_term = "42".into();
        let view = page_of(&records, &s, &columns());
        assert!(view.page_records.is_empty());
        assert_eq!(view.total_pages, 0);
    }

    #[test]
    fn sort_ascending_is_idempotent() {
        let records = vec![
            record(1, "b", 2.0, "2024-01-02"),
            record(2, "a", 1.0, "2024-01-01"),
            record(3, "c", 3.0, "2024-01-03"),
        ];
        let mut s = state(10);
        s.sort_key = Some("name".into());
        let first: Vec<String> = page_of(&records, &s, &columns())
            .page_records
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        // Re-sorting the already sorted order must not move anything.
        let sorted: Vec<Record> = {
            let view = page_of(&records, &s, &columns());
            view.page_records.into_iter().cloned().collect()
        };
        let second: Vec<String> = page_of(&sorted, &s, &columns())
            .page_records
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(first, vec!["2", "1", "3"]);
        assert_eq!(first, second);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let records = vec![
            record(1, "same", 1.0, "2024-01-01"),
            record(2, "same", 2.0, "2024-01-01"),
            record(3, "same", 3.0, "2024-01-01"),
        ];
        let mut s = state(10);
        s.sort_key = Some("name".into());
        let ids: Vec<_> = page_of(&records, &s, &columns())
            .page_records
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        s.sort_direction = SortDirection::Descending;
        let ids: Vec<_> = page_of(&records, &s, &columns())
            .page_records
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn numeric_sort_parses_values() {
        let records = vec![
            record(1, "a", 10.0, "2024-01-01"),
            record(2, "b", 2.0, "2024-01-01"),
            record(3, "c", 33.5, "2024-01-01"),
        ];
        let mut s = state(10);
        s.sort_key = Some("price".into());
        let ids: Vec<_> = page_of(&records, &s, &columns())
            .page_records
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn date_sort_descending() {
        let records = vec![
            record(1, "a", 1.0, "2024-03-01"),
            record(2, "b", 1.0, "2023-12-24"),
            record(3, "c", 1.0, "2024-01-15"),
        ];
        let mut s = state(10);
        s.sort_key = Some("created_at".into());
        s.sort_direction = SortDirection::Descending;
        let ids: Vec<_> = page_of(&records, &s, &columns())
            .page_records
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
    }

    #[test]
    fn pagination_42_records_pages_of_15() {
        let records: Vec<Record> = (1..=42)
            .map(|i| record(i, &format!("item {i}"), i as f64, "2024-01-01"))
            .collect();
        let mut s = state(15);
        s.page = 3;
        let view = page_of(&records, &s, &columns());
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.page_records.len(), 12);
    }

    #[test]
    fn page_beyond_total_pages_clamps() {
        let records: Vec<Record> = (1..=5)
            .map(|i| record(i, "x", 1.0, "2024-01-01"))
            .collect();
        let mut s = state(15);
        s.page = 99;
        let view = page_of(&records, &s, &columns());
        assert_eq!(view.page, 1);
        assert_eq!(view.page_records.len(), 5);
    }

    #[test]
    fn empty_filtered_set_has_zero_pages() {
        let records = vec![record(1, "only", 1.0, "2024-01-01")];
        let mut s = state(15);
        s.search_term = "no such thing".into();
        s.page = 4;
        let view = page_of(&records, &s, &columns());
        assert_eq!(view.total_pages, 0);
        assert!(view.page_records.is_empty());
    }

    #[test]
    fn toggle_one_flips_membership() {
        let mut s = state(10);
        s.toggle_one("7");
        assert!(s.selected.contains("7"));
        s.toggle_one("7");
        assert!(!s.selected.contains("7"));
    }

    #[test]
    fn toggle_all_is_page_scoped() {
        let mut s = state(10);
        s.toggle_one("other-page");
        let page: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
        s.toggle_all(&page);
        assert_eq!(s.selected.len(), 4);
        // All of the page selected, a second toggle clears exactly the page.
        s.toggle_all(&page);
        assert_eq!(s.selected.len(), 1);
        assert!(s.selected.contains("other-page"));
    }

    #[test]
    fn toggle_all_completes_a_partial_page() {
        let mut s = state(10);
        s.toggle_one("2");
        let page: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
        s.toggle_all(&page);
        assert_eq!(s.selected.len(), 3);
    }

    #[test]
    fn selection_survives_search_changes() {
        let records = vec![
            record(1, "Flea Comb", 3.5, "2024-01-01"),
            record(2, "Dog Leash", 9.0, "2024-01-02"),
        ];
        let mut s = state(10);
        s.toggle_one("2");
        s.search_term = "flea".into();
        let view = page_of(&records, &s, &columns());
        assert_eq!(view.page_records.len(), 1);
        // Quirk preserved from the original UI: filtering does not prune
        // the selection.
        assert!(s.selected.contains("2"));
    }

    proptest! {
        #[test]
        fn filtered_records_all_match_and_none_missing(
            names in proptest::collection::vec("[a-zA-Z ]{0,12}", 0..40),
            term in "[a-zA-Z]{0,4}",
        ) {
            let records: Vec<Record> = names
                .iter()
                .enumerate()
                .map(|(i, n)| record(i as u64 + 1, n, 1.0, "2024-01-01"))
                .collect();
            let mut s = state(1_000);
            s.search_term = term.clone();
            let view = page_of(&records, &s, &columns());
            let needle = term.to_lowercase();
            let matching = records
                .iter()
                .filter(|r| r.display("name").to_lowercase().contains(&needle))
                .count();
            prop_assert_eq!(view.filtered_len, matching);
            for r in &view.page_records {
                prop_assert!(r.display("name").to_lowercase().contains(&needle));
            }
        }
    }
}
