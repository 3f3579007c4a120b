//! Create/edit form state: one buffer per column, client-side validation
//! before the request goes out, and a lock that swallows double submits.

use serde_json::{Map, Value, json};

use crate::listview::Record;
use crate::resources::{FieldKind, Resource};

#[derive(Debug)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub value: String,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct FormState {
    pub resource: &'static str,
    /// `Some` when editing an existing record, `None` when creating.
    pub record_id: Option<String>,
    pub fields: Vec<FormField>,
    pub cursor: usize,
    pub submitting: bool,
    pub server_error: Option<String>,
}

impl FormState {
    pub fn create(resource: &Resource) -> Self {
        Self::build(resource, None)
    }

    pub fn edit(resource: &Resource, record: &Record) -> Self {
        let mut form = Self::build(resource, Some(record.id().to_string()));
        for field in &mut form.fields {
            field.value = record.display(field.key);
        }
        form
    }

    fn build(resource: &Resource, record_id: Option<String>) -> Self {
        let fields = resource
            .columns
            .iter()
            .map(|c| FormField {
                key: c.key,
                label: c.label,
                kind: c.kind,
                required: c.required,
                value: String::new(),
                error: None,
            })
            .collect();
        FormState {
            resource: resource.key,
            record_id,
            fields,
            cursor: 0,
            submitting: false,
            server_error: None,
        }
    }

    pub fn move_cursor(&mut self, down: bool) {
        if down {
            if self.cursor + 1 < self.fields.len() {
                self.cursor += 1;
            }
        } else {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    pub fn current_field(&self) -> &FormField {
        &self.fields[self.cursor]
    }

    pub fn set_current_value(&mut self, value: String) {
        let field = &mut self.fields[self.cursor];
        field.value = value;
        field.error = None;
        self.server_error = None;
    }

    /// Required/shape checks before anything touches the network. Errors
    /// land on the offending fields; returns whether the form is clean.
    pub fn validate(&mut self) -> bool {
        let mut ok = true;
        for field in &mut self.fields {
            field.error = None;
            let value = field.value.trim();
            if value.is_empty() {
                if field.required {
                    field.error = Some("required".to_string());
                    ok = false;
                }
                continue;
            }
            match field.kind {
                FieldKind::Text => {}
                FieldKind::Number => {
                    if value.parse::<f64>().is_err() {
                        field.error = Some("not a number".to_string());
                        ok = false;
                    }
                }
                FieldKind::Date => {
                    if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                        field.error = Some("expected YYYY-MM-DD".to_string());
                        ok = false;
                    }
                }
            }
        }
        ok
    }

    /// Flip the in-flight lock. Returns false when a submission is already
    /// running, which makes the second submit a no-op.
    pub fn begin_submit(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        self.server_error = None;
        true
    }

    /// A 4xx `{message}` from the server is shown on the form, the modal
    /// stays open for another attempt.
    pub fn submit_failed(&mut self, message: String) {
        self.submitting = false;
        self.server_error = Some(message);
    }

    /// JSON body for POST/PUT. Numbers go out as numbers, empty optional
    /// fields are omitted entirely.
    pub fn body(&self) -> Value {
        let mut map = Map::new();
        for field in &self.fields {
            let value = field.value.trim();
            if value.is_empty() {
                continue;
            }
            let v = match field.kind {
                FieldKind::Number => match value.parse::<f64>() {
                    Ok(n) => json!(n),
                    Err(_) => json!(value),
                },
                _ => json!(value),
            };
            map.insert(field.key.to_string(), v);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources;
    use serde_json::json;

    fn products() -> Resource {
        resources::all()
            .into_iter()
            .find(|r| r.key == "products")
            .unwrap()
    }

    fn filled_form() -> FormState {
        let resource = products();
        let mut form = FormState::create(&resource);
        for field in &mut form.fields {
            field.value = match field.kind {
                FieldKind::Number => "12.5".to_string(),
                FieldKind::Date => "2024-06-01".to_string(),
                FieldKind::Text => "something".to_string(),
            };
        }
        form
    }

    #[test]
    fn missing_required_field_fails_validation() {
        let mut form = filled_form();
        form.fields[0].value.clear(); // name is required
        assert!(!form.validate());
        assert_eq!(form.fields[0].error.as_deref(), Some("required"));
    }

    #[test]
    fn bad_number_fails_validation() {
        let mut form = filled_form();
        let price = form.fields.iter_mut().find(|f| f.key == "price").unwrap();
        price.value = "twelve".to_string();
        assert!(!form.validate());
    }

    #[test]
    fn bad_date_fails_validation() {
        let mut form = filled_form();
        let created = form
            .fields
            .iter_mut()
            .find(|f| f.key == "created_at")
            .unwrap();
        created.value = "01/06/2024".to_string();
        assert!(!form.validate());
    }

    #[test]
    fn empty_optional_field_is_fine_and_omitted() {
        let mut form = filled_form();
        let cat = form.fields.iter_mut().find(|f| f.key == "category").unwrap();
        cat.value.clear();
        assert!(form.validate());
        assert!(form.body().get("category").is_none());
    }

    #[test]
    fn body_keeps_numbers_numeric() {
        let mut form = filled_form();
        assert!(form.validate());
        let body = form.body();
        assert_eq!(body.get("price"), Some(&json!(12.5)));
        assert_eq!(body.get("name"), Some(&json!("something")));
    }

    #[test]
    fn double_submit_is_a_noop() {
        let mut form = filled_form();
        assert!(form.begin_submit());
        assert!(!form.begin_submit());
        form.submit_failed("sku already exists".to_string());
        assert!(!form.submitting);
        assert_eq!(form.server_error.as_deref(), Some("sku already exists"));
        assert!(form.begin_submit());
    }

    #[test]
    fn edit_prefills_from_the_record() {
        let resource = products();
        let record = Record::from_value(json!({
            "id": 9,
            "name": "Flea Comb",
            "sku": "FC-01",
            "price": 3.5,
        }))
        .unwrap();
        let form = FormState::edit(&resource, &record);
        assert_eq!(form.record_id.as_deref(), Some("9"));
        let name = form.fields.iter().find(|f| f.key == "name").unwrap();
        assert_eq!(name.value, "Flea Comb");
    }
}
