//! Static description of every back-office screen: which REST resource it
//! lists, which columns it shows, and how the sidebar groups them.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub searchable: bool,
    pub required: bool,
}

impl ColumnSpec {
    pub fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        ColumnSpec {
            key,
            label,
            kind,
            searchable: false,
            required: false,
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug)]
pub struct Resource {
    /// Stable key, also used in the session capability map.
    pub key: &'static str,
    pub title: &'static str,
    /// Path segment under `/api/`.
    pub path: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub csv_import: bool,
    pub image_upload: bool,
}

#[derive(Debug)]
pub struct MenuSection {
    pub title: &'static str,
    pub resources: Vec<Resource>,
}

use FieldKind::{Date, Number, Text};

/// The sidebar tree. Order here is presentation order.
pub fn menu() -> Vec<MenuSection> {
    vec![
        MenuSection {
            title: "Catalog",
            resources: vec![
                Resource {
                    key: "products",
                    title: "Products",
                    path: "products",
                    columns: vec![
                        ColumnSpec::new("name", "Name", Text).searchable().required(),
                        ColumnSpec::new("sku", "SKU", Text).searchable().required(),
                        ColumnSpec::new("category", "Category", Text).searchable(),
                        ColumnSpec::new("price", "Price", Number).required(),
                        ColumnSpec::new("created_at", "Created", Date),
                    ],
                    csv_import: true,
                    image_upload: true,
                },
                Resource {
                    key: "inventory",
                    title: "Inventory",
                    path: "inventory",
                    columns: vec![
                        ColumnSpec::new("product", "Product", Text).searchable(),
                        ColumnSpec::new("batch", "Batch", Text).searchable().required(),
                        ColumnSpec::new("quantity", "Qty", Number).required(),
                        ColumnSpec::new("expires_at", "Expires", Date),
                    ],
                    csv_import: true,
                    image_upload: false,
                },
            ],
        },
        MenuSection {
            title: "Sales",
            resources: vec![
                Resource {
                    key: "orders",
                    title: "Orders",
                    path: "orders",
                    columns: vec![
                        ColumnSpec::new("number", "Order #", Text).searchable().required(),
                        ColumnSpec::new("customer", "Customer", Text).searchable(),
                        ColumnSpec::new("total", "Total", Number),
                        ColumnSpec::new("status", "Status", Text).searchable(),
                        ColumnSpec::new("created_at", "Placed", Date),
                    ],
                    csv_import: false,
                    image_upload: false,
                },
            ],
        },
        MenuSection {
            title: "People",
            resources: vec![
                Resource {
                    key: "users",
                    title: "Users",
                    path: "users",
                    columns: vec![
                        ColumnSpec::new("name", "Name", Text).searchable().required(),
                        ColumnSpec::new("email", "Email", Text).searchable().required(),
                        ColumnSpec::new("role", "Role", Text).searchable(),
                        ColumnSpec::new("created_at", "Joined", Date),
                    ],
                    csv_import: false,
                    image_upload: false,
                },
                Resource {
                    key: "roles",
                    title: "Roles",
                    path: "roles",
                    columns: vec![
                        ColumnSpec::new("name", "Name", Text).searchable().required(),
                        ColumnSpec::new("description", "Description", Text).searchable(),
                    ],
                    csv_import: false,
                    image_upload: false,
                },
            ],
        },
        MenuSection {
            title: "Content",
            resources: vec![
                Resource {
                    key: "notifications",
                    title: "Notifications",
                    path: "notifications",
                    columns: vec![
                        ColumnSpec::new("title", "Title", Text).searchable().required(),
                        ColumnSpec::new("body", "Body", Text).searchable(),
                        ColumnSpec::new("created_at", "Sent", Date),
                    ],
                    csv_import: false,
                    image_upload: false,
                },
                Resource {
                    key: "certificates",
                    title: "Certificates",
                    path: "certificates",
                    columns: vec![
                        ColumnSpec::new("name", "Name", Text).searchable().required(),
                        ColumnSpec::new("holder", "Holder", Text).searchable(),
                        ColumnSpec::new("issued_at", "Issued", Date),
                    ],
                    csv_import: false,
                    image_upload: true,
                },
                Resource {
                    key: "quizzes",
                    title: "Quizzes",
                    path: "quizzes",
                    columns: vec![
                        ColumnSpec::new("title", "Title", Text).searchable().required(),
                        ColumnSpec::new("questions", "Questions", Number),
                        ColumnSpec::new("created_at", "Created", Date),
                    ],
                    csv_import: true,
                    image_upload: false,
                },
                Resource {
                    key: "content",
                    title: "Site content",
                    path: "content",
                    columns: vec![
                        ColumnSpec::new("slot", "Slot", Text).searchable().required(),
                        ColumnSpec::new("text", "Text", Text).searchable().required(),
                        ColumnSpec::new("updated_at", "Updated", Date),
                    ],
                    csv_import: false,
                    image_upload: false,
                },
            ],
        },
    ]
}

/// Flat list of resources in sidebar order.
pub fn all() -> Vec<Resource> {
    menu().into_iter().flat_map(|s| s.resources).collect()
}

pub fn is_known_key(key: &str) -> bool {
    all().iter().any(|r| r.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_has_a_searchable_column() {
        for r in all() {
            assert!(
                r.columns.iter().any(|c| c.searchable),
                "{} has no searchable column",
                r.key
            );
        }
    }

    #[test]
    fn keys_are_unique() {
        let resources = all();
        for (i, a) in resources.iter().enumerate() {
            for b in &resources[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn known_keys() {
        assert!(is_known_key("products"));
        assert!(!is_known_key("warehouses"));
    }
}
