use super::common::{IdRef, NOT_ASSIGNED};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductRecord {
    /// `"{code} - {name} - {category}"`, as shown in product pickers
    pub fn full_description(&self) -> String {
        let category = self
            .category
            .as_ref()
            .map_or(NOT_ASSIGNED, |category| category.name.as_str());
        format!("{} - {} - {}", self.code, self.name, category)
    }
}

/// Product form with its category and unit selected as records
///
/// Serializes as [`ProductPayload`], which carries only the ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ProductPayload")]
pub struct ProductForm {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Option<IdRef>,
    pub unit: Option<IdRef>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPayload {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<i64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl From<ProductForm> for ProductPayload {
    fn from(form: ProductForm) -> Self {
        Self {
            code: form.code,
            name: form.name,
            description: form.description,
            category_id: form.category.map(|category| category.id),
            unit_id: form.unit.map(|unit| unit.id),
            fields: form.fields,
        }
    }
}

/// One row of a bulk product upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category_id: i64,
    pub unit_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One row of a bulk category upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPayload {
    pub name: String,
    pub symbol: String,
}

/// One row of a bulk unit upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRow {
    pub name: String,
    pub symbol: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_flattens_category_and_unit() {
        let form: ProductForm = serde_json::from_value(json!({
            "code": "P-001",
            "name": "Cement",
            "category": { "id": 3 },
            "unit": { "id": 7 },
            "min_stock": 10
        }))
        .unwrap();

        let body = serde_json::to_value(&form).unwrap();
        assert_eq!(body["category_id"], 3);
        assert_eq!(body["unit_id"], 7);
        assert_eq!(body["min_stock"], 10);
        assert!(body.get("category").is_none());
        assert!(body.get("unit").is_none());
    }

    #[test]
    fn test_full_description() {
        let product: ProductRecord = serde_json::from_value(json!({
            "id": 1,
            "code": "P-001",
            "name": "Cement",
            "category": { "id": 3, "name": "Building" }
        }))
        .unwrap();
        assert_eq!(product.full_description(), "P-001 - Cement - Building");

        let orphan = ProductRecord {
            category: None,
            ..product
        };
        assert_eq!(orphan.full_description(), "P-001 - Cement - Not assigned");
    }
}
