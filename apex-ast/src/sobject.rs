use serde::{Deserialize, Serialize};

/// SObject description extracted from `<Name>.object-meta.xml` and the
/// `fields/*.field-meta.xml` files beside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectMetadata {
    pub api_name: String,
    pub label: Option<String>,
    pub plural_label: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<SObjectFieldMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectFieldMetadata {
    pub api_name: String,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub description: Option<String>,
}
