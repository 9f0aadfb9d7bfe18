// On-disk index payloads, one JSON file per indexed type under
// `<workspaceRoot>/.apex-lsp/{apex,sobjects}/`.

use serde::{Deserialize, Serialize};

use crate::mirror::TypeMirror;
use crate::sobject::SObjectMetadata;

pub const SCHEMA_VERSION: u32 = 1;

fn schema_version_default() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApexIndexEntry {
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,
    pub class_name: String,
    pub source: SourceInfo,
    pub type_mirror: TypeMirror,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub uri: String,
    /// Source path with the workspace root prefix stripped.
    pub relative_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectIndexEntry {
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,
    pub object_api_name: String,
    pub source: SObjectSource,
    pub object_metadata: SObjectMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectSource {
    pub object_meta_uri: String,
    pub relative_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::{EnumMirror, TypeMirror};
    use crate::visibility::ByteRange;

    #[test]
    fn test_apex_payload_field_names() {
        let entry = ApexIndexEntry {
            schema_version: SCHEMA_VERSION,
            class_name: "Color".to_string(),
            source: SourceInfo {
                uri: "file:///ws/force-app/main/default/classes/Color.cls".to_string(),
                relative_path: "force-app/main/default/classes/Color.cls".to_string(),
            },
            type_mirror: TypeMirror::Enum(EnumMirror {
                name: "Color".to_string(),
                modifiers: vec!["public".to_string()],
                range: ByteRange::new(0, 10),
                values: vec!["RED".to_string()],
            }),
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["className"], "Color");
        assert!(json["source"]["relativePath"].is_string());
        assert!(json["typeMirror"].is_object());
    }
}
