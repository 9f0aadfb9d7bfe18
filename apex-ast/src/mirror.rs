// Parse mirrors: the serializable shape of one parsed Apex source file.
// The workspace indexer persists these verbatim; both indexers lower them
// into declarations (see lower.rs).

use serde::{Deserialize, Serialize};

use crate::visibility::ByteRange;

/// One top-level type as the parser saw it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeMirror {
    Class(ClassMirror),
    Enum(EnumMirror),
    Interface(InterfaceMirror),
}

impl TypeMirror {
    pub fn name(&self) -> &str {
        match self {
            TypeMirror::Class(c) => &c.name,
            TypeMirror::Enum(e) => &e.name,
            TypeMirror::Interface(i) => &i.name,
        }
    }

    pub fn modifiers(&self) -> &[String] {
        match self {
            TypeMirror::Class(c) => &c.modifiers,
            TypeMirror::Enum(e) => &e.modifiers,
            TypeMirror::Interface(i) => &i.modifiers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMirror {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    pub range: ByteRange,
    #[serde(default)]
    pub inner_types: Vec<TypeMirror>,
    #[serde(default)]
    pub fields: Vec<FieldMirror>,
    #[serde(default)]
    pub properties: Vec<PropertyMirror>,
    #[serde(default)]
    pub methods: Vec<MethodMirror>,
    #[serde(default)]
    pub constructors: Vec<ConstructorMirror>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumMirror {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub range: ByteRange,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceMirror {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub super_interface: Option<String>,
    pub range: ByteRange,
    #[serde(default)]
    pub methods: Vec<MethodMirror>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMirror {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterMirror>,
    pub range: ByteRange,
    pub body: Option<BlockMirror>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMirror {
    pub type_name: String,
    pub name: String,
    pub range: ByteRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMirror {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub type_name: Option<String>,
    pub range: ByteRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMirror {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub type_name: Option<String>,
    pub range: ByteRange,
    pub getter: Option<BlockMirror>,
    pub setter: Option<BlockMirror>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorMirror {
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterMirror>,
    pub range: ByteRange,
    pub body: Option<BlockMirror>,
}

/// A brace-delimited block. `range.end` is the byte offset of the closing
/// brace, which doubles as the scope end of every variable declared inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMirror {
    pub range: ByteRange,
    #[serde(default)]
    pub variables: Vec<LocalVariableMirror>,
    #[serde(default)]
    pub blocks: Vec<BlockMirror>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalVariableMirror {
    pub name: String,
    pub type_name: String,
    pub range: ByteRange,
}

/// Apex visibility check shared by both lowerings: only `public` and
/// `global` types and members are exposed outside their own file.
pub fn is_public_or_global(modifiers: &[String]) -> bool {
    modifiers
        .iter()
        .any(|m| m.eq_ignore_ascii_case("public") || m.eq_ignore_ascii_case("global"))
}

pub fn is_static(modifiers: &[String]) -> bool {
    modifiers.iter().any(|m| m.eq_ignore_ascii_case("static"))
}
