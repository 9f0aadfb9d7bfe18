use serde::{Deserialize, Serialize};

use crate::name::DeclarationName;
use crate::visibility::{ByteRange, Visibility};

/// An indexed program element, produced by the local or workspace indexer.
///
/// Classes own their nested members as a tree; super-class and
/// super-interface are references by name only and are resolved through the
/// index repository at query time, never by pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Declaration {
    Class(IndexedClass),
    Enum(IndexedEnum),
    Interface(IndexedInterface),
    SObject(IndexedSObject),
    Method(MethodDeclaration),
    Field(FieldMember),
    Property(PropertyDeclaration),
    Constructor(ConstructorDeclaration),
    Variable(IndexedVariable),
    Block(Block),
}

impl Declaration {
    /// The user-visible name, when the variant carries one. Constructors and
    /// blocks are anonymous.
    pub fn name(&self) -> Option<&DeclarationName> {
        match self {
            Declaration::Class(c) => Some(&c.name),
            Declaration::Enum(e) => Some(&e.name),
            Declaration::Interface(i) => Some(&i.name),
            Declaration::SObject(s) => Some(&s.name),
            Declaration::Method(m) => Some(&m.name),
            Declaration::Field(f) => Some(&f.name),
            Declaration::Property(p) => Some(&p.name),
            Declaration::Constructor(_) | Declaration::Block(_) => None,
            Declaration::Variable(v) => Some(&v.name),
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Declaration::Class(c) => c.visibility,
            Declaration::Enum(e) => e.visibility,
            Declaration::Interface(i) => i.visibility,
            Declaration::SObject(_) => Visibility::AlwaysVisible,
            Declaration::Method(m) => m.visibility,
            Declaration::Field(f) => f.visibility,
            Declaration::Property(p) => p.visibility,
            Declaration::Constructor(_) | Declaration::Block(_) => Visibility::NeverVisible,
            Declaration::Variable(v) => v.visibility,
        }
    }

    /// Whether this is a top-level type declaration (class, enum, interface
    /// or SObject).
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Declaration::Class(_)
                | Declaration::Enum(_)
                | Declaration::Interface(_)
                | Declaration::SObject(_)
        )
    }
}

/// A local variable or parameter with its lexical extent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedVariable {
    pub name: DeclarationName,
    pub type_name: String,
    pub location: ByteRange,
    pub visibility: Visibility,
}

impl IndexedVariable {
    /// Whether the variable is in scope at the given cursor offset.
    pub fn visible_at(&self, offset: usize) -> bool {
        self.visibility.admits(self.location.begin, offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedClass {
    pub name: DeclarationName,
    pub visibility: Visibility,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    /// Ordered members: nested types first, then fields, properties,
    /// methods and constructors.
    pub members: Vec<Declaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedEnum {
    pub name: DeclarationName,
    pub visibility: Visibility,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    pub name: DeclarationName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedInterface {
    pub name: DeclarationName,
    pub visibility: Visibility,
    pub super_interface: Option<String>,
    pub methods: Vec<MethodDeclaration>,
}

/// A Salesforce data object described by XML metadata. Always visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedSObject {
    pub name: DeclarationName,
    pub fields: Vec<SObjectField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SObjectField {
    pub name: DeclarationName,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDeclaration {
    pub name: DeclarationName,
    pub is_static: bool,
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub visibility: Visibility,
    pub location: Option<ByteRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub type_name: String,
    pub name: DeclarationName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMember {
    pub name: DeclarationName,
    pub is_static: bool,
    pub type_name: Option<String>,
    pub visibility: Visibility,
    pub location: Option<ByteRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDeclaration {
    pub name: DeclarationName,
    pub is_static: bool,
    pub type_name: Option<String>,
    pub visibility: Visibility,
    pub getter: Option<Block>,
    pub setter: Option<Block>,
}

/// Carries no user-visible name and is never hoverable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorDeclaration {
    pub body: Block,
}

/// An ordered list of nested declarations, potentially empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub declarations: Vec<Declaration>,
}
