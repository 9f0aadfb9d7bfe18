// Declaration model shared by the workspace indexer, the local indexer
// and the language features (completion, hover).

mod declaration;
mod lower;
mod mirror;
mod name;
mod payload;
mod sobject;
mod visibility;

pub use declaration::{
    Block, ConstructorDeclaration, Declaration, EnumValue, FieldMember, IndexedClass, IndexedEnum,
    IndexedInterface, IndexedSObject, IndexedVariable, MethodDeclaration, Parameter,
    PropertyDeclaration, SObjectField,
};
pub use lower::{local_declarations, sobject_declaration, workspace_declaration};
pub use mirror::{
    is_public_or_global, is_static, BlockMirror, ClassMirror, ConstructorMirror, EnumMirror,
    FieldMirror, InterfaceMirror, LocalVariableMirror, MethodMirror, ParameterMirror,
    PropertyMirror, TypeMirror,
};
pub use name::DeclarationName;
pub use payload::{
    ApexIndexEntry, SObjectIndexEntry, SObjectSource, SourceInfo, SCHEMA_VERSION,
};
pub use sobject::{SObjectFieldMetadata, SObjectMetadata};
pub use visibility::{ByteRange, Visibility};
