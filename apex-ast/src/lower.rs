// Lowering from parse mirrors to declarations.
//
// The same mirror feeds two consumers with different visibility policies:
// the index repository exposes only `public`/`global` names from other
// files, while the local indexer sees everything in the open file and adds
// scope-bounded variables for parameters and block locals.

use crate::declaration::{
    Block, ConstructorDeclaration, Declaration, EnumValue, FieldMember, IndexedClass, IndexedEnum,
    IndexedInterface, IndexedSObject, IndexedVariable, MethodDeclaration, Parameter,
    PropertyDeclaration, SObjectField,
};
use crate::mirror::{
    is_public_or_global, is_static, BlockMirror, ClassMirror, ConstructorMirror, EnumMirror,
    FieldMirror, InterfaceMirror, MethodMirror, ParameterMirror, PropertyMirror, TypeMirror,
};
use crate::sobject::SObjectMetadata;
use crate::visibility::{ByteRange, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    /// Persisted workspace index: non-public names are carried but never
    /// visible.
    Workspace,
    /// The open file: every declared name is visible.
    Local,
}

fn modifier_visibility(modifiers: &[String], flavor: Flavor) -> Visibility {
    match flavor {
        Flavor::Local => Visibility::AlwaysVisible,
        Flavor::Workspace => {
            if is_public_or_global(modifiers) {
                Visibility::AlwaysVisible
            } else {
                Visibility::NeverVisible
            }
        }
    }
}

/// Lower one persisted type mirror with workspace visibility rules.
pub fn workspace_declaration(mirror: &TypeMirror) -> Declaration {
    lower_type(mirror, Flavor::Workspace)
}

/// Lower SObject metadata. SObjects and their fields are always visible.
pub fn sobject_declaration(metadata: &SObjectMetadata) -> Declaration {
    Declaration::SObject(IndexedSObject {
        name: metadata.api_name.as_str().into(),
        fields: metadata
            .fields
            .iter()
            .map(|f| SObjectField {
                name: f.api_name.as_str().into(),
                type_name: f.field_type.clone(),
            })
            .collect(),
    })
}

/// Lower the mirrors of an open file into the flat declaration list the
/// resolver and completion engine consume: each top-level type, its
/// methods hoisted to the top level for unqualified calls, then
/// scope-bounded variables for every parameter and block local in the
/// file.
pub fn local_declarations(mirrors: &[TypeMirror]) -> Vec<Declaration> {
    let mut out = Vec::new();
    for mirror in mirrors {
        out.push(lower_type(mirror, Flavor::Local));
        if let TypeMirror::Class(class) = mirror {
            for method in &class.methods {
                out.push(Declaration::Method(lower_method(
                    method,
                    Flavor::Local,
                    false,
                )));
            }
        }
        collect_scoped_variables(mirror, &mut out);
    }
    out
}

fn lower_type(mirror: &TypeMirror, flavor: Flavor) -> Declaration {
    match mirror {
        TypeMirror::Class(c) => Declaration::Class(lower_class(c, flavor)),
        TypeMirror::Enum(e) => Declaration::Enum(lower_enum(e, flavor)),
        TypeMirror::Interface(i) => Declaration::Interface(lower_interface(i, flavor)),
    }
}

fn lower_class(class: &ClassMirror, flavor: Flavor) -> IndexedClass {
    // Member order: nested classes, enums, interfaces, then fields,
    // properties, methods, constructors.
    let mut members = Vec::new();
    for inner in &class.inner_types {
        if matches!(inner, TypeMirror::Class(_)) {
            members.push(lower_type(inner, flavor));
        }
    }
    for inner in &class.inner_types {
        if matches!(inner, TypeMirror::Enum(_)) {
            members.push(lower_type(inner, flavor));
        }
    }
    for inner in &class.inner_types {
        if matches!(inner, TypeMirror::Interface(_)) {
            members.push(lower_type(inner, flavor));
        }
    }
    for field in &class.fields {
        members.push(Declaration::Field(lower_field(field, flavor)));
    }
    for property in &class.properties {
        members.push(Declaration::Property(lower_property(property, flavor)));
    }
    for method in &class.methods {
        members.push(Declaration::Method(lower_method(method, flavor, false)));
    }
    for constructor in &class.constructors {
        members.push(Declaration::Constructor(lower_constructor(constructor)));
    }

    IndexedClass {
        name: class.name.as_str().into(),
        visibility: modifier_visibility(&class.modifiers, flavor),
        super_class: class.super_class.clone(),
        interfaces: class.interfaces.clone(),
        members,
    }
}

fn lower_enum(mirror: &EnumMirror, flavor: Flavor) -> IndexedEnum {
    IndexedEnum {
        name: mirror.name.as_str().into(),
        visibility: modifier_visibility(&mirror.modifiers, flavor),
        values: mirror
            .values
            .iter()
            .map(|v| EnumValue {
                name: v.as_str().into(),
            })
            .collect(),
    }
}

fn lower_interface(mirror: &InterfaceMirror, flavor: Flavor) -> IndexedInterface {
    IndexedInterface {
        name: mirror.name.as_str().into(),
        visibility: modifier_visibility(&mirror.modifiers, flavor),
        super_interface: mirror.super_interface.clone(),
        // Interface methods are visible by rule, whatever their modifiers.
        methods: mirror
            .methods
            .iter()
            .map(|m| lower_method(m, flavor, true))
            .collect(),
    }
}

fn lower_method(mirror: &MethodMirror, flavor: Flavor, interface_member: bool) -> MethodDeclaration {
    MethodDeclaration {
        name: mirror.name.as_str().into(),
        is_static: is_static(&mirror.modifiers),
        return_type: mirror.return_type.clone(),
        parameters: mirror.parameters.iter().map(lower_parameter).collect(),
        body: mirror.body.as_ref().map(lower_block).unwrap_or_default(),
        visibility: if interface_member {
            Visibility::AlwaysVisible
        } else {
            modifier_visibility(&mirror.modifiers, flavor)
        },
        location: Some(mirror.range),
    }
}

fn lower_parameter(mirror: &ParameterMirror) -> Parameter {
    Parameter {
        type_name: mirror.type_name.clone(),
        name: mirror.name.as_str().into(),
    }
}

fn lower_field(mirror: &FieldMirror, flavor: Flavor) -> FieldMember {
    FieldMember {
        name: mirror.name.as_str().into(),
        is_static: is_static(&mirror.modifiers),
        type_name: mirror.type_name.clone(),
        visibility: modifier_visibility(&mirror.modifiers, flavor),
        location: Some(mirror.range),
    }
}

fn lower_property(mirror: &PropertyMirror, flavor: Flavor) -> PropertyDeclaration {
    PropertyDeclaration {
        name: mirror.name.as_str().into(),
        is_static: is_static(&mirror.modifiers),
        type_name: mirror.type_name.clone(),
        visibility: modifier_visibility(&mirror.modifiers, flavor),
        getter: mirror.getter.as_ref().map(lower_block),
        setter: mirror.setter.as_ref().map(lower_block),
    }
}

fn lower_constructor(mirror: &ConstructorMirror) -> ConstructorDeclaration {
    ConstructorDeclaration {
        body: mirror.body.as_ref().map(lower_block).unwrap_or_default(),
    }
}

fn lower_block(mirror: &BlockMirror) -> Block {
    let mut declarations = Vec::new();
    for variable in &mirror.variables {
        declarations.push(Declaration::Variable(scoped_variable(
            variable.name.as_str(),
            variable.type_name.as_str(),
            variable.range,
            mirror.range.end,
        )));
    }
    for nested in &mirror.blocks {
        declarations.push(Declaration::Block(lower_block(nested)));
    }
    Block { declarations }
}

fn scoped_variable(name: &str, type_name: &str, range: ByteRange, scope_end: usize) -> IndexedVariable {
    IndexedVariable {
        name: name.into(),
        type_name: type_name.to_string(),
        location: range,
        visibility: Visibility::VisibleBetweenDeclarationAndScopeEnd { scope_end },
    }
}

fn collect_scoped_variables(mirror: &TypeMirror, out: &mut Vec<Declaration>) {
    let TypeMirror::Class(class) = mirror else {
        return;
    };
    for method in &class.methods {
        scoped_from_callable(&method.parameters, method.body.as_ref(), method.range, out);
    }
    for constructor in &class.constructors {
        scoped_from_callable(
            &constructor.parameters,
            constructor.body.as_ref(),
            constructor.range,
            out,
        );
    }
    for property in &class.properties {
        if let Some(getter) = &property.getter {
            scoped_from_block(getter, out);
        }
        if let Some(setter) = &property.setter {
            scoped_from_block(setter, out);
        }
    }
    for inner in &class.inner_types {
        collect_scoped_variables(inner, out);
    }
}

fn scoped_from_callable(
    parameters: &[ParameterMirror],
    body: Option<&BlockMirror>,
    declaration_range: ByteRange,
    out: &mut Vec<Declaration>,
) {
    // Parameters share the scope of the method body.
    let scope_end = body.map(|b| b.range.end).unwrap_or(declaration_range.end);
    for parameter in parameters {
        out.push(Declaration::Variable(scoped_variable(
            &parameter.name,
            &parameter.type_name,
            parameter.range,
            scope_end,
        )));
    }
    if let Some(body) = body {
        scoped_from_block(body, out);
    }
}

fn scoped_from_block(block: &BlockMirror, out: &mut Vec<Declaration>) {
    for variable in &block.variables {
        out.push(Declaration::Variable(scoped_variable(
            &variable.name,
            &variable.type_name,
            variable.range,
            block.range.end,
        )));
    }
    for nested in &block.blocks {
        scoped_from_block(nested, out);
    }
}
