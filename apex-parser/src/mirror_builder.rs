// Tree walk from a parsed Apex file to type mirrors.
//
// Node kinds follow the sfapex grammar (a Java-grammar descendant):
// `class_declaration`, `method_declaration`, `field_declaration` with
// `variable_declarator`s, `enum_declaration` with `enum_constant`s, and
// statement nodes whose bodies introduce nested blocks.

use apex_ast::{
    BlockMirror, ByteRange, ClassMirror, ConstructorMirror, EnumMirror, FieldMirror,
    InterfaceMirror, LocalVariableMirror, MethodMirror, ParameterMirror, PropertyMirror,
    TypeMirror,
};
use tree_sitter::Node;

pub(crate) fn build_mirrors(root: Node<'_>, src: &[u8]) -> Vec<TypeMirror> {
    let mut out = Vec::new();
    for child in children(root) {
        if let Some(mirror) = build_type(child, src) {
            out.push(mirror);
        }
    }
    out
}

fn build_type(node: Node<'_>, src: &[u8]) -> Option<TypeMirror> {
    match node.kind() {
        "class_declaration" => build_class(node, src).map(TypeMirror::Class),
        "enum_declaration" => build_enum(node, src).map(TypeMirror::Enum),
        "interface_declaration" => build_interface(node, src).map(TypeMirror::Interface),
        _ => None,
    }
}

fn build_class(node: Node<'_>, src: &[u8]) -> Option<ClassMirror> {
    let name = field_text(node, "name", src)?;
    let mut mirror = ClassMirror {
        name,
        modifiers: modifiers(node, src),
        super_class: node
            .child_by_field_name("superclass")
            .and_then(|sc| type_reference(sc, src)),
        interfaces: node
            .child_by_field_name("interfaces")
            .map(|list| type_references(list, src))
            .unwrap_or_default(),
        range: node_range(node),
        inner_types: Vec::new(),
        fields: Vec::new(),
        properties: Vec::new(),
        methods: Vec::new(),
        constructors: Vec::new(),
    };

    let Some(body) = node.child_by_field_name("body") else {
        return Some(mirror);
    };
    for member in children(body) {
        match member.kind() {
            "class_declaration" | "enum_declaration" | "interface_declaration" => {
                if let Some(inner) = build_type(member, src) {
                    mirror.inner_types.push(inner);
                }
            }
            "field_declaration" | "property_declaration" => {
                build_field_or_property(member, src, &mut mirror);
            }
            "method_declaration" => {
                if let Some(method) = build_method(member, src) {
                    mirror.methods.push(method);
                }
            }
            "constructor_declaration" => {
                mirror.constructors.push(build_constructor(member, src));
            }
            _ => {}
        }
    }
    Some(mirror)
}

fn build_enum(node: Node<'_>, src: &[u8]) -> Option<EnumMirror> {
    let name = field_text(node, "name", src)?;
    let mut values = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for constant in children(body) {
            if constant.kind() == "enum_constant" {
                if let Some(value) = field_text(constant, "name", src) {
                    values.push(value);
                }
            }
        }
    }
    Some(EnumMirror {
        name,
        modifiers: modifiers(node, src),
        range: node_range(node),
        values,
    })
}

fn build_interface(node: Node<'_>, src: &[u8]) -> Option<InterfaceMirror> {
    let name = field_text(node, "name", src)?;
    let super_interface = children(node)
        .into_iter()
        .find(|c| c.kind() == "extends_interfaces")
        .and_then(|c| type_references(c, src).into_iter().next());
    let mut methods = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for member in children(body) {
            if member.kind() == "method_declaration" {
                if let Some(method) = build_method(member, src) {
                    methods.push(method);
                }
            }
        }
    }
    Some(InterfaceMirror {
        name,
        modifiers: modifiers(node, src),
        super_interface,
        range: node_range(node),
        methods,
    })
}

fn build_field_or_property(node: Node<'_>, src: &[u8], mirror: &mut ClassMirror) {
    let node_modifiers = modifiers(node, src);
    let type_name = field_text(node, "type", src);
    let accessors = children(node)
        .into_iter()
        .find(|c| c.kind() == "accessor_list");

    for declarator in children(node) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name) = field_text(declarator, "name", src) else {
            continue;
        };
        match &accessors {
            Some(list) => mirror.properties.push(PropertyMirror {
                name,
                modifiers: node_modifiers.clone(),
                type_name: type_name.clone(),
                range: node_range(node),
                getter: accessor_body(*list, "get", src),
                setter: accessor_body(*list, "set", src),
            }),
            None => mirror.fields.push(FieldMirror {
                name,
                modifiers: node_modifiers.clone(),
                type_name: type_name.clone(),
                range: node_range(node),
            }),
        }
    }
}

fn accessor_body(list: Node<'_>, which: &str, src: &[u8]) -> Option<BlockMirror> {
    for accessor in children(list) {
        if !accessor.kind().contains("accessor") {
            continue;
        }
        let text = accessor.utf8_text(src).unwrap_or_default();
        if !text.trim_start().starts_with(which) {
            continue;
        }
        return children(accessor)
            .into_iter()
            .find(|c| c.kind() == "block")
            .map(|b| build_block(b, src));
    }
    None
}

fn build_method(node: Node<'_>, src: &[u8]) -> Option<MethodMirror> {
    Some(MethodMirror {
        name: field_text(node, "name", src)?,
        modifiers: modifiers(node, src),
        return_type: field_text(node, "type", src),
        parameters: parameters(node, src),
        range: node_range(node),
        body: node
            .child_by_field_name("body")
            .map(|body| build_block(body, src)),
    })
}

fn build_constructor(node: Node<'_>, src: &[u8]) -> ConstructorMirror {
    ConstructorMirror {
        modifiers: modifiers(node, src),
        parameters: parameters(node, src),
        range: node_range(node),
        body: node
            .child_by_field_name("body")
            .map(|body| build_block(body, src)),
    }
}

fn parameters(node: Node<'_>, src: &[u8]) -> Vec<ParameterMirror> {
    let Some(list) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for parameter in children(list) {
        if parameter.kind() != "formal_parameter" {
            continue;
        }
        let (Some(type_name), Some(name)) = (
            field_text(parameter, "type", src),
            field_text(parameter, "name", src),
        ) else {
            continue;
        };
        out.push(ParameterMirror {
            type_name,
            name,
            range: node_range(parameter),
        });
    }
    out
}

fn build_block(node: Node<'_>, src: &[u8]) -> BlockMirror {
    let mut block = BlockMirror {
        range: brace_range(node),
        variables: Vec::new(),
        blocks: Vec::new(),
    };
    for statement in children(node) {
        collect_statement(statement, src, &mut block);
    }
    block
}

fn collect_statement(node: Node<'_>, src: &[u8], block: &mut BlockMirror) {
    match node.kind() {
        "local_variable_declaration" => {
            collect_local_variables(node, src, &mut block.variables);
        }
        "block" => block.blocks.push(build_block(node, src)),
        "for_statement" => {
            // The init declaration scopes to the loop body.
            let mut loop_variables = Vec::new();
            if let Some(init) = node.child_by_field_name("init") {
                if init.kind() == "local_variable_declaration" {
                    collect_local_variables(init, src, &mut loop_variables);
                }
            }
            push_loop_body(node, src, loop_variables, block);
        }
        "enhanced_for_statement" => {
            let mut loop_variables = Vec::new();
            if let (Some(type_node), Some(name_node)) = (
                node.child_by_field_name("type"),
                node.child_by_field_name("name"),
            ) {
                loop_variables.push(LocalVariableMirror {
                    name: text(name_node, src),
                    type_name: text(type_node, src),
                    range: ByteRange::new(type_node.start_byte(), name_node.end_byte()),
                });
            }
            push_loop_body(node, src, loop_variables, block);
        }
        "while_statement" | "do_statement" => {
            push_loop_body(node, src, Vec::new(), block);
        }
        "if_statement" => {
            if let Some(consequence) = node.child_by_field_name("consequence") {
                collect_statement_body(consequence, src, block);
            }
            if let Some(alternative) = node.child_by_field_name("alternative") {
                collect_statement_body(alternative, src, block);
            }
        }
        "try_statement" => {
            for child in children(node) {
                match child.kind() {
                    "block" => block.blocks.push(build_block(child, src)),
                    "catch_clause" | "finally_clause" => {
                        if let Some(body) = children(child)
                            .into_iter()
                            .find(|c| c.kind() == "block")
                        {
                            block.blocks.push(build_block(body, src));
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn collect_statement_body(node: Node<'_>, src: &[u8], block: &mut BlockMirror) {
    if node.kind() == "block" {
        block.blocks.push(build_block(node, src));
    } else {
        collect_statement(node, src, block);
    }
}

/// Attach loop-header variables to the loop's body block so their scope
/// ends at the body's closing brace.
fn push_loop_body(
    node: Node<'_>,
    src: &[u8],
    loop_variables: Vec<LocalVariableMirror>,
    block: &mut BlockMirror,
) {
    let body = node.child_by_field_name("body");
    match body {
        Some(body) if body.kind() == "block" => {
            let mut body_block = build_block(body, src);
            body_block.variables.splice(0..0, loop_variables);
            block.blocks.push(body_block);
        }
        _ => {
            // Braceless body: bound the header variables by the statement.
            let mut synthetic = BlockMirror {
                range: brace_range(node),
                variables: loop_variables,
                blocks: Vec::new(),
            };
            if let Some(body) = body {
                collect_statement(body, src, &mut synthetic);
            }
            block.blocks.push(synthetic);
        }
    }
}

fn collect_local_variables(node: Node<'_>, src: &[u8], out: &mut Vec<LocalVariableMirror>) {
    let type_name = field_text(node, "type", src).unwrap_or_default();
    for declarator in children(node) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        if let Some(name) = field_text(declarator, "name", src) {
            out.push(LocalVariableMirror {
                name,
                type_name: type_name.clone(),
                range: node_range(node),
            });
        }
    }
}

fn children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn text(node: Node<'_>, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

fn field_text(node: Node<'_>, field: &str, src: &[u8]) -> Option<String> {
    node.child_by_field_name(field).map(|child| text(child, src))
}

fn modifiers(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let Some(list) = children(node)
        .into_iter()
        .find(|c| c.kind() == "modifiers")
    else {
        return Vec::new();
    };
    children(list)
        .into_iter()
        .filter(|m| {
            m.utf8_text(src)
                .map(|t| t.chars().all(|c| c.is_ascii_alphabetic()))
                .unwrap_or(false)
        })
        .map(|m| text(m, src))
        .collect()
}

/// `extends Foo` / `implements Foo, Bar` wrappers carry the keyword; the
/// type names are the named children.
fn type_reference(node: Node<'_>, src: &[u8]) -> Option<String> {
    type_references(node, src).into_iter().next()
}

fn type_references(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    for child in children(node) {
        if !child.is_named() {
            continue;
        }
        if child.kind() == "type_list" {
            out.extend(
                children(child)
                    .into_iter()
                    .filter(|c| c.is_named())
                    .map(|c| text(c, src)),
            );
        } else {
            out.push(text(child, src));
        }
    }
    out
}

fn node_range(node: Node<'_>) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte())
}

/// Block ranges end on the closing brace itself, which is what scope ends
/// are measured against.
fn brace_range(node: Node<'_>) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte().saturating_sub(1))
}
