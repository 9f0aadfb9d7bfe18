// Hover rendering: an Apex-fenced code block describing the resolved
// symbol. The bare signatures double as completion item details.

use apex_ast::{
    Declaration, FieldMember, IndexedClass, MethodDeclaration, PropertyDeclaration,
};
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind};

use super::resolve::ResolvedSymbol;

pub fn hover_for(symbol: &ResolvedSymbol) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("```apex\n{}\n```", render_symbol(symbol)),
        }),
        range: None,
    }
}

pub fn render_symbol(symbol: &ResolvedSymbol) -> String {
    match symbol {
        ResolvedSymbol::Type(declaration) => type_signature(declaration),
        ResolvedSymbol::EnumValue { enum_name, value } => format!("{enum_name}.{value}"),
        ResolvedSymbol::Method { parent, method } => match parent {
            Some(parent) => format!("// in {parent}\n{}", method_signature(method)),
            None => method_signature(method),
        },
        ResolvedSymbol::Field { parent, field } => match parent {
            Some(parent) => format!("// in {parent}\n{}", field_signature(field)),
            None => field_signature(field),
        },
        ResolvedSymbol::Variable(variable) => {
            format!("{} {}", variable.type_name, variable.name)
        }
    }
}

pub fn type_signature(declaration: &Declaration) -> String {
    match declaration {
        Declaration::Class(class) => class_signature(class),
        Declaration::Enum(indexed_enum) => format!("enum {}", indexed_enum.name),
        Declaration::Interface(interface) => format!("interface {}", interface.name),
        // SObjects read like classes at use sites.
        Declaration::SObject(sobject) => format!("class {}", sobject.name),
        other => other
            .name()
            .map(|name| name.as_str().to_string())
            .unwrap_or_default(),
    }
}

pub fn class_signature(class: &IndexedClass) -> String {
    match &class.super_class {
        Some(super_class) => format!("class {} extends {}", class.name, super_class),
        None => format!("class {}", class.name),
    }
}

pub fn method_signature(method: &MethodDeclaration) -> String {
    let mut out = String::new();
    if method.is_static {
        out.push_str("static ");
    }
    if let Some(return_type) = &method.return_type {
        out.push_str(return_type);
        out.push(' ');
    }
    out.push_str(method.name.as_str());
    out.push('(');
    for (index, parameter) in method.parameters.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&parameter.type_name);
        out.push(' ');
        out.push_str(parameter.name.as_str());
    }
    out.push(')');
    out
}

pub fn field_signature(field: &FieldMember) -> String {
    let mut out = String::new();
    if field.is_static {
        out.push_str("static ");
    }
    if let Some(type_name) = &field.type_name {
        out.push_str(type_name);
        out.push(' ');
    }
    out.push_str(field.name.as_str());
    out
}

pub fn property_signature(property: &PropertyDeclaration) -> String {
    let mut out = String::new();
    if property.is_static {
        out.push_str("static ");
    }
    if let Some(type_name) = &property.type_name {
        out.push_str(type_name);
        out.push(' ');
    }
    out.push_str(property.name.as_str());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_ast::{Block, ByteRange, IndexedVariable, Parameter, Visibility};

    fn method() -> MethodDeclaration {
        MethodDeclaration {
            name: "fetch".into(),
            is_static: true,
            return_type: Some("List<Account>".to_string()),
            parameters: vec![
                Parameter {
                    type_name: "String".to_string(),
                    name: "name".into(),
                },
                Parameter {
                    type_name: "Integer".to_string(),
                    name: "limit".into(),
                },
            ],
            body: Block::default(),
            visibility: Visibility::AlwaysVisible,
            location: None,
        }
    }

    #[test]
    fn test_method_hover_names_the_parent() {
        let symbol = ResolvedSymbol::Method {
            parent: Some("AccountService".into()),
            method: method(),
        };
        assert_eq!(
            render_symbol(&symbol),
            "// in AccountService\nstatic List<Account> fetch(String name, Integer limit)"
        );
    }

    #[test]
    fn test_variable_hover_is_type_then_name() {
        let symbol = ResolvedSymbol::Variable(IndexedVariable {
            name: "token".into(),
            type_name: "Parser".to_string(),
            location: ByteRange::new(0, 13),
            visibility: Visibility::AlwaysVisible,
        });
        assert_eq!(render_symbol(&symbol), "Parser token");
    }

    #[test]
    fn test_class_hover_mentions_super_class() {
        let class = IndexedClass {
            name: "Child".into(),
            visibility: Visibility::AlwaysVisible,
            super_class: Some("Base".to_string()),
            interfaces: Vec::new(),
            members: Vec::new(),
        };
        assert_eq!(class_signature(&class), "class Child extends Base");
    }

    #[test]
    fn test_hover_markup_is_apex_fenced() {
        let symbol = ResolvedSymbol::EnumValue {
            enum_name: "Color".into(),
            value: "RED".into(),
        };
        let hover = hover_for(&symbol);
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup contents");
        };
        assert_eq!(markup.kind, MarkupKind::Markdown);
        assert_eq!(markup.value, "```apex\nColor.RED\n```");
    }
}
