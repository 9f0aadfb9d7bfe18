// Symbol resolution for hover: identifier under the cursor, then an
// ordered search of the merged declaration set. Type names shadow
// variables at reference sites, so types are consulted first; an
// exact-case pass runs before the case-folded pass so a variable whose
// spelling matches the cursor exactly still wins over a differently-cased
// type name.

use apex_ast::{Declaration, DeclarationName, FieldMember, IndexedVariable, MethodDeclaration, Visibility};

use crate::text::extract_identifier;

#[derive(Debug, Clone)]
pub enum ResolvedSymbol {
    Type(Declaration),
    EnumValue {
        enum_name: DeclarationName,
        value: DeclarationName,
    },
    Method {
        parent: Option<DeclarationName>,
        method: MethodDeclaration,
    },
    Field {
        parent: Option<DeclarationName>,
        field: FieldMember,
    },
    Variable(IndexedVariable),
}

enum Lookup {
    Found(ResolvedSymbol),
    /// A member matched but is not hoverable; the search stops without a
    /// result rather than leaking an unrelated declaration.
    Abort,
    Missing,
}

/// Resolve the symbol under the cursor, or `None` when nothing hoverable
/// is there.
pub fn resolve_symbol_at(
    text: &str,
    offset: usize,
    declarations: &[Declaration],
) -> Option<ResolvedSymbol> {
    let identifier = extract_identifier(text, offset);
    if identifier.is_empty() {
        return None;
    }
    match search(identifier, offset, declarations, true) {
        Lookup::Found(symbol) => Some(symbol),
        Lookup::Abort => None,
        Lookup::Missing => match search(identifier, offset, declarations, false) {
            Lookup::Found(symbol) => Some(symbol),
            _ => None,
        },
    }
}

fn name_matches(name: &DeclarationName, identifier: &str, exact: bool) -> bool {
    if exact {
        name.matches_exact(identifier)
    } else {
        name.matches(identifier)
    }
}

fn search(identifier: &str, offset: usize, declarations: &[Declaration], exact: bool) -> Lookup {
    // Top-level types.
    for declaration in declarations {
        if !declaration.is_type() || declaration.visibility() == Visibility::NeverVisible {
            continue;
        }
        if let Some(name) = declaration.name() {
            if name_matches(name, identifier, exact) {
                return Lookup::Found(ResolvedSymbol::Type(declaration.clone()));
            }
        }
    }

    // Enum values across all enums.
    for declaration in declarations {
        let Declaration::Enum(indexed_enum) = declaration else {
            continue;
        };
        if indexed_enum.visibility == Visibility::NeverVisible {
            continue;
        }
        for value in &indexed_enum.values {
            if name_matches(&value.name, identifier, exact) {
                return Lookup::Found(ResolvedSymbol::EnumValue {
                    enum_name: indexed_enum.name.clone(),
                    value: value.name.clone(),
                });
            }
        }
    }

    // Class members: the first name match decides.
    for declaration in declarations {
        let Declaration::Class(class) = declaration else {
            continue;
        };
        for member in &class.members {
            if member.visibility() == Visibility::NeverVisible {
                continue;
            }
            let Some(name) = member.name() else {
                continue;
            };
            if !name_matches(name, identifier, exact) {
                continue;
            }
            return match member {
                Declaration::Method(method) => Lookup::Found(ResolvedSymbol::Method {
                    parent: Some(class.name.clone()),
                    method: method.clone(),
                }),
                Declaration::Field(field) => Lookup::Found(ResolvedSymbol::Field {
                    parent: Some(class.name.clone()),
                    field: field.clone(),
                }),
                _ => Lookup::Abort,
            };
        }
    }

    // Interface methods.
    for declaration in declarations {
        let Declaration::Interface(interface) = declaration else {
            continue;
        };
        for method in &interface.methods {
            if name_matches(&method.name, identifier, exact) {
                return Lookup::Found(ResolvedSymbol::Method {
                    parent: Some(interface.name.clone()),
                    method: method.clone(),
                });
            }
        }
    }

    // Local variables, scope respected.
    for declaration in declarations {
        let Declaration::Variable(variable) = declaration else {
            continue;
        };
        if name_matches(&variable.name, identifier, exact) && variable.visible_at(offset) {
            return Lookup::Found(ResolvedSymbol::Variable(variable.clone()));
        }
    }

    Lookup::Missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_ast::{
        Block, ByteRange, ConstructorDeclaration, EnumValue, IndexedClass, IndexedEnum,
        PropertyDeclaration,
    };

    fn variable(name: &str, type_name: &str, begin: usize, end: usize, scope_end: usize) -> Declaration {
        Declaration::Variable(IndexedVariable {
            name: name.into(),
            type_name: type_name.to_string(),
            location: ByteRange::new(begin, end),
            visibility: Visibility::VisibleBetweenDeclarationAndScopeEnd { scope_end },
        })
    }

    fn class(name: &str, members: Vec<Declaration>) -> Declaration {
        Declaration::Class(IndexedClass {
            name: name.into(),
            visibility: Visibility::AlwaysVisible,
            super_class: None,
            interfaces: Vec::new(),
            members,
        })
    }

    #[test]
    fn test_variable_under_cursor_resolves() {
        let text = "Parser token;";
        let declarations = vec![
            class("Parser", Vec::new()),
            variable("token", "Parser", 0, 13, 13),
        ];
        let Some(ResolvedSymbol::Variable(v)) = resolve_symbol_at(text, 7, &declarations) else {
            panic!("expected a variable");
        };
        assert!(v.name.matches("token"));
    }

    #[test]
    fn test_out_of_scope_variable_is_null() {
        // Variable declared inside a block, referenced after it closes.
        let text = "{ String myVar; } x = myVar;";
        let declarations = vec![variable("myVar", "String", 2, 15, 16)];
        assert!(resolve_symbol_at(text, 22, &declarations).is_none());
    }

    #[test]
    fn test_exact_case_variable_beats_folded_type() {
        let text = "myclass";
        let declarations = vec![
            class("MyClass", Vec::new()),
            variable("myclass", "String", 0, 7, 100),
        ];
        assert!(matches!(
            resolve_symbol_at(text, 2, &declarations),
            Some(ResolvedSymbol::Variable(_))
        ));
    }

    #[test]
    fn test_same_case_type_shadows_variable() {
        let text = "Parser";
        let declarations = vec![
            variable("Parser", "String", 0, 6, 100),
            class("Parser", Vec::new()),
        ];
        assert!(matches!(
            resolve_symbol_at(text, 2, &declarations),
            Some(ResolvedSymbol::Type(_))
        ));
    }

    #[test]
    fn test_enum_value_resolves_before_members() {
        let text = "RED";
        let declarations = vec![Declaration::Enum(IndexedEnum {
            name: "Color".into(),
            visibility: Visibility::AlwaysVisible,
            values: vec![EnumValue { name: "RED".into() }],
        })];
        let Some(ResolvedSymbol::EnumValue { enum_name, value }) =
            resolve_symbol_at(text, 1, &declarations)
        else {
            panic!("expected an enum value");
        };
        assert!(enum_name.matches("Color"));
        assert!(value.matches("RED"));
    }

    #[test]
    fn test_property_match_stops_the_search() {
        // A property and a later variable share the name; the property
        // match must not fall through to the variable.
        let text = "Total";
        let declarations = vec![
            class(
                "Invoice",
                vec![Declaration::Property(PropertyDeclaration {
                    name: "Total".into(),
                    is_static: false,
                    type_name: Some("Decimal".to_string()),
                    visibility: Visibility::AlwaysVisible,
                    getter: None,
                    setter: None,
                })],
            ),
            variable("Total", "Decimal", 0, 5, 100),
        ];
        assert!(resolve_symbol_at(text, 2, &declarations).is_none());
    }

    #[test]
    fn test_constructor_members_never_match() {
        let text = "build";
        let declarations = vec![class(
            "Builder",
            vec![
                Declaration::Constructor(ConstructorDeclaration {
                    body: Block::default(),
                }),
                Declaration::Method(MethodDeclaration {
                    name: "build".into(),
                    is_static: false,
                    return_type: Some("Builder".to_string()),
                    parameters: Vec::new(),
                    body: Block::default(),
                    visibility: Visibility::AlwaysVisible,
                    location: None,
                }),
            ],
        )];
        let Some(ResolvedSymbol::Method { parent, method }) =
            resolve_symbol_at(text, 2, &declarations)
        else {
            panic!("expected a method");
        };
        assert!(parent.as_ref().is_some_and(|p| p.matches("Builder")));
        assert!(method.name.matches("build"));
    }
}
