// Completion: classify the cursor context, gather candidates from the
// merged declaration set, filter by the typed prefix, rank by category and
// cap the list. In reference position locals shadow types, so a member
// access through a variable name resolves the variable's declared type
// rather than a same-named type.

use apex_ast::{Declaration, IndexedClass, IndexedEnum, IndexedSObject, IndexedVariable, Visibility};
use lsp_types::{CompletionItem, CompletionItemKind, CompletionList, Position};

use super::hover;
use crate::text::{identifier_prefix, position_to_offset};

/// Hard cap per response; a larger candidate set flips `isIncomplete` so
/// the client re-queries instead of filtering locally.
pub const MAX_COMPLETION_ITEMS: usize = 25;

/// Resolves type names against the persisted workspace index.
pub trait TypeLookup {
    fn indexed_type(&self, name: &str) -> Option<Declaration>;
}

/// Lookup over nothing, for contexts with no workspace index.
pub struct NoWorkspace;

impl TypeLookup for NoWorkspace {
    fn indexed_type(&self, _name: &str) -> Option<Declaration> {
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CompletionContext<'a> {
    /// `prefix<cursor>`, possibly empty.
    BarePrefix { prefix: &'a str },
    /// `receiver.prefix<cursor>`.
    MemberAccess { receiver: &'a str, prefix: &'a str },
    /// `receiver.member.prefix<cursor>`, one nesting level.
    ChainedAccess {
        receiver: &'a str,
        member: &'a str,
        prefix: &'a str,
    },
}

/// Look left from the cursor for `X.Y.prefix` shapes. Chains deeper than
/// one member degrade to a bare prefix.
pub fn classify_context(text: &str, offset: usize) -> CompletionContext<'_> {
    let bytes = text.as_bytes();
    let prefix = identifier_prefix(text, offset);
    let prefix_start = offset.min(bytes.len()) - prefix.len();
    if prefix_start == 0 || bytes[prefix_start - 1] != b'.' {
        return CompletionContext::BarePrefix { prefix };
    }

    let receiver = identifier_prefix(text, prefix_start - 1);
    if receiver.is_empty() {
        return CompletionContext::BarePrefix { prefix };
    }
    let receiver_start = prefix_start - 1 - receiver.len();
    if receiver_start == 0 || bytes[receiver_start - 1] != b'.' {
        return CompletionContext::MemberAccess { receiver, prefix };
    }

    let outer = identifier_prefix(text, receiver_start - 1);
    if outer.is_empty() {
        return CompletionContext::MemberAccess { receiver, prefix };
    }
    let outer_start = receiver_start - 1 - outer.len();
    if outer_start > 0 && bytes[outer_start - 1] == b'.' {
        return CompletionContext::BarePrefix { prefix };
    }
    CompletionContext::ChainedAccess {
        receiver: outer,
        member: receiver,
        prefix,
    }
}

// Ranking categories, concatenated in this order.
const CAT_TYPE: u8 = 0;
const CAT_VARIABLE_OR_FIELD: u8 = 1;
const CAT_METHOD: u8 = 2;
const CAT_ENUM_VALUE: u8 = 3;

#[derive(Debug)]
struct Candidate {
    label: String,
    kind: CompletionItemKind,
    detail: Option<String>,
    category: u8,
}

pub fn complete(
    text: &str,
    position: Position,
    declarations: &[Declaration],
    lookup: &dyn TypeLookup,
) -> CompletionList {
    let offset = position_to_offset(text, position.line, position.character);
    let context = classify_context(text, offset);

    let (prefix, candidates) = match context {
        CompletionContext::BarePrefix { prefix } => {
            (prefix, bare_candidates(declarations, offset))
        }
        CompletionContext::MemberAccess { receiver, prefix } => (
            prefix,
            member_candidates(declarations, lookup, receiver, offset),
        ),
        CompletionContext::ChainedAccess {
            receiver,
            member,
            prefix,
        } => (
            prefix,
            chained_candidates(declarations, lookup, receiver, member, offset),
        ),
    };

    let mut candidates = candidates;
    candidates.sort_by_key(|candidate| candidate.category);
    let filtered: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| starts_with_ignore_case(&candidate.label, prefix))
        .collect();

    let is_incomplete = filtered.len() > MAX_COMPLETION_ITEMS;
    let items = filtered
        .into_iter()
        .take(MAX_COMPLETION_ITEMS)
        .enumerate()
        .map(|(index, candidate)| CompletionItem {
            label: candidate.label,
            kind: Some(candidate.kind),
            detail: candidate.detail,
            sort_text: Some(format!("{index:04}")),
            ..CompletionItem::default()
        })
        .collect();

    CompletionList {
        is_incomplete,
        items,
    }
}

fn starts_with_ignore_case(label: &str, prefix: &str) -> bool {
    label.len() >= prefix.len()
        && label
            .bytes()
            .zip(prefix.bytes())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}

fn visible(visibility: Visibility, begin: usize, offset: usize) -> bool {
    visibility.admits(begin, offset)
}

/// Bare prefix: visible top-level types, in-scope variables, top-level
/// methods.
fn bare_candidates(declarations: &[Declaration], offset: usize) -> Vec<Candidate> {
    let mut out = Vec::new();
    for declaration in declarations {
        match declaration {
            d if d.is_type() => {
                if visible(d.visibility(), 0, offset) {
                    out.push(type_candidate(d));
                }
            }
            Declaration::Variable(variable) => {
                if variable.visible_at(offset) {
                    out.push(variable_candidate(variable));
                }
            }
            Declaration::Method(method) => {
                if visible(method.visibility, 0, offset) {
                    out.push(Candidate {
                        label: method.name.as_str().to_string(),
                        kind: CompletionItemKind::METHOD,
                        detail: Some(hover::method_signature(method)),
                        category: CAT_METHOD,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

fn member_candidates(
    declarations: &[Declaration],
    lookup: &dyn TypeLookup,
    receiver: &str,
    offset: usize,
) -> Vec<Candidate> {
    match receiver_type(declarations, lookup, receiver, offset) {
        Some((declaration, ReceiverKind::Instance)) => instance_candidates(&declaration, offset),
        Some((declaration, ReceiverKind::Type)) => static_candidates(&declaration, offset),
        None => Vec::new(),
    }
}

fn chained_candidates(
    declarations: &[Declaration],
    lookup: &dyn TypeLookup,
    receiver: &str,
    member: &str,
    offset: usize,
) -> Vec<Candidate> {
    let Some((base, _)) = receiver_type(declarations, lookup, receiver, offset) else {
        return Vec::new();
    };
    let Declaration::Class(class) = &base else {
        return Vec::new();
    };

    // A nested type completes like a type receiver.
    if let Some(nested) = class
        .members
        .iter()
        .find(|m| m.is_type() && m.name().is_some_and(|n| n.matches(member)))
    {
        return static_candidates(nested, offset);
    }

    // Otherwise an instance member whose declared type is in the index.
    let member_type = class.members.iter().find_map(|m| match m {
        Declaration::Field(field) if field.name.matches(member) => field.type_name.clone(),
        Declaration::Property(property) if property.name.matches(member) => {
            property.type_name.clone()
        }
        _ => None,
    });
    match member_type.and_then(|name| resolve_type_name(declarations, lookup, &name)) {
        Some(declaration) => instance_candidates(&declaration, offset),
        None => Vec::new(),
    }
}

enum ReceiverKind {
    /// The receiver is a value; complete instance members.
    Instance,
    /// The receiver names a type; complete statics and nested types.
    Type,
}

/// Resolve what `X.` refers to. Locals shadow types here: a visible
/// variable named `X` wins, and its declared type is resolved instead.
fn receiver_type(
    declarations: &[Declaration],
    lookup: &dyn TypeLookup,
    receiver: &str,
    offset: usize,
) -> Option<(Declaration, ReceiverKind)> {
    let shadowing_variable = declarations.iter().find_map(|declaration| match declaration {
        Declaration::Variable(variable)
            if variable.name.matches(receiver) && variable.visible_at(offset) =>
        {
            Some(variable.clone())
        }
        _ => None,
    });
    if let Some(variable) = shadowing_variable {
        let declaration = resolve_type_name(declarations, lookup, &variable.type_name)?;
        return Some((declaration, ReceiverKind::Instance));
    }
    resolve_type_name(declarations, lookup, receiver)
        .map(|declaration| (declaration, ReceiverKind::Type))
}

/// A type by name: local top-level types first, then the workspace index.
fn resolve_type_name(
    declarations: &[Declaration],
    lookup: &dyn TypeLookup,
    name: &str,
) -> Option<Declaration> {
    declarations
        .iter()
        .find(|declaration| {
            declaration.is_type()
                && declaration.visibility() != Visibility::NeverVisible
                && declaration.name().is_some_and(|n| n.matches(name))
        })
        .cloned()
        .or_else(|| lookup.indexed_type(name))
}

fn instance_candidates(declaration: &Declaration, offset: usize) -> Vec<Candidate> {
    match declaration {
        Declaration::Class(class) => class_member_candidates(class, offset, false),
        Declaration::Interface(interface) => interface
            .methods
            .iter()
            .map(|method| Candidate {
                label: method.name.as_str().to_string(),
                kind: CompletionItemKind::METHOD,
                detail: Some(hover::method_signature(method)),
                category: CAT_METHOD,
            })
            .collect(),
        Declaration::Enum(indexed_enum) => enum_value_candidates(indexed_enum),
        Declaration::SObject(sobject) => sobject_field_candidates(sobject),
        _ => Vec::new(),
    }
}

fn static_candidates(declaration: &Declaration, offset: usize) -> Vec<Candidate> {
    match declaration {
        Declaration::Class(class) => {
            let mut out: Vec<Candidate> = class
                .members
                .iter()
                .filter(|member| member.is_type())
                .filter(|member| visible(member.visibility(), 0, offset))
                .map(type_candidate)
                .collect();
            out.extend(class_member_candidates(class, offset, true));
            out
        }
        Declaration::Enum(indexed_enum) => enum_value_candidates(indexed_enum),
        Declaration::SObject(sobject) => sobject_field_candidates(sobject),
        _ => Vec::new(),
    }
}

fn class_member_candidates(class: &IndexedClass, offset: usize, wants_static: bool) -> Vec<Candidate> {
    let mut out = Vec::new();
    for member in &class.members {
        if !visible(member.visibility(), 0, offset) {
            continue;
        }
        match member {
            Declaration::Field(field) if field.is_static == wants_static => {
                out.push(Candidate {
                    label: field.name.as_str().to_string(),
                    kind: CompletionItemKind::FIELD,
                    detail: Some(hover::field_signature(field)),
                    category: CAT_VARIABLE_OR_FIELD,
                });
            }
            Declaration::Property(property) if property.is_static == wants_static => {
                out.push(Candidate {
                    label: property.name.as_str().to_string(),
                    kind: CompletionItemKind::FIELD,
                    detail: Some(hover::property_signature(property)),
                    category: CAT_VARIABLE_OR_FIELD,
                });
            }
            Declaration::Method(method) if method.is_static == wants_static => {
                out.push(Candidate {
                    label: method.name.as_str().to_string(),
                    kind: CompletionItemKind::METHOD,
                    detail: Some(hover::method_signature(method)),
                    category: CAT_METHOD,
                });
            }
            _ => {}
        }
    }
    out
}

fn enum_value_candidates(indexed_enum: &IndexedEnum) -> Vec<Candidate> {
    indexed_enum
        .values
        .iter()
        .map(|value| Candidate {
            label: value.name.as_str().to_string(),
            kind: CompletionItemKind::ENUM_MEMBER,
            detail: Some(format!("{}.{}", indexed_enum.name, value.name)),
            category: CAT_ENUM_VALUE,
        })
        .collect()
}

fn sobject_field_candidates(sobject: &IndexedSObject) -> Vec<Candidate> {
    sobject
        .fields
        .iter()
        .map(|field| Candidate {
            label: field.name.as_str().to_string(),
            kind: CompletionItemKind::FIELD,
            detail: field.type_name.clone(),
            category: CAT_VARIABLE_OR_FIELD,
        })
        .collect()
}

fn type_candidate(declaration: &Declaration) -> Candidate {
    let kind = match declaration {
        Declaration::Enum(_) => CompletionItemKind::ENUM,
        Declaration::Interface(_) => CompletionItemKind::INTERFACE,
        _ => CompletionItemKind::CLASS,
    };
    Candidate {
        label: declaration
            .name()
            .map(|name| name.as_str().to_string())
            .unwrap_or_default(),
        kind,
        detail: Some(hover::type_signature(declaration)),
        category: CAT_TYPE,
    }
}

fn variable_candidate(variable: &IndexedVariable) -> Candidate {
    Candidate {
        label: variable.name.as_str().to_string(),
        kind: CompletionItemKind::VARIABLE,
        detail: Some(format!("{} {}", variable.type_name, variable.name)),
        category: CAT_VARIABLE_OR_FIELD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_ast::{ByteRange, EnumValue, SObjectField};

    fn position(line: u32, character: u32) -> Position {
        Position { line, character }
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

    fn scoped_variable(name: &str, type_name: &str, begin: usize, end: usize, scope_end: usize) -> Declaration {
        Declaration::Variable(IndexedVariable {
            name: name.into(),
            type_name: type_name.to_string(),
            location: ByteRange::new(begin, end),
            visibility: Visibility::VisibleBetweenDeclarationAndScopeEnd { scope_end },
        })
    }

    fn color_enum() -> Declaration {
        Declaration::Enum(IndexedEnum {
            name: "Color".into(),
            visibility: Visibility::AlwaysVisible,
            values: vec![
                EnumValue { name: "RED".into() },
                EnumValue { name: "BLUE".into() },
            ],
        })
    }

    #[test]
    fn test_classify_contexts() {
        assert_eq!(
            classify_context("Acc", 3),
            CompletionContext::BarePrefix { prefix: "Acc" }
        );
        assert_eq!(
            classify_context("account.Na", 10),
            CompletionContext::MemberAccess {
                receiver: "account",
                prefix: "Na"
            }
        );
        assert_eq!(
            classify_context("Outer.Inner.fo", 14),
            CompletionContext::ChainedAccess {
                receiver: "Outer",
                member: "Inner",
                prefix: "fo"
            }
        );
        // Deeper chains degrade to a bare prefix.
        assert_eq!(
            classify_context("a.b.c.d", 7),
            CompletionContext::BarePrefix { prefix: "d" }
        );
    }

    #[test]
    fn test_bare_prefix_includes_type_and_variable() {
        let text = "Parser token;";
        let declarations = vec![
            class("Parser", Vec::new()),
            scoped_variable("token", "Parser", 0, 13, 13),
        ];
        let list = complete(text, position(0, 13), &declarations, &NoWorkspace);
        assert!(!list.is_incomplete);
        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["Parser", "token"]);
    }

    #[test]
    fn test_incomplete_signalling_at_the_cap() {
        let declarations: Vec<Declaration> = (0..30)
            .map(|n| class(&format!("Type{n:02}"), Vec::new()))
            .collect();

        let list = complete("", position(0, 0), &declarations, &NoWorkspace);
        assert!(list.is_incomplete);
        assert_eq!(list.items.len(), MAX_COMPLETION_ITEMS);

        let list = complete("Type2", position(0, 5), &declarations, &NoWorkspace);
        assert!(!list.is_incomplete);
        assert_eq!(list.items.len(), 10);
        assert!(list.items.iter().all(|item| item.label.starts_with("Type2")));
    }

    #[test]
    fn test_enum_member_access_with_prefix() {
        let text = "Color.R";
        let declarations = vec![color_enum()];
        let list = complete(text, position(0, 7), &declarations, &NoWorkspace);
        assert!(!list.is_incomplete);
        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["RED"]);
        assert_eq!(list.items[0].kind, Some(CompletionItemKind::ENUM_MEMBER));
    }

    #[test]
    fn test_variable_receiver_completes_instance_members() {
        let text = "svc.";
        let members = vec![
            Declaration::Field(apex_ast::FieldMember {
                name: "endpoint".into(),
                is_static: false,
                type_name: Some("String".to_string()),
                visibility: Visibility::AlwaysVisible,
                location: None,
            }),
            Declaration::Field(apex_ast::FieldMember {
                name: "instances".into(),
                is_static: true,
                type_name: Some("Integer".to_string()),
                visibility: Visibility::AlwaysVisible,
                location: None,
            }),
            Declaration::Method(apex_ast::MethodDeclaration {
                name: "call".into(),
                is_static: false,
                return_type: Some("void".to_string()),
                parameters: Vec::new(),
                body: apex_ast::Block::default(),
                visibility: Visibility::AlwaysVisible,
                location: None,
            }),
        ];
        let declarations = vec![
            class("HttpService", members),
            scoped_variable("svc", "HttpService", 0, 4, 100),
        ];
        let list = complete(text, position(0, 4), &declarations, &NoWorkspace);
        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        // Instance members only, fields ranked before methods.
        assert_eq!(labels, ["endpoint", "call"]);
    }

    #[test]
    fn test_type_receiver_completes_statics_and_nested_types() {
        let text = "HttpService.";
        let members = vec![
            class("Config", Vec::new()),
            Declaration::Field(apex_ast::FieldMember {
                name: "instances".into(),
                is_static: true,
                type_name: Some("Integer".to_string()),
                visibility: Visibility::AlwaysVisible,
                location: None,
            }),
            Declaration::Method(apex_ast::MethodDeclaration {
                name: "call".into(),
                is_static: false,
                return_type: None,
                parameters: Vec::new(),
                body: apex_ast::Block::default(),
                visibility: Visibility::AlwaysVisible,
                location: None,
            }),
        ];
        let declarations = vec![class("HttpService", members)];
        let list = complete(text, position(0, 12), &declarations, &NoWorkspace);
        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["Config", "instances"]);
    }

    #[test]
    fn test_sobject_receiver_completes_fields() {
        let text = "acct.";
        let declarations = vec![
            Declaration::SObject(IndexedSObject {
                name: "Account".into(),
                fields: vec![
                    SObjectField {
                        name: "Name".into(),
                        type_name: Some("Text".to_string()),
                    },
                    SObjectField {
                        name: "Industry__c".into(),
                        type_name: Some("Picklist".to_string()),
                    },
                ],
            }),
            scoped_variable("acct", "Account", 0, 5, 100),
        ];
        let list = complete(text, position(0, 5), &declarations, &NoWorkspace);
        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["Name", "Industry__c"]);
    }

    #[test]
    fn test_out_of_scope_variable_is_not_offered() {
        let text = "{ String myVar; } myV";
        let declarations = vec![scoped_variable("myVar", "String", 2, 15, 16)];
        let list = complete(text, position(0, 21), &declarations, &NoWorkspace);
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_chained_nested_type_access() {
        let text = "Outer.Codes.";
        let declarations = vec![class("Outer", vec![color_enum_named("Codes")])];
        let list = complete(text, position(0, 12), &declarations, &NoWorkspace);
        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["RED", "BLUE"]);
    }

    fn color_enum_named(name: &str) -> Declaration {
        Declaration::Enum(IndexedEnum {
            name: name.into(),
            visibility: Visibility::AlwaysVisible,
            values: vec![
                EnumValue { name: "RED".into() },
                EnumValue { name: "BLUE".into() },
            ],
        })
    }

    #[test]
    fn test_unresolvable_receiver_is_empty_and_complete() {
        let list = complete("ghost.", position(0, 6), &[], &NoWorkspace);
        assert!(list.items.is_empty());
        assert!(!list.is_incomplete);
    }
}
