// Narrow binding over the tree-sitter Apex grammar.
//
// The grammar itself is an opaque shared library loaded at runtime; this
// crate turns parse trees into the serializable mirrors the indexers
// consume and knows nothing about LSP or the filesystem layout.

mod language;
mod mirror_builder;

use apex_ast::TypeMirror;
use thiserror::Error;

pub use language::{grammar_library_path, load_language, GRAMMAR_ENV_VAR, GRAMMAR_SYMBOL};

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("failed to load Apex grammar from {path}: {source}")]
    GrammarLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },
    #[error("Apex grammar is incompatible with this tree-sitter runtime: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("parser produced no tree")]
    NoTree,
}

/// A reusable Apex parser. Parsers are cheap to create once the grammar is
/// loaded; the grammar library itself stays mapped for the process
/// lifetime.
pub struct ApexParser {
    parser: tree_sitter::Parser,
}

impl ApexParser {
    /// Build a parser using the grammar found via `TS_SFAPEX_LIB` or the
    /// path sibling to the running executable.
    pub fn new() -> Result<Self, ParserError> {
        Self::with_language(&load_language()?)
    }

    pub fn with_language(language: &tree_sitter::Language) -> Result<Self, ParserError> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(language)?;
        Ok(Self { parser })
    }

    /// Parse one Apex source file into mirrors of its top-level types.
    ///
    /// Syntax errors do not fail the parse; tree-sitter recovers and the
    /// mirrors reflect whatever declarations survived.
    pub fn parse_source(&mut self, text: &str) -> Result<Vec<TypeMirror>, ParserError> {
        let tree = self.parser.parse(text, None).ok_or(ParserError::NoTree)?;
        Ok(mirror_builder::build_mirrors(
            tree.root_node(),
            text.as_bytes(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_ast::{TypeMirror, Visibility};

    /// Tests below need the real grammar library; they log and pass when it
    /// is not installed.
    fn parser() -> Option<ApexParser> {
        match ApexParser::new() {
            Ok(parser) => Some(parser),
            Err(err) => {
                eprintln!("skipping: Apex grammar unavailable ({err})");
                None
            }
        }
    }

    #[test]
    fn test_parses_class_with_members() {
        let Some(mut parser) = parser() else { return };
        let source = "public class AccountService {\n    private Integer counter;\n    public String fetch(String name) {\n        String local = name;\n        return local;\n    }\n}\n";
        let mirrors = parser.parse_source(source).expect("parse");
        assert_eq!(mirrors.len(), 1);
        let TypeMirror::Class(class) = &mirrors[0] else {
            panic!("expected a class mirror");
        };
        assert_eq!(class.name, "AccountService");
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.methods.len(), 1);
        let body = class.methods[0].body.as_ref().expect("method body");
        assert_eq!(body.variables.len(), 1);
        assert_eq!(body.variables[0].name, "local");
    }

    #[test]
    fn test_enum_values_in_order() {
        let Some(mut parser) = parser() else { return };
        let source = "public enum Color { RED, GREEN, BLUE }\n";
        let mirrors = parser.parse_source(source).expect("parse");
        let TypeMirror::Enum(color) = &mirrors[0] else {
            panic!("expected an enum mirror");
        };
        assert_eq!(color.values, ["RED", "GREEN", "BLUE"]);
    }

    #[test]
    fn test_local_lowering_end_to_end() {
        let Some(mut parser) = parser() else { return };
        let source = "public class Main {\n    void run() {\n        for (Integer i = 0; i < 10; i++) {\n            Integer doubled = i * 2;\n        }\n    }\n}\n";
        let mirrors = parser.parse_source(source).expect("parse");
        let declarations = apex_ast::local_declarations(&mirrors);
        let names: Vec<String> = declarations
            .iter()
            .filter_map(|d| d.name().map(|n| n.as_str().to_string()))
            .collect();
        assert!(names.contains(&"Main".to_string()));
        assert!(names.contains(&"i".to_string()));
        assert!(names.contains(&"doubled".to_string()));
        // Loop variables go out of scope with the loop body.
        let close = source.rfind("}\n    }").unwrap_or(0);
        for declaration in &declarations {
            if let apex_ast::Declaration::Variable(v) = declaration {
                if v.name.matches("doubled") {
                    let Visibility::VisibleBetweenDeclarationAndScopeEnd { scope_end } =
                        v.visibility
                    else {
                        panic!("expected a scoped variable");
                    };
                    assert!(scope_end <= close + 1);
                }
            }
        }
    }
}
