use crate::tree::{walk_preorder, SyntaxTree};
use std::fmt::Write as _;
use tree_sitter::Node;

const ANONYMOUS: &str = "anonymous";

/// Closed set of function-like declaration shapes that contribute to a
/// fragment's fingerprint. Dispatch is a pattern match over tree-sitter
/// node kinds plus the declaring context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// `function name(...) {}` at any nesting depth
    FunctionDecl,
    /// method or function-valued field inside a `class` body
    ClassMethod,
    /// shorthand method or function-valued property in an object literal
    ObjectMethod,
    /// arrow/function expression bound to an identifier
    ArrowAssigned,
}

impl DeclKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeclKind::FunctionDecl => "FunctionDeclaration",
            DeclKind::ClassMethod => "ClassMethod",
            DeclKind::ObjectMethod => "ObjectMethod",
            DeclKind::ArrowAssigned => "ArrowFunction",
        }
    }
}

/// Reduce a syntax tree to its structural signature.
///
/// Walks the tree in document order and emits
/// `{kind}:{name-or-"anonymous"}({paramCount})` for every function-like
/// declaration, concatenated in traversal order. Body logic, literals, and
/// variable names are deliberately ignored, so the signature survives
/// renames and literal edits but changes when declarations are added,
/// removed, reordered, or change arity. Works on partial trees.
pub fn fingerprint(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    walk_preorder(tree.root(), &mut |node| {
        if let Some((kind, name, arity)) = classify(node, tree) {
            let _ = write!(out, "{}:{}({})", kind.as_str(), name, arity);
        }
    });
    out
}

fn classify(node: Node<'_>, tree: &SyntaxTree) -> Option<(DeclKind, String, usize)> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            let name = field_name(node, "name", tree).unwrap_or_else(|| ANONYMOUS.to_string());
            Some((DeclKind::FunctionDecl, name, arity(node)))
        }
        "method_definition" => {
            let kind = match node.parent()?.kind() {
                "class_body" => DeclKind::ClassMethod,
                "object" => DeclKind::ObjectMethod,
                _ => return None,
            };
            let name = field_name(node, "name", tree).unwrap_or_else(|| ANONYMOUS.to_string());
            Some((kind, name, arity(node)))
        }
        "field_definition" | "public_field_definition" => {
            let value = node.child_by_field_name("value")?;
            if !is_function_value(value.kind()) {
                return None;
            }
            let name = field_name(node, "property", tree).unwrap_or_else(|| ANONYMOUS.to_string());
            Some((DeclKind::ClassMethod, name, arity(value)))
        }
        "pair" => {
            let value = node.child_by_field_name("value")?;
            if !is_function_value(value.kind()) {
                return None;
            }
            let name = field_name(node, "key", tree).unwrap_or_else(|| ANONYMOUS.to_string());
            Some((DeclKind::ObjectMethod, name, arity(value)))
        }
        "variable_declarator" => {
            let value = node.child_by_field_name("value")?;
            if !is_function_value(value.kind()) {
                return None;
            }
            let name = node
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .map(|n| tree.text_of(n).to_string())
                .unwrap_or_else(|| ANONYMOUS.to_string());
            Some((DeclKind::ArrowAssigned, name, arity(value)))
        }
        _ => None,
    }
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Declared parameter count of a function-like node. A bare single arrow
/// parameter (`x => ...`) has no parameter list node and counts as 1.
fn arity(func: Node<'_>) -> usize {
    if let Some(params) = func.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .count()
    } else if func.child_by_field_name("parameter").is_some() {
        1
    } else {
        0
    }
}

/// Member name for a named field, with computed names reduced to
/// "anonymous" and quoted string keys unquoted.
fn field_name(node: Node<'_>, field: &str, tree: &SyntaxTree) -> Option<String> {
    let name = node.child_by_field_name(field)?;
    if name.kind() == "computed_property_name" {
        return None;
    }
    let text = tree
        .text_of(name)
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::parser::SourceParser;
    use pretty_assertions::assert_eq;

    fn fp(code: &str) -> String {
        let mut parser = SourceParser::new(Language::JavaScript).unwrap();
        fingerprint(&parser.parse(code).unwrap())
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            fp("function add(a, b) { return a + b; }"),
            "FunctionDeclaration:add(2)"
        );
    }

    #[test]
    fn test_class_methods_in_document_order() {
        let code = r#"
class Calc {
  add(a, b) { return a + b; }
  negate(x) { return -x; }
}
"#;
        assert_eq!(fp(code), "ClassMethod:add(2)ClassMethod:negate(1)");
    }

    #[test]
    fn test_object_methods() {
        let code = "const ops = { sum(a, b) { return a + b; }, neg: (x) => -x };";
        assert_eq!(fp(code), "ObjectMethod:sum(2)ObjectMethod:neg(1)");
    }

    #[test]
    fn test_arrow_bound_to_identifier() {
        assert_eq!(fp("const double = (x) => x * 2;"), "ArrowFunction:double(1)");
        assert_eq!(fp("const id = x => x;"), "ArrowFunction:id(1)");
    }

    #[test]
    fn test_ignores_body_logic_and_literals() {
        let left = fp("function greet(name) { return 'hello ' + name; }");
        let right = fp("function greet(person) { console.log(person); return 1; }");
        assert_eq!(left, right);
    }

    #[test]
    fn test_changes_on_arity_change() {
        assert_ne!(
            fp("function add(a) {}"),
            fp("function add(a, b) {}")
        );
    }

    #[test]
    fn test_changes_on_reorder() {
        assert_ne!(
            fp("function a() {}\nfunction b() {}"),
            fp("function b() {}\nfunction a() {}")
        );
    }

    #[test]
    fn test_stable_across_calls() {
        let code = "class Grid { render() {} resize(w, h) {} }";
        assert_eq!(fp(code), fp(code));
    }

    #[test]
    fn test_partial_tree_fingerprint() {
        let mut parser = SourceParser::new(Language::JavaScript).unwrap();
        let tree = parser
            .parse_permissive("function add(a, b) { return a + b; }\n@@garbage@@")
            .unwrap();
        assert!(fingerprint(&tree).contains("FunctionDeclaration:add(2)"));
    }
}
