use crate::tree::{walk_preorder, SyntaxTree};
use std::collections::BTreeMap;
use tree_sitter::Node;

/// Toggles for the individual auto-fix transformations.
#[derive(Debug, Clone, Copy)]
pub struct AutoFixes {
    /// Same method name declared twice in one scope: keep the last.
    pub elide_duplicates: bool,
    /// Markup element with no closing tag and no children: self-close it.
    pub normalize_markup: bool,
}

impl Default for AutoFixes {
    fn default() -> Self {
        Self {
            elide_duplicates: true,
            normalize_markup: true,
        }
    }
}

/// Result of an auto-fix pass over one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoFixResult {
    pub code: String,
    pub modified: bool,
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Apply the enabled transformations to a parsed (possibly partial) tree.
///
/// Both transformations are pure and idempotent: they collect byte-range
/// edits against the tree's source and splice them in one pass, so a
/// second run over the rewritten output finds nothing left to change.
pub fn apply_auto_fixes(tree: &SyntaxTree, fixes: &AutoFixes) -> AutoFixResult {
    let mut edits = Vec::new();
    if fixes.elide_duplicates {
        collect_duplicate_elisions(tree, &mut edits);
    }
    if fixes.normalize_markup && tree.language().supports_markup() {
        collect_unterminated_rewrites(tree, &mut edits);
    }

    if edits.is_empty() {
        return AutoFixResult {
            code: tree.source().to_string(),
            modified: false,
        };
    }

    let code = splice(tree.source(), edits);
    let modified = code != tree.source();
    if modified {
        log::debug!("auto-fix rewrote {} input", tree.language());
    }
    AutoFixResult { code, modified }
}

/// Duplicate-declaration elision: within one declaring scope, a method
/// name declared more than once keeps only its last occurrence (last edit
/// wins).
fn collect_duplicate_elisions(tree: &SyntaxTree, edits: &mut Vec<Edit>) {
    walk_preorder(tree.root(), &mut |scope| {
        if !matches!(
            scope.kind(),
            "program" | "statement_block" | "class_body" | "object"
        ) {
            return;
        }

        let mut occurrences: BTreeMap<String, Vec<Node<'_>>> = BTreeMap::new();
        let mut cursor = scope.walk();
        for child in scope.named_children(&mut cursor) {
            if let Some(name) = declared_member_name(child, tree) {
                occurrences.entry(name).or_default().push(child);
            }
        }

        for nodes in occurrences.into_values() {
            if nodes.len() < 2 {
                continue;
            }
            for node in &nodes[..nodes.len() - 1] {
                let (start, end) = removal_range(tree.source(), node.start_byte(), node.end_byte());
                edits.push(Edit {
                    start,
                    end,
                    replacement: String::new(),
                });
            }
        }
    });
}

/// Name of a scope member that counts as a method declaration.
fn declared_member_name(node: Node<'_>, tree: &SyntaxTree) -> Option<String> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "method_definition" => {
            named_field_text(node, "name", tree)
        }
        "pair" => {
            let value = node.child_by_field_name("value")?;
            if !matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            ) {
                return None;
            }
            named_field_text(node, "key", tree)
        }
        _ => None,
    }
}

fn named_field_text(node: Node<'_>, field: &str, tree: &SyntaxTree) -> Option<String> {
    let name = node.child_by_field_name(field)?;
    if name.kind() == "computed_property_name" {
        return None;
    }
    Some(tree.text_of(name).to_string())
}

/// Grow a removal range to swallow the member's separator: trailing
/// comma for object members, the trailing newline otherwise, and the
/// leading indentation when the member starts its line.
fn removal_range(src: &str, mut start: usize, mut end: usize) -> (usize, usize) {
    let bytes = src.as_bytes();

    let mut scan = end;
    while scan < bytes.len() && (bytes[scan] == b' ' || bytes[scan] == b'\t') {
        scan += 1;
    }
    if scan < bytes.len() && bytes[scan] == b',' {
        scan += 1;
        end = scan;
        while scan < bytes.len() && (bytes[scan] == b' ' || bytes[scan] == b'\t') {
            scan += 1;
        }
    }
    if scan < bytes.len() && bytes[scan] == b'\r' {
        scan += 1;
    }
    if scan < bytes.len() && bytes[scan] == b'\n' {
        end = scan + 1;
    }

    let line_start = src[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if src[line_start..start].chars().all(|c| c == ' ' || c == '\t') {
        start = line_start;
    }

    (start, end)
}

/// Unterminated-element normalization: an opening tag with no matching
/// closing tag and no child content becomes self-closing. Elements that do
/// have children are left untouched.
fn collect_unterminated_rewrites(tree: &SyntaxTree, edits: &mut Vec<Edit>) {
    walk_preorder(tree.root(), &mut |node| {
        if node.kind() == "jsx_opening_element" {
            if needs_self_close(node, tree) {
                edits.push(self_close_edit(tree, node.start_byte(), node.end_byte()));
            }
            return;
        }

        // When the grammar bailed out before producing markup nodes, fall
        // back to a lexical scan of the error region.
        if node.is_error() && !contains_markup(node) {
            if let Some((start, end)) = scan_unterminated_open(tree, node) {
                edits.push(self_close_edit(tree, start, end));
            }
        }
    });
}

fn self_close_edit(tree: &SyntaxTree, start: usize, end: usize) -> Edit {
    // Strip the trailing '>' and any whitespace before it, then re-close.
    let inner = tree.source()[start..end - 1].trim_end();
    Edit {
        start,
        end,
        replacement: format!("{inner} />"),
    }
}

fn contains_markup(node: Node<'_>) -> bool {
    let mut found = false;
    walk_preorder(node, &mut |n| {
        if n.kind().starts_with("jsx_") {
            found = true;
        }
    });
    found
}

fn needs_self_close(open: Node<'_>, tree: &SyntaxTree) -> bool {
    let Some(parent) = open.parent() else {
        return false;
    };

    if parent.kind() == "jsx_element" {
        let mut has_close = false;
        let mut has_content = false;
        let mut cursor = parent.walk();
        for child in parent.named_children(&mut cursor) {
            match child.kind() {
                "jsx_opening_element" => {}
                "jsx_closing_element" => {
                    if !child.is_missing() {
                        has_close = true;
                    }
                }
                "jsx_text" => {
                    if !tree.text_of(child).trim().is_empty() {
                        has_content = true;
                    }
                }
                _ => has_content = true,
            }
        }
        return !has_close && !has_content;
    }

    // Opening element stranded inside an error region: self-close unless
    // markup content or a closing tag follows it.
    let mut sibling = open.next_named_sibling();
    while let Some(node) = sibling {
        match node.kind() {
            "jsx_text" if tree.text_of(node).trim().is_empty() => {
                sibling = node.next_named_sibling();
            }
            "jsx_closing_element"
            | "jsx_text"
            | "jsx_expression"
            | "jsx_element"
            | "jsx_self_closing_element"
            | "jsx_fragment" => return false,
            _ => return true,
        }
    }
    true
}

/// Lexical fallback for error regions with no markup nodes: recognize a
/// leading `<Name attr="...">` opening tag followed only by statement
/// punctuation, and return the tag's byte range.
fn scan_unterminated_open(tree: &SyntaxTree, node: Node<'_>) -> Option<(usize, usize)> {
    let start = node.start_byte();
    let text = &tree.source()[start..node.end_byte()];
    let trimmed = text.trim_start();
    if !trimmed.starts_with('<') {
        return None;
    }
    let offset = text.len() - trimmed.len();

    let mut chars = trimmed.char_indices().skip(1).peekable();
    let (_, first) = chars.peek().copied()?;
    if !first.is_alphabetic() {
        return None;
    }

    let mut quote: Option<char> = None;
    for (idx, c) in chars {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => {
                    if trimmed[..idx].ends_with('/') {
                        return None; // already self-closing
                    }
                    let rest = trimmed[idx + 1..].trim();
                    let childless = rest.is_empty()
                        || matches!(rest.chars().next(), Some(';' | ')' | ',' | '}'));
                    if !childless || rest.contains('<') {
                        return None;
                    }
                    return Some((start + offset, start + offset + idx + 1));
                }
                '<' => return None,
                _ => {}
            },
        }
    }
    None
}

/// Splice non-overlapping edits into the source. When edits overlap (an
/// elided declaration containing a markup rewrite), the earlier-starting,
/// wider edit wins.
fn splice(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(src.len());
    let mut pos = 0;
    for edit in &edits {
        if edit.start < pos {
            continue;
        }
        out.push_str(&src[pos..edit.start]);
        out.push_str(&edit.replacement);
        pos = edit.end;
    }
    out.push_str(&src[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::parser::SourceParser;
    use pretty_assertions::assert_eq;

    fn fix(language: Language, code: &str) -> AutoFixResult {
        let mut parser = SourceParser::new(language).unwrap();
        let tree = parser.parse(code).unwrap();
        apply_auto_fixes(&tree, &AutoFixes::default())
    }

    #[test]
    fn test_duplicate_functions_keep_last() {
        let code = "function foo() { return 1; }\nfunction foo() { return 2; }\n";
        let result = fix(Language::JavaScript, code);
        assert!(result.modified);
        assert_eq!(result.code.matches("function foo").count(), 1);
        assert!(result.code.contains("return 2"));
        assert!(!result.code.contains("return 1"));
    }

    #[test]
    fn test_duplicate_class_methods_keep_last() {
        let code = r#"class A {
  m() { return 1; }
  m() { return 2; }
}
"#;
        let result = fix(Language::JavaScript, code);
        assert!(result.modified);
        assert_eq!(result.code.matches("m()").count(), 1);
        assert!(result.code.contains("return 2"));
    }

    #[test]
    fn test_duplicate_object_methods_keep_last() {
        let code = "const ops = { sum(a, b) { return a; }, sum(a, b) { return b; } };";
        let result = fix(Language::JavaScript, code);
        assert!(result.modified);
        assert_eq!(result.code.matches("sum(a, b)").count(), 1);
        assert!(result.code.contains("return b"));
    }

    #[test]
    fn test_distinct_names_untouched() {
        let code = "function foo() {}\nfunction bar() {}\n";
        let result = fix(Language::JavaScript, code);
        assert!(!result.modified);
        assert_eq!(result.code, code);
    }

    #[test]
    fn test_same_name_in_different_scopes_untouched() {
        let code = "function outer() { function helper() {} }\nfunction helper() {}\n";
        let result = fix(Language::JavaScript, code);
        assert!(!result.modified);
    }

    #[test]
    fn test_unterminated_element_self_closed() {
        let result = fix(Language::Jsx, "const panel = <Panel>;");
        assert!(result.modified);
        assert!(result.code.contains("<Panel />"));
    }

    #[test]
    fn test_unterminated_element_with_attributes() {
        let result = fix(Language::Jsx, "const panel = <Panel title=\"x\">;");
        assert!(result.modified);
        assert!(result.code.contains("<Panel title=\"x\" />"));
    }

    #[test]
    fn test_element_with_children_untouched() {
        let code = "const panel = <Panel><Row /></Panel>;";
        let result = fix(Language::Jsx, code);
        assert!(!result.modified);
        assert_eq!(result.code, code);
    }

    #[test]
    fn test_self_closing_element_untouched() {
        let code = "const panel = <Panel />;";
        let result = fix(Language::Jsx, code);
        assert!(!result.modified);
    }

    #[test]
    fn test_toggles_disable_fixes() {
        let mut parser = SourceParser::new(Language::JavaScript).unwrap();
        let tree = parser
            .parse("function foo() { return 1; }\nfunction foo() { return 2; }\n")
            .unwrap();
        let off = AutoFixes {
            elide_duplicates: false,
            normalize_markup: false,
        };
        let result = apply_auto_fixes(&tree, &off);
        assert!(!result.modified);
    }

    #[test]
    fn test_idempotent() {
        let first = fix(
            Language::JavaScript,
            "function foo() { return 1; }\nfunction foo() { return 2; }\n",
        );
        let second = fix(Language::JavaScript, &first.code);
        assert!(!second.modified);
        assert_eq!(second.code, first.code);
    }
}
