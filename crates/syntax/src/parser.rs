use crate::error::ParseError;
use crate::language::Language;
use crate::tree::{walk_preorder, SyntaxTree};
use std::time::Duration;
use tree_sitter::{Node, Parser};

/// Strict and permissive parsing over tree-sitter.
///
/// Tree-sitter always yields a tree, so "parse failed" is a classification
/// rather than an absence: a tree with no error nodes parses cleanly; error
/// nodes confined to inline-markup subtrees are recoverable omissions and
/// the tree is still accepted (`SyntaxTree::is_recovered`); any other
/// ERROR/missing node fails the strict parse at that node's position.
pub struct SourceParser {
    parser: Parser,
    language: Language,
}

impl std::fmt::Debug for SourceParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceParser")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl SourceParser {
    /// Create a parser for a language. Languages outside the curly-brace
    /// family have no grammar and fail here with a position-less
    /// [`ParseError`], which callers route into line-level recovery.
    pub fn new(language: Language) -> Result<Self, ParseError> {
        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ParseError::at_start(format!("failed to load grammar: {e}")))?;

        Ok(Self { parser, language })
    }

    /// Bound wall-clock time spent inside a single parse. On timeout the
    /// parse yields no tree and surfaces as a [`ParseError`].
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        #[allow(deprecated)]
        self.parser.set_timeout_micros(budget.as_micros() as u64);
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Strict parse: `Ok` for clean trees and for trees whose only error
    /// nodes are markup-confined, `Err` positioned at the first hard error
    /// otherwise. Pure: no side effects, no retries.
    pub fn parse(&mut self, code: &str) -> Result<SyntaxTree, ParseError> {
        let tree = self
            .parser
            .parse(code, None)
            .ok_or_else(|| ParseError::at_start("parser produced no tree within budget"))?;

        let root = tree.root_node();
        if !root.has_error() {
            return Ok(SyntaxTree::new(tree, code.to_string(), self.language, false));
        }

        let markup_ok = self.language.supports_markup();
        if let Some(node) = first_hard_error(root, code, markup_ok) {
            return Err(error_at(node));
        }

        log::debug!(
            "accepting tree with markup-confined errors for {} input",
            self.language
        );
        Ok(SyntaxTree::new(tree, code.to_string(), self.language, true))
    }

    /// Permissive parse: best-effort partial tree for any input. Used as
    /// the fallback input to fingerprinting when the strict parse fails.
    pub fn parse_permissive(&mut self, code: &str) -> Option<SyntaxTree> {
        let tree = self.parser.parse(code, None)?;
        let recovered = tree.root_node().has_error();
        Some(SyntaxTree::new(
            tree,
            code.to_string(),
            self.language,
            recovered,
        ))
    }
}

/// Find the first error/missing node that is not a recoverable markup
/// omission, in document order.
fn first_hard_error<'tree>(
    root: Node<'tree>,
    source: &str,
    markup_ok: bool,
) -> Option<Node<'tree>> {
    let mut first: Option<Node<'tree>> = None;
    walk_preorder(root, &mut |node| {
        if first.is_some() || !(node.is_error() || node.is_missing()) {
            return;
        }
        if markup_ok && is_markup_confined(node, source) {
            return;
        }
        first = Some(node);
    });
    first
}

/// A markup-confined error either sits inside a markup subtree, wraps
/// markup content, or (when the grammar bailed out before producing markup
/// nodes) covers a region that lexically starts with an opening tag.
fn is_markup_confined(node: Node<'_>, source: &str) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind().starts_with("jsx_") {
            return true;
        }
        current = n.parent();
    }

    let mut wraps_markup = false;
    walk_preorder(node, &mut |n| {
        if n.kind().starts_with("jsx_") {
            wraps_markup = true;
        }
    });
    if wraps_markup {
        return true;
    }

    node.is_error() && source[node.start_byte()..node.end_byte()].trim_start().starts_with('<')
}

fn error_at(node: Node<'_>) -> ParseError {
    let point = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        "invalid syntax".to_string()
    };
    ParseError::new(point.row + 1, point.column + 1, message)
}
