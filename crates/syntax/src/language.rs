use crate::error::ParseError;
use std::path::Path;

/// Source language of a submitted fragment.
///
/// Structural parsing covers the curly-brace family with optional inline
/// markup (JS/JSX/TS/TSX). Other families are still detected so callers can
/// label fragments, but they degrade to line-level recovery: `supports_ast`
/// is false and no grammar is linked for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
    Python,
    Rust,
    Go,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Language::JavaScript,
            "jsx" => Language::Jsx,
            "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "py" | "pyw" => Language::Python,
            "rs" => Language::Rust,
            "go" => Language::Go,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Jsx => "jsx",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Unknown => "unknown",
        }
    }

    /// Check if this language is supported for AST parsing
    pub fn supports_ast(self) -> bool {
        matches!(
            self,
            Language::JavaScript | Language::Jsx | Language::TypeScript | Language::Tsx
        )
    }

    /// Check if this language can embed inline markup elements in
    /// expressions. Plain TypeScript is excluded: angle brackets there are
    /// type assertions, not elements.
    pub fn supports_markup(self) -> bool {
        matches!(self, Language::JavaScript | Language::Jsx | Language::Tsx)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language, ParseError> {
        match self {
            // The JavaScript grammar covers JSX as well.
            Language::JavaScript | Language::Jsx => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Tsx => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
            _ => Err(ParseError::at_start(format!(
                "no structural grammar for {}",
                self.as_str()
            ))),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            "jsx" => Ok(Language::Jsx),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "tsx" => Ok(Language::Tsx),
            "python" | "py" => Ok(Language::Python),
            "rust" | "rs" => Ok(Language::Rust),
            "go" => Ok(Language::Go),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("JS"), Language::JavaScript);
        assert_eq!(Language::from_extension("jsx"), Language::Jsx);
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("tsx"), Language::Tsx);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("weird"), Language::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/widget.jsx"), Language::Jsx);
        assert_eq!(Language::from_path("lib/index.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("no_extension"), Language::Unknown);
    }

    #[test]
    fn test_supports_ast() {
        assert!(Language::JavaScript.supports_ast());
        assert!(Language::Tsx.supports_ast());
        assert!(!Language::Python.supports_ast());
        assert!(!Language::Go.supports_ast());
        assert!(!Language::Unknown.supports_ast());
    }

    #[test]
    fn test_supports_markup() {
        assert!(Language::Jsx.supports_markup());
        assert!(Language::Tsx.supports_markup());
        assert!(!Language::TypeScript.supports_markup());
    }

    #[test]
    fn test_tree_sitter_language() {
        assert!(Language::JavaScript.tree_sitter_language().is_ok());
        assert!(Language::Tsx.tree_sitter_language().is_ok());
        assert!(Language::Python.tree_sitter_language().is_err());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("jsx".parse::<Language>(), Ok(Language::Jsx));
        assert_eq!("TypeScript".parse::<Language>(), Ok(Language::TypeScript));
        assert!("cobol".parse::<Language>().is_err());
    }
}
