//! # Mend Syntax
//!
//! Structural parsing and fingerprinting for the repair engine.
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Language Detection (from extension/hint)
//!     │
//!     ├──> Tree-sitter Parsing
//!     │    ├─> strict: Result<SyntaxTree, ParseError>
//!     │    └─> permissive: best-effort partial tree
//!     │
//!     ├──> Fingerprint
//!     │    └─> "{kind}:{name}({arity})" per function-like declaration,
//!     │        in document order
//!     │
//!     └──> Auto-fix transformations
//!          ├─> duplicate-declaration elision (last wins)
//!          └─> unterminated-element normalization (self-closing)
//! ```
//!
//! Tree-sitter stays confined to this crate; downstream crates consume
//! [`SyntaxTree`], fingerprints, and rewritten source strings.

mod error;
mod fingerprint;
mod language;
mod parser;
mod transform;
mod tree;

pub use error::ParseError;
pub use fingerprint::{fingerprint, DeclKind};
pub use language::Language;
pub use parser::SourceParser;
pub use transform::{apply_auto_fixes, AutoFixResult, AutoFixes};
pub use tree::SyntaxTree;
