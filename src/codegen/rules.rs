//! Target-Language Naming Rules
//!
//! What counts as a legal identifier, and how reserved words are escaped, for
//! each language a generator can emit.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ILLEGAL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").unwrap());

/// Identifier rules of one target language
pub trait NamingRules {
    /// Reserved words of the language
    fn reserved_words(&self) -> &'static [&'static str];

    /// Turn arbitrary text into a legal identifier
    fn sanitize(&self, raw: &str) -> String;

    /// Whether `name` needs escaping. Case-insensitive unless overridden.
    fn is_reserved(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.reserved_words().contains(&lower.as_str())
    }

    fn escape_reserved(&self, name: &str) -> String {
        format!("_{}", name)
    }

    /// `base` with a collision counter appended, still legal in the language
    fn with_suffix(&self, base: &str, counter: u64) -> String {
        format!("{}_{}", base, counter)
    }
}

impl<R: NamingRules + ?Sized> NamingRules for Box<R> {
    fn reserved_words(&self) -> &'static [&'static str] {
        (**self).reserved_words()
    }

    fn sanitize(&self, raw: &str) -> String {
        (**self).sanitize(raw)
    }

    fn is_reserved(&self, name: &str) -> bool {
        (**self).is_reserved(name)
    }

    fn escape_reserved(&self, name: &str) -> String {
        (**self).escape_reserved(name)
    }

    fn with_suffix(&self, base: &str, counter: u64) -> String {
        (**self).with_suffix(base, counter)
    }
}

/// Replace illegal characters with `_` and keep identifiers from starting with a digit
fn replace_illegal(raw: &str) -> String {
    let replaced = ILLEGAL_CHARS.replace_all(raw, "_");
    match replaced.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{}", replaced),
        Some(_) => replaced.into_owned(),
    }
}

// =============================================================================
// Languages
// =============================================================================

/// A language generators can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[value(name = "typescript")]
    TypeScript,
    Kotlin,
    Rust,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::TypeScript, Language::Kotlin, Language::Rust];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::Kotlin => "kotlin",
            Language::Rust => "rust",
        }
    }

    pub fn rules(&self) -> Box<dyn NamingRules> {
        match self {
            Language::TypeScript => Box::new(TypeScriptRules),
            Language::Kotlin => Box::new(KotlinRules),
            Language::Rust => Box::new(RustRules),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TypeScript
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptRules;

const TYPESCRIPT_RESERVED: &[&str] = &[
    "abstract", "any", "as", "async", "await", "boolean", "break", "case", "catch", "class",
    "const", "constructor", "continue", "debugger", "declare", "default", "delete", "do", "else",
    "enum", "export", "extends", "false", "finally", "for", "from", "function", "get", "if",
    "implements", "import", "in", "infer", "instanceof", "interface", "is", "keyof", "let",
    "module", "namespace", "never", "new", "null", "number", "object", "package", "private",
    "protected", "public", "readonly", "require", "return", "set", "static", "string", "super",
    "switch", "symbol", "this", "throw", "true", "try", "type", "typeof", "undefined", "unique",
    "unknown", "var", "void", "while", "with", "yield",
];

impl NamingRules for TypeScriptRules {
    fn reserved_words(&self) -> &'static [&'static str] {
        TYPESCRIPT_RESERVED
    }

    fn sanitize(&self, raw: &str) -> String {
        replace_illegal(raw)
    }
}

// =============================================================================
// Kotlin
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinRules;

const KOTLIN_RESERVED: &[&str] = &[
    "abstract", "actual", "annotation", "as", "break", "by", "catch", "class", "companion",
    "constructor", "continue", "crossinline", "data", "delegate", "do", "dynamic", "else", "enum",
    "expect", "external", "false", "field", "final", "finally", "for", "fun", "get", "if",
    "import", "in", "infix", "init", "inner", "interface", "internal", "is", "lateinit",
    "noinline", "null", "object", "open", "operator", "out", "override", "package", "private",
    "property", "protected", "public", "reified", "return", "sealed", "set", "super", "suspend",
    "tailrec", "this", "throw", "true", "try", "typealias", "val", "var", "vararg", "when",
    "where", "while",
];

impl NamingRules for KotlinRules {
    fn reserved_words(&self) -> &'static [&'static str] {
        KOTLIN_RESERVED
    }

    /// Exact keyword matches are quoted with backticks, which Kotlin accepts
    fn sanitize(&self, raw: &str) -> String {
        quote_keyword(replace_illegal(raw))
    }

    /// The counter goes inside the quotes: `when` becomes `when_1`, not `` `when`_1 ``
    fn with_suffix(&self, base: &str, counter: u64) -> String {
        let bare = base.trim_matches('`');
        quote_keyword(format!("{}_{}", bare, counter))
    }
}

fn quote_keyword(name: String) -> String {
    if KOTLIN_RESERVED.contains(&name.as_str()) {
        format!("`{}`", name)
    } else {
        name
    }
}

// =============================================================================
// Rust
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct RustRules;

const RUST_RESERVED: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
    // Reserved for future use
    "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try", "typeof",
    "unsized", "virtual", "yield",
];

impl NamingRules for RustRules {
    fn reserved_words(&self) -> &'static [&'static str] {
        RUST_RESERVED
    }

    /// A lone `_` is the wildcard pattern, not an identifier
    fn sanitize(&self, raw: &str) -> String {
        match replace_illegal(raw) {
            wildcard if wildcard == "_" => "_field".to_string(),
            sanitized => sanitized,
        }
    }

    /// Rust keywords are case-sensitive: `Type` is fine, `type` is not
    fn is_reserved(&self, name: &str) -> bool {
        RUST_RESERVED.contains(&name)
    }

    fn escape_reserved(&self, name: &str) -> String {
        format!("{}_", name)
    }
}
