//! Name Allocation
//!
//! Hands out identifiers that are legal in the target language and unique
//! within a scope. A name registered once for an id is returned for that id
//! forever after, so every reference to the same thing renders identically.
//!
//! Scopes are plain strings (`types`, `properties/OrderCompleted`, ...) and
//! never interact: `id` in two different classes is not a collision.
//!
//! One `Namer` belongs to one emission pass for one language. It is never
//! shared between builds or languages.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::rules::{Language, NamingRules};

/// Collision-safe identifier allocator
#[derive(Debug, Clone)]
pub struct Namer<R> {
    rules: R,

    /// scope -> identifiers handed out
    taken: HashMap<String, HashSet<String>>,

    /// scope -> id -> identifier
    by_id: HashMap<String, HashMap<String, String>>,

    /// Registrations that needed a numeric suffix
    disambiguated: usize,
}

impl Namer<Box<dyn NamingRules>> {
    /// A namer using the rules of `language`
    pub fn for_language(language: Language) -> Self {
        Self::new(language.rules())
    }
}

impl<R: NamingRules> Namer<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            taken: HashMap::new(),
            by_id: HashMap::new(),
            disambiguated: 0,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Legal identifier for `raw` without registering it
    pub fn sanitize(&self, raw: &str) -> String {
        self.rules.sanitize(raw)
    }

    /// Allocate (or recall) the identifier for `id` in `scope`.
    ///
    /// The first registration of an id sanitizes `raw_name`, escapes reserved
    /// words and appends `_1`, `_2`, ... until the result is free in the scope.
    /// Later registrations of the same id return the stored identifier and
    /// ignore `raw_name`.
    pub fn register(&mut self, id: &str, raw_name: &str, scope: &str) -> String {
        if let Some(existing) = self.lookup(id, scope) {
            return existing.to_string();
        }

        let mut base = self.rules.sanitize(raw_name);
        if self.rules.is_reserved(&base) {
            base = self.rules.escape_reserved(&base);
        }

        let taken = self.taken.entry(scope.to_string()).or_default();
        let mut candidate = base.clone();
        let mut counter: u64 = 1;
        while taken.contains(&candidate) {
            trace!(scope, id, taken = %candidate, "identifier collision");
            candidate = self.rules.with_suffix(&base, counter);
            counter += 1;
        }
        if counter > 1 {
            self.disambiguated += 1;
        }

        taken.insert(candidate.clone());
        self.by_id
            .entry(scope.to_string())
            .or_default()
            .insert(id.to_string(), candidate.clone());
        candidate
    }

    /// The identifier registered for `id` in `scope`, if any
    pub fn lookup(&self, id: &str, scope: &str) -> Option<&str> {
        self.by_id
            .get(scope)
            .and_then(|ids| ids.get(id))
            .map(String::as_str)
    }

    /// Whether `name` has been handed out in `scope`
    pub fn is_taken(&self, name: &str, scope: &str) -> bool {
        self.taken
            .get(scope)
            .is_some_and(|names| names.contains(name))
    }

    /// Identifiers handed out in `scope`, sorted
    pub fn names_in(&self, scope: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .taken
            .get(scope)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn stats(&self) -> NamerStats {
        NamerStats {
            scopes: self.taken.len(),
            names: self.taken.values().map(HashSet::len).sum(),
            disambiguated: self.disambiguated,
        }
    }
}

/// Counts over everything a namer has allocated
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NamerStats {
    pub scopes: usize,
    pub names: usize,
    pub disambiguated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::rules::{KotlinRules, RustRules, TypeScriptRules};

    #[test]
    fn test_collisions_get_numeric_suffix() {
        let mut namer = Namer::new(TypeScriptRules);
        assert_eq!(namer.register("x", "a", "s"), "a");
        assert_eq!(namer.register("y", "a", "s"), "a_1");
        assert_eq!(namer.register("z", "a", "s"), "a_2");
        assert_eq!(namer.stats().disambiguated, 2);
    }

    #[test]
    fn test_registration_is_stable_per_id() {
        let mut namer = Namer::new(TypeScriptRules);
        let first = namer.register("order.id", "orderId", "properties/Order");
        let again = namer.register("order.id", "somethingElse", "properties/Order");
        assert_eq!(first, again);
        assert_eq!(namer.lookup("order.id", "properties/Order"), Some("orderId"));
    }

    #[test]
    fn test_scopes_are_isolated() {
        let mut namer = Namer::new(TypeScriptRules);
        assert_eq!(namer.register("a.id", "id", "properties/A"), "id");
        assert_eq!(namer.register("b.id", "id", "properties/B"), "id");
        assert!(namer.lookup("a.id", "properties/B").is_none());
    }

    #[test]
    fn test_reserved_words_are_escaped() {
        let mut namer = Namer::new(TypeScriptRules);
        assert_eq!(namer.register("p", "class", "properties/Event"), "_class");
        assert_eq!(namer.register("q", "Class", "properties/Event"), "_Class");

        let mut rust = Namer::new(RustRules);
        assert_eq!(rust.register("p", "type", "fields"), "type_");
        assert_eq!(rust.register("q", "Type", "fields"), "Type");
    }

    #[test]
    fn test_kotlin_keyword_is_quoted() {
        let mut namer = Namer::new(KotlinRules);
        assert_eq!(namer.register("p", "when", "properties/Event"), "`when`");
    }

    #[test]
    fn test_kotlin_keyword_collision_stays_legal() {
        let mut namer = Namer::new(KotlinRules);
        assert_eq!(namer.register("a", "when", "s"), "`when`");
        assert_eq!(namer.register("b", "when", "s"), "when_1");
        assert_eq!(namer.register("c", "when", "s"), "when_2");
        assert!(namer.names_in("s").iter().all(|n| !n.contains("`_")));
    }

    #[test]
    fn test_rust_empty_name_is_usable() {
        let mut namer = Namer::new(RustRules);
        assert_eq!(namer.register("a", "", "fields"), "_field");
        assert_eq!(namer.register("b", "", "fields"), "_field_1");
    }

    #[test]
    fn test_digit_prefix_and_illegal_characters() {
        let mut namer = Namer::new(TypeScriptRules);
        assert_eq!(namer.register("a", "3ds", "s"), "_3ds");
        assert_eq!(namer.register("b", "user-id", "s"), "user_id");
        assert_eq!(namer.register("c", "user id", "s"), "user_id_1");
    }

    #[test]
    fn test_sanitized_collision_with_escaped_name() {
        let mut namer = Namer::new(TypeScriptRules);
        assert_eq!(namer.register("a", "_class", "s"), "_class");
        assert_eq!(namer.register("b", "class", "s"), "_class_1");
    }

    #[test]
    fn test_lookup_does_not_register() {
        let namer = Namer::new(TypeScriptRules);
        assert!(namer.lookup("x", "s").is_none());
        assert!(!namer.is_taken("x", "s"));
        assert_eq!(namer.stats(), NamerStats::default());
    }

    #[test]
    fn test_boxed_rules() {
        let mut namer = Namer::for_language(Language::Rust);
        assert_eq!(namer.register("m", "match", "fields"), "match_");
        assert_eq!(namer.names_in("fields"), vec!["match_"]);
    }

    #[test]
    fn test_many_collisions_terminate() {
        let mut namer = Namer::new(TypeScriptRules);
        for i in 0..500 {
            namer.register(&i.to_string(), "name", "s");
        }
        assert_eq!(namer.register("last", "name", "s"), "name_500");
        assert_eq!(namer.stats().names, 501);
    }
}
