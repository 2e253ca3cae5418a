//! Code Generation Support
//!
//! What language emitters build on: a [`GeneratorClient`] per emission pass,
//! wrapping a [`Namer`] with the naming conventions of each declaration kind,
//! plus a language-agnostic [`FieldType`] projection of AST nodes.
//!
//! Emitters never read raw JSON Schema, only [`CompiledEvent`]s.

pub mod names;
pub mod rules;

use serde::Serialize;

pub use names::{Namer, NamerStats};
pub use rules::{KotlinRules, Language, NamingRules, RustRules, TypeScriptRules};

use crate::build::CompiledEvent;
use crate::schema::{PrimitiveKind, Schema, SchemaType};

// Scope names shared by every language
const TYPES_SCOPE: &str = "types";
const FUNCTIONS_SCOPE: &str = "functions";
const ENUMS_SCOPE: &str = "enums";

// =============================================================================
// Analytics Calls
// =============================================================================

/// The analytics operation an event is emitted through
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalyticsCall {
    Track,
    Identify,
    Page,
    Screen,
    Group,
    Unknown(String),
}

impl AnalyticsCall {
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_lowercase().as_str() {
            "track" => AnalyticsCall::Track,
            "identify" => AnalyticsCall::Identify,
            "page" => AnalyticsCall::Page,
            "screen" => AnalyticsCall::Screen,
            "group" => AnalyticsCall::Group,
            _ => AnalyticsCall::Unknown(method.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AnalyticsCall::Track => "track",
            AnalyticsCall::Identify => "identify",
            AnalyticsCall::Page => "page",
            AnalyticsCall::Screen => "screen",
            AnalyticsCall::Group => "group",
            AnalyticsCall::Unknown(method) => method,
        }
    }

    /// Identify and group carry traits; everything else carries properties.
    pub fn uses_traits(&self) -> bool {
        matches!(self, AnalyticsCall::Identify | AnalyticsCall::Group)
    }

    /// The part of a compiled event this call sends
    pub fn payload<'e>(&self, event: &'e CompiledEvent) -> &'e Schema {
        if self.uses_traits() {
            &event.traits
        } else {
            &event.properties
        }
    }
}

// =============================================================================
// Field Types
// =============================================================================

/// How a node is referred to from a declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "camelCase")]
pub enum FieldType {
    /// A custom type, by allocated identifier
    Custom(String),
    Scalar(PrimitiveKind),
    Array(Box<FieldType>),
    /// Object declared in place
    InlineObject,
    Union(Vec<FieldType>),
}

/// A property of an object, ready to render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDecl {
    /// Key in the payload
    pub source_name: String,
    /// Identifier in generated code
    pub name: String,
    pub field_type: FieldType,
    pub is_required: bool,
    pub is_nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// Generator Client
// =============================================================================

/// Naming front-end for one emission pass in one language.
///
/// Every helper registers into the client's own [`Namer`] under a fixed scope
/// and casing, so the same id always yields the same identifier.
pub struct GeneratorClient<'a, R: NamingRules = Box<dyn NamingRules>> {
    language: Option<Language>,
    namer: Namer<R>,
    events: &'a [CompiledEvent],
}

impl<'a> GeneratorClient<'a> {
    /// Client with a fresh namer for `language`
    pub fn for_language(language: Language, events: &'a [CompiledEvent]) -> Self {
        Self {
            language: Some(language),
            namer: Namer::for_language(language),
            events,
        }
    }
}

impl<'a, R: NamingRules> GeneratorClient<'a, R> {
    pub fn new(namer: Namer<R>, events: &'a [CompiledEvent]) -> Self {
        Self {
            language: None,
            namer,
            events,
        }
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn events(&self) -> &'a [CompiledEvent] {
        self.events
    }

    pub fn namer(&self) -> &Namer<R> {
        &self.namer
    }

    /// PascalCase name in the `types` scope
    pub fn type_name(&mut self, id: &str, parts: &[&str]) -> String {
        self.namer
            .register(id, &to_pascal_case(&parts.join(" ")), TYPES_SCOPE)
    }

    /// camelCase name in the `functions` scope
    pub fn function_name(&mut self, id: &str, parts: &[&str]) -> String {
        self.namer
            .register(id, &to_camel_case(&parts.join(" ")), FUNCTIONS_SCOPE)
    }

    /// camelCase name unique among the properties of `owner`
    pub fn property_name(&mut self, id: &str, name: &str, owner: &str) -> String {
        self.namer
            .register(id, &to_camel_case(name), &format!("properties/{}", owner))
    }

    /// PascalCase name in the `enums` scope
    pub fn enum_name(&mut self, id: &str, parts: &[&str]) -> String {
        self.namer
            .register(id, &to_pascal_case(&parts.join(" ")), ENUMS_SCOPE)
    }

    /// PascalCase member name unique within `enum_name`
    pub fn enum_member_name(&mut self, id: &str, name: &str, enum_name: &str) -> String {
        self.namer
            .register(id, &to_pascal_case(name), &format!("enums/{}", enum_name))
    }

    /// Type name for a custom type. Keyed on the ref name alone, so every
    /// reference to it shares one identifier.
    pub fn custom_type_name(&mut self, ref_name: &str) -> String {
        let id = format!("{}.customType", ref_name);
        self.type_name(&id, &[ref_name, "CustomType"])
    }

    /// Dereference a ref node through the registry of the event that owns it
    pub fn resolve_ref<'e>(&self, event: &'e CompiledEvent, node: &Schema) -> Option<&'e Schema> {
        event.types.resolve(node)
    }

    /// How `node` is referred to. Ref nodes become custom type names.
    pub fn field_type(&mut self, node: &Schema) -> FieldType {
        // Arrays lift their item's ref name; the item itself says Custom
        let is_array = matches!(node.ty, SchemaType::Array { .. });
        if let Some(ref_name) = node.ref_name().filter(|_| !is_array) {
            return FieldType::Custom(self.custom_type_name(ref_name));
        }
        match &node.ty {
            SchemaType::Primitive { kind, .. } => FieldType::Scalar(*kind),
            SchemaType::Array { items } => FieldType::Array(Box::new(self.field_type(items))),
            SchemaType::Object { .. } => FieldType::InlineObject,
            SchemaType::Union { members, .. } => {
                FieldType::Union(members.iter().map(|m| self.field_type(m)).collect())
            }
        }
    }

    /// Declarations for every property of `object`, named within `owner`
    pub fn property_declarations(&mut self, owner: &str, object: &Schema) -> Vec<PropertyDecl> {
        object
            .properties()
            .iter()
            .map(|property| {
                let id = format!("{}.{}", owner, property.name());
                let name = self.property_name(&id, property.display_name(), owner);
                PropertyDecl {
                    source_name: property.name().to_string(),
                    name,
                    field_type: self.field_type(property),
                    is_required: property.is_required(),
                    is_nullable: property.is_nullable(),
                    description: property.meta.description.clone(),
                }
            })
            .collect()
    }
}

// =============================================================================
// Casing
// =============================================================================

/// Split on non-alphanumerics and lower -> upper boundaries, keeping acronyms
/// together (`HTTPServer` -> `HTTP`, `Server`).
fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

/// `order completed` -> `orderCompleted`
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for (i, word) in split_words(s).iter().enumerate() {
        if i == 0 {
            result.push_str(&word.to_lowercase());
        } else {
            result.push_str(&capitalize(word));
        }
    }
    result
}

/// `order completed` -> `OrderCompleted`
pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}
