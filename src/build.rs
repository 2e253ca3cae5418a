//! Event Compilation
//!
//! Runs the full pipeline for one event schema:
//! 1. Validate every `$ref` and reject cycles
//! 2. Resolve `$defs` into a [`TypeRegistry`]
//! 3. Parse the event into the AST
//! 4. Project the properties and traits payloads
//!
//! A [`Build`] collects compiled events and hands out one fresh
//! [`GeneratorClient`] per target language.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::codegen::{GeneratorClient, Language};
use crate::config::TyperConfig;
use crate::error::Result;
use crate::parser::{parse, properties_schema, traits_schema};
use crate::resolver::{CustomTypeResolver, TypeRegistry};
use crate::schema::{Schema, SchemaType};

/// One event, ready for emitters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledEvent {
    /// Title of the event, or the label it was compiled under
    pub label: String,
    /// The whole event schema
    pub schema: Schema,
    /// Payload of track, page and screen calls
    pub properties: Schema,
    /// Payload of identify and group calls
    pub traits: Schema,
    pub types: TypeRegistry,
}

impl CompiledEvent {
    /// Dereference a ref node through this event's registry
    pub fn resolve_ref(&self, node: &Schema) -> Option<&Schema> {
        self.types.resolve(node)
    }
}

/// Compile one raw event schema. `source_label` is used when it has no title.
pub fn compile_event(raw: &Value, source_label: &str) -> Result<CompiledEvent> {
    let label = raw
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(source_label)
        .to_string();

    let types = CustomTypeResolver::new(raw, label.as_str())?.resolve_all()?;
    let mut schema = parse(raw, None, false)?;
    adopt_registry_defs(&mut schema, &types);
    let properties = properties_schema(&schema);
    let traits = traits_schema(&schema);

    debug!(
        event = %label,
        properties = properties.properties().len(),
        traits = traits.properties().len(),
        custom_types = types.len(),
        "compiled event"
    );

    Ok(CompiledEvent {
        label,
        schema,
        properties,
        traits,
        types,
    })
}

/// Swap the root `$defs` for their registry entries so a custom type has one
/// AST wherever emitters find it.
fn adopt_registry_defs(schema: &mut Schema, types: &TypeRegistry) {
    if let SchemaType::Object { defs, .. } = &mut schema.ty {
        for (id, def) in defs.iter_mut() {
            if let Some(resolved) = types.get(id) {
                *def = resolved.clone();
            }
        }
    }
}

/// Build-scoped context: the compiled events of one tracking plan and the
/// languages to emit them in.
#[derive(Debug, Clone)]
pub struct Build {
    languages: Vec<Language>,
    source_label: String,
    events: Vec<CompiledEvent>,
}

impl Build {
    pub fn new(languages: Vec<Language>, source_label: impl Into<String>) -> Self {
        Self {
            languages,
            source_label: source_label.into(),
            events: Vec::new(),
        }
    }

    pub fn from_config(config: &TyperConfig) -> Self {
        Self::new(
            config.codegen.languages.clone(),
            config.plan.source_label.clone(),
        )
    }

    /// Compile an event into this build.
    ///
    /// `label` overrides the build's source label for untitled schemas.
    pub fn add_event(&mut self, raw: &Value, label: Option<&str>) -> Result<&CompiledEvent> {
        let event = compile_event(raw, label.unwrap_or(&self.source_label))?;
        let index = self.events.len();
        self.events.push(event);
        Ok(&self.events[index])
    }

    pub fn events(&self) -> &[CompiledEvent] {
        &self.events
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// A client with a namer nobody else has touched
    pub fn client(&self, language: Language) -> GeneratorClient<'_> {
        GeneratorClient::for_language(language, &self.events)
    }

    /// One fresh client per configured language
    pub fn clients(&self) -> Vec<GeneratorClient<'_>> {
        info!(
            events = self.events.len(),
            languages = self.languages.len(),
            "starting emission"
        );
        self.languages.iter().map(|l| self.client(*l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use serde_json::json;

    fn identify() -> Value {
        json!({
            "title": "Identify",
            "type": "object",
            "properties": {
                "context": {
                    "type": "object",
                    "properties": {
                        "traits": {
                            "type": "object",
                            "properties": {
                                "email": {"type": "string"},
                                "plan": {"$ref": "#/$defs/Plan"}
                            },
                            "required": ["email"]
                        }
                    }
                }
            },
            "$defs": {"Plan": {"enum": ["free", "pro"]}}
        })
    }

    #[test]
    fn test_compile_event() {
        let event = compile_event(&identify(), "fallback").unwrap();
        assert_eq!(event.label, "Identify");
        assert_eq!(event.traits.properties().len(), 2);
        assert!(event.traits.is_required());
        assert!(event.properties.properties().is_empty());
        assert_eq!(event.types.len(), 1);

        let plan = event.traits.property("plan").unwrap();
        let resolved = event.resolve_ref(plan).unwrap();
        assert_eq!(resolved.enum_values().map(<[_]>::len), Some(2));
        assert_eq!(
            resolved.meta.description.as_deref(),
            Some("Custom type for Identify")
        );
    }

    #[test]
    fn test_untitled_event_uses_label() {
        let raw = json!({
            "type": "object",
            "$defs": {"Flag": {"type": "boolean"}}
        });
        let event = compile_event(&raw, "Feature Flagged").unwrap();
        assert_eq!(event.label, "Feature Flagged");
        assert_eq!(
            event.types.get("Flag").unwrap().meta.description.as_deref(),
            Some("Custom type for Feature Flagged")
        );
    }

    #[test]
    fn test_defs_match_registry_entries() {
        let raw = json!({
            "title": "Moved",
            "type": "object",
            "properties": {
                "properties": {
                    "type": "object",
                    "properties": {"to": {"$ref": "#/$defs/Addr"}}
                }
            },
            "$defs": {"Addr": {"title": "Postal", "type": "object"}}
        });
        let event = compile_event(&raw, "moved").unwrap();
        let registered = event.types.get("Addr").unwrap();
        assert_eq!(registered.name(), "Postal");
        assert_eq!(registered.meta.description.as_deref(), Some("Custom type for Moved"));

        assert_eq!(&event.schema.defs().unwrap()["Addr"], registered);
        assert_eq!(&event.properties.defs().unwrap()["Addr"], registered);
        assert_eq!(&event.traits.defs().unwrap()["Addr"], registered);
    }

    #[test]
    fn test_compile_rejects_bad_refs() {
        let raw = json!({
            "type": "object",
            "properties": {"x": {"$ref": "#/definitions/X"}}
        });
        assert!(matches!(
            compile_event(&raw, "Broken"),
            Err(SchemaError::MalformedReference { .. })
        ));
    }

    #[test]
    fn test_build_clients_are_fresh_per_language() {
        let mut build = Build::new(vec![Language::TypeScript, Language::Kotlin], "plan");
        build.add_event(&identify(), None).unwrap();
        assert_eq!(build.events().len(), 1);

        let mut clients = build.clients();
        assert_eq!(clients.len(), 2);
        for client in clients.iter_mut() {
            assert_eq!(client.type_name("identify", &["Identify"]), "Identify");
        }
        assert_eq!(clients[1].language(), Some(Language::Kotlin));

        // A second pass starts from nothing
        let mut again = build.client(Language::TypeScript);
        assert_eq!(again.type_name("other", &["Identify"]), "Identify");
    }

    #[test]
    fn test_build_from_config() {
        let mut config = TyperConfig::default();
        config.plan.source_label = "Acme".to_string();
        config.codegen.languages = vec![Language::Rust];

        let mut build = Build::from_config(&config);
        let event = build.add_event(&json!({"type": "object"}), None).unwrap();
        assert_eq!(event.label, "Acme");
        assert_eq!(build.languages(), &[Language::Rust]);
    }
}
