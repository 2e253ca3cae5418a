//! Schema Parsing
//!
//! Normalizes a raw JSON Schema node into the [`Schema`] AST: type unification,
//! nullability inference, enum extraction and keyword propagation.
//!
//! Parsing is pure. `$ref`s are recorded as `ref_name` and never inlined; checking
//! that they point somewhere is the resolver's job.

use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SchemaError};
use crate::schema::{
    AdvancedKeywords, EnumValue, PathSegment, PrimitiveKind, Schema, SchemaMetadata, SchemaPath,
    SchemaType,
};

static DEFS_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#/\$defs/(.+)$").unwrap());

/// Types accepted in a raw `type` field
const SUPPORTED_TYPES: [&str; 7] = [
    "string", "integer", "number", "boolean", "object", "array", "null",
];

/// Extract `<id>` from a `#/$defs/<id>` pointer. Any other form yields `None`.
pub fn extract_ref_name(reference: &str) -> Option<String> {
    DEFS_REF
        .captures(reference)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a raw JSON Schema into the AST.
///
/// `name` takes precedence over the raw `title`; `is_required` is the caller's
/// knowledge of whether the parent lists this node in `required`.
pub fn parse(raw: &Value, name: Option<&str>, is_required: bool) -> Result<Schema> {
    parse_at(raw, name, is_required, &SchemaPath::root())
}

pub(crate) fn parse_at(
    raw: &Value,
    name: Option<&str>,
    is_required: bool,
    path: &SchemaPath,
) -> Result<Schema> {
    if !raw.is_object() {
        return Err(SchemaError::invalid(path, "expected a schema object"));
    }

    let types = RawTypes::read(raw, path)?;
    let (ty, items_ref) = parse_type_fields(raw, &types, path)?;

    // A node-level $ref wins over one lifted from `items`
    let ref_name = match raw.get("$ref").and_then(Value::as_str) {
        Some(reference) => extract_ref_name(reference),
        None => items_ref,
    };

    let name = name
        .map(str::to_string)
        .or_else(|| raw.get("title").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();

    let meta = SchemaMetadata {
        name,
        identifier_name: None,
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_required,
        is_nullable: is_nullable(raw, &types, path)?,
        ref_name,
        keywords: AdvancedKeywords::deserialize(raw)
            .map_err(|e| SchemaError::invalid(path, e.to_string()))?,
    };

    Ok(Schema::new(meta, ty))
}

// =============================================================================
// Type Normalization
// =============================================================================

/// The raw `type` field, deduplicated in declaration order ("null" included)
struct RawTypes {
    types: Vec<String>,
}

impl RawTypes {
    fn read(raw: &Value, path: &SchemaPath) -> Result<Self> {
        let listed: Vec<&Value> = match raw.get("type") {
            None => Vec::new(),
            Some(Value::Array(list)) => list.iter().collect(),
            Some(single) => vec![single],
        };

        let mut types: Vec<String> = Vec::with_capacity(listed.len());
        for value in listed {
            let Some(name) = value.as_str() else {
                return Err(SchemaError::UnsupportedType {
                    path: path.clone(),
                    type_name: value.to_string(),
                });
            };
            if !SUPPORTED_TYPES.contains(&name) {
                return Err(SchemaError::UnsupportedType {
                    path: path.clone(),
                    type_name: name.to_string(),
                });
            }
            if !types.iter().any(|t| t == name) {
                types.push(name.to_string());
            }
        }

        Ok(Self { types })
    }

    fn has_null(&self) -> bool {
        self.types.iter().any(|t| t == "null")
    }

    fn only_null(&self) -> bool {
        self.types.len() == 1 && self.has_null()
    }

    /// Types that survive normalization (null is modeled as nullability)
    fn retained(&self) -> Vec<&str> {
        self.types
            .iter()
            .map(String::as_str)
            .filter(|t| *t != "null")
            .collect()
    }

    /// Whether the normalized kind is `Any`
    fn is_any(&self) -> bool {
        self.retained().is_empty()
    }
}

/// Fields for a node given its raw types. Returns the shape and, for arrays of
/// `$ref` items, the ref name lifted onto the array node.
fn parse_type_fields(
    raw: &Value,
    types: &RawTypes,
    path: &SchemaPath,
) -> Result<(SchemaType, Option<String>)> {
    let retained = types.retained();
    match retained.as_slice() {
        [] => Ok((primitive_fields(raw, PrimitiveKind::Any, types, path)?, None)),
        [single] => {
            let (ty, items_ref) = fields_for_type(raw, single, types, path)?;
            check_enum_coherence(&ty, path)?;
            Ok((ty, items_ref))
        }
        many => {
            let mut members = Vec::with_capacity(many.len());
            for type_name in many {
                let member_path = path.join(PathSegment::UnionMember(type_name.to_string()));
                let (ty, items_ref) = fields_for_type(raw, type_name, types, &member_path)?;
                let mut member = Schema::anonymous(ty);
                member.meta.ref_name = items_ref;
                members.push(member);
            }
            let enum_values = filter_enum(raw, path)?;
            let ty = SchemaType::Union { members, enum_values };
            check_enum_coherence(&ty, path)?;
            Ok((ty, None))
        }
    }
}

fn fields_for_type(
    raw: &Value,
    type_name: &str,
    types: &RawTypes,
    path: &SchemaPath,
) -> Result<(SchemaType, Option<String>)> {
    let kind = match type_name {
        "object" => return Ok((object_fields(raw, path)?, None)),
        "array" => return array_fields(raw, path),
        "string" => PrimitiveKind::String,
        "integer" => PrimitiveKind::Integer,
        "number" => PrimitiveKind::Number,
        "boolean" => PrimitiveKind::Boolean,
        other => {
            return Err(SchemaError::UnsupportedType {
                path: path.clone(),
                type_name: other.to_string(),
            })
        }
    };
    Ok((primitive_fields(raw, kind, types, path)?, None))
}

fn primitive_fields(
    raw: &Value,
    kind: PrimitiveKind,
    types: &RawTypes,
    path: &SchemaPath,
) -> Result<SchemaType> {
    // `type: "null"` admits exactly one value
    let enum_values = if types.only_null() {
        Some(vec![EnumValue::Null])
    } else {
        filter_enum(raw, path)?
    };
    Ok(SchemaType::Primitive { kind, enum_values })
}

// =============================================================================
// Objects
// =============================================================================

fn object_fields(raw: &Value, path: &SchemaPath) -> Result<SchemaType> {
    let required: HashSet<&str> = raw
        .get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut properties = Vec::new();
    match raw.get("properties") {
        None => {}
        Some(Value::Object(map)) => {
            properties.reserve(map.len());
            for (key, sub) in map {
                if sub.is_boolean() {
                    continue;
                }
                let sub_path = path.join(PathSegment::Property(key.clone()));
                properties.push(parse_at(
                    sub,
                    Some(key),
                    required.contains(key.as_str()),
                    &sub_path,
                )?);
            }
        }
        Some(_) => return Err(SchemaError::invalid(path, "`properties` must be an object")),
    }

    let mut defs = IndexMap::new();
    match raw.get("$defs") {
        None => {}
        Some(Value::Object(map)) => {
            for (id, sub) in map {
                if sub.is_boolean() {
                    continue;
                }
                let sub_path = path.join(PathSegment::Definition(id.clone()));
                defs.insert(id.clone(), parse_at(sub, Some(id), false, &sub_path)?);
            }
        }
        Some(_) => return Err(SchemaError::invalid(path, "`$defs` must be an object")),
    }

    Ok(SchemaType::Object { properties, defs })
}

// =============================================================================
// Arrays
// =============================================================================

fn array_fields(raw: &Value, path: &SchemaPath) -> Result<(SchemaType, Option<String>)> {
    let items_path = path.join(PathSegment::Items);
    let any_items = || SchemaType::Array {
        items: Box::new(Schema::any()),
    };

    match raw.get("items") {
        None | Some(Value::Bool(_)) => Ok((any_items(), None)),
        Some(item @ Value::Object(_)) => single_item(item, &items_path),
        Some(Value::Array(list)) => {
            let schemas: Vec<(usize, &Value)> = list
                .iter()
                .enumerate()
                .filter(|(_, item)| !item.is_boolean())
                .collect();
            match schemas.as_slice() {
                [] => Ok((any_items(), None)),
                [(_, item)] => single_item(item, &items_path),
                many => {
                    // Positional typing is approximated as a union of the entries
                    let mut members = Vec::with_capacity(many.len());
                    for (index, item) in many {
                        let item_path = path.join(PathSegment::TupleItem(*index));
                        members.push(parse_at(item, None, false, &item_path)?);
                    }
                    let items = Schema::anonymous(SchemaType::Union {
                        members,
                        enum_values: None,
                    });
                    Ok((
                        SchemaType::Array {
                            items: Box::new(items),
                        },
                        None,
                    ))
                }
            }
        }
        Some(_) => Err(SchemaError::invalid(
            path,
            "`items` must be a schema or a list of schemas",
        )),
    }
}

fn single_item(item: &Value, path: &SchemaPath) -> Result<(SchemaType, Option<String>)> {
    let ref_name = item
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(extract_ref_name);
    let items = parse_at(&coerce_hybrid(item), None, false, path)?;
    Ok((
        SchemaType::Array {
            items: Box::new(items),
        },
        ref_name,
    ))
}

/// A lone item schema that declares properties without a type is treated as an
/// array/object hybrid. Tuple entries are parsed as written.
fn coerce_hybrid(item: &Value) -> Cow<'_, Value> {
    let has_properties = item
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| !p.is_empty());
    if has_properties && item.get("type").is_none() && item.get("$ref").is_none() {
        let mut coerced = item.clone();
        if let Some(obj) = coerced.as_object_mut() {
            obj.insert("type".to_string(), serde_json::json!(["array", "object"]));
        }
        Cow::Owned(coerced)
    } else {
        Cow::Borrowed(item)
    }
}

// =============================================================================
// Enums & Nullability
// =============================================================================

/// The raw enum list. `const` counts as a one-value enum when `enum` is absent.
fn raw_enum<'a>(raw: &'a Value, path: &SchemaPath) -> Result<Option<Cow<'a, [Value]>>> {
    match raw.get("enum") {
        Some(Value::Array(values)) => Ok(Some(Cow::Borrowed(values.as_slice()))),
        Some(_) => Err(SchemaError::invalid(path, "`enum` must be an array")),
        None => Ok(raw.get("const").map(|c| Cow::Owned(vec![c.clone()]))),
    }
}

/// Keep scalar enum members, dropping objects and arrays and duplicates.
fn filter_enum(raw: &Value, path: &SchemaPath) -> Result<Option<Vec<EnumValue>>> {
    let Some(values) = raw_enum(raw, path)? else {
        return Ok(None);
    };

    let mut kept: Vec<EnumValue> = Vec::with_capacity(values.len());
    let mut dropped = 0usize;
    for value in values.iter() {
        match EnumValue::from_json(value) {
            Some(v) if !kept.contains(&v) => kept.push(v),
            Some(_) => {}
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(%path, dropped, "object and array enum members are not supported; dropped");
    }

    Ok(if kept.is_empty() { None } else { Some(kept) })
}

/// A filtered enum must keep at least one value the node can hold, or `null`.
/// Union enums are checked against the kinds of all members together.
fn check_enum_coherence(ty: &SchemaType, path: &SchemaPath) -> Result<()> {
    let (values, kinds): (&[EnumValue], Vec<PrimitiveKind>) = match ty {
        SchemaType::Primitive {
            kind,
            enum_values: Some(values),
        } => (values.as_slice(), vec![*kind]),
        SchemaType::Union {
            members,
            enum_values: Some(values),
        } => (
            values.as_slice(),
            members.iter().filter_map(Schema::primitive_kind).collect(),
        ),
        _ => return Ok(()),
    };

    let coherent = values
        .iter()
        .any(|v| v.is_null() || kinds.iter().any(|k| k.admits(v)));
    if coherent {
        return Ok(());
    }
    let kinds: Vec<&str> = kinds.iter().map(PrimitiveKind::as_str).collect();
    Err(SchemaError::invalid(
        path,
        format!("no `enum` value fits type {}", kinds.join(" | ")),
    ))
}

/// Null is admissible when the type allows it and any enum lists it.
fn is_nullable(raw: &Value, types: &RawTypes, path: &SchemaPath) -> Result<bool> {
    let type_allows_null = types.has_null() || types.is_any();
    let enum_allows_null = match raw_enum(raw, path)? {
        None => true,
        Some(values) => values
            .iter()
            .any(|v| v.is_null() || v.as_str() == Some("null")),
    };
    Ok(type_allows_null && enum_allows_null)
}

// =============================================================================
// Event Projections
// =============================================================================

/// The `.properties` object of an analytics call, or an empty object.
///
/// Carries the event's name, description and `defs`; required when any of its
/// children is.
pub fn properties_schema(event: &Schema) -> Schema {
    let found = event.property("properties").filter(|p| p.is_object());
    project_event_section(event, found)
}

/// The `.traits` object of an analytics call, falling back to `.context.traits`.
pub fn traits_schema(event: &Schema) -> Schema {
    let found = event
        .property("traits")
        .filter(|p| p.is_object())
        .or_else(|| {
            event
                .property("context")
                .filter(|c| c.is_object())
                .and_then(|c| c.property("traits"))
                .filter(|t| t.is_object())
        });
    project_event_section(event, found)
}

fn project_event_section(event: &Schema, found: Option<&Schema>) -> Schema {
    let defs = match &event.ty {
        SchemaType::Object { defs, .. } => defs.clone(),
        _ => IndexMap::new(),
    };
    let (mut meta, properties) = match found {
        Some(section) => (section.meta.clone(), section.properties().to_vec()),
        None => (SchemaMetadata::default(), Vec::new()),
    };

    meta.name = event.meta.name.clone();
    meta.description = event.meta.description.clone();
    meta.is_nullable = false;

    let mut section = Schema::new(meta, SchemaType::Object { properties, defs });
    section.meta.is_required = section.has_required_property();
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn primitive(schema: &Schema) -> (PrimitiveKind, Option<&[EnumValue]>) {
        match &schema.ty {
            SchemaType::Primitive { kind, enum_values } => (*kind, enum_values.as_deref()),
            other => panic!("Expected Primitive, got {:?}", other),
        }
    }

    fn strings(values: &[&str]) -> Vec<EnumValue> {
        values.iter().map(|v| EnumValue::String(v.to_string())).collect()
    }

    #[test]
    fn test_missing_type_is_nullable_any() {
        let schema = parse(&json!({}), None, false).unwrap();
        assert_eq!(primitive(&schema), (PrimitiveKind::Any, None));
        assert!(schema.meta.is_nullable);
    }

    #[test]
    fn test_null_only_type_is_single_value_enum() {
        let schema = parse(&json!({"type": "null"}), None, false).unwrap();
        assert_eq!(
            primitive(&schema),
            (PrimitiveKind::Any, Some(&[EnumValue::Null][..]))
        );
        assert!(schema.meta.is_nullable);
    }

    #[test]
    fn test_nullable_string() {
        let schema = parse(&json!({"type": ["string", "null"]}), None, false).unwrap();
        assert_eq!(primitive(&schema), (PrimitiveKind::String, None));
        assert!(schema.meta.is_nullable);
    }

    #[test]
    fn test_string_enum_is_not_nullable() {
        let schema = parse(&json!({"type": "string", "enum": ["a", "b"]}), None, false).unwrap();
        let expected = strings(&["a", "b"]);
        assert_eq!(
            primitive(&schema),
            (PrimitiveKind::String, Some(expected.as_slice()))
        );
        assert!(!schema.meta.is_nullable);
    }

    #[test]
    fn test_enum_without_null_removes_any_nullability() {
        let schema = parse(&json!({"enum": [1, 2]}), None, false).unwrap();
        assert_eq!(primitive(&schema).0, PrimitiveKind::Any);
        assert!(!schema.meta.is_nullable);

        let schema = parse(&json!({"enum": ["x", "null"]}), None, false).unwrap();
        assert!(schema.meta.is_nullable);

        let raw = json!({"type": ["string", "null"], "enum": ["x"]});
        let schema = parse(&raw, None, false).unwrap();
        assert!(!schema.meta.is_nullable);
    }

    #[test]
    fn test_typed_field_without_null_is_not_nullable() {
        let schema = parse(&json!({"type": "integer"}), None, false).unwrap();
        assert!(!schema.meta.is_nullable);
    }

    #[test]
    fn test_enum_filtering_drops_objects_and_duplicates() {
        let schema = parse(
            &json!({"enum": ["a", {"x": 1}, [1], 3, true, null, "a"]}),
            None,
            false,
        )
        .unwrap();
        assert_eq!(
            schema.enum_values().unwrap(),
            &[
                EnumValue::String("a".into()),
                EnumValue::Number(3.into()),
                EnumValue::Bool(true),
                EnumValue::Null,
            ]
        );
    }

    #[test]
    fn test_enum_must_fit_the_type() {
        let raw = json!({"type": "string", "enum": [1, 2]});
        let err = parse(&raw, Some("tier"), false).unwrap_err();
        match err {
            SchemaError::InvalidSchema { path, message } => {
                assert_eq!(path.to_string(), "<root>");
                assert!(message.contains("string"));
            }
            other => panic!("Expected InvalidSchema, got {:?}", other),
        }

        let err = parse(
            &json!({"type": "object", "properties": {"size": {"type": "integer", "enum": [1.5]}}}),
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid schema at .size: no `enum` value fits type integer"
        );
    }

    #[test]
    fn test_enum_with_some_fitting_values_is_kept() {
        let schema = parse(&json!({"type": "string", "enum": ["a", 1]}), None, false).unwrap();
        assert_eq!(schema.enum_values().map(<[_]>::len), Some(2));

        let schema = parse(&json!({"type": "integer", "enum": [null]}), None, false).unwrap();
        assert_eq!(schema.enum_values(), Some(&[EnumValue::Null][..]));
    }

    #[test]
    fn test_union_enum_checked_against_all_members() {
        let schema = parse(
            &json!({"type": ["string", "integer"], "enum": [7]}),
            None,
            false,
        )
        .unwrap();
        assert_eq!(schema.enum_values().map(<[_]>::len), Some(1));

        let err = parse(
            &json!({"type": ["string", "integer"], "enum": [true]}),
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_const_is_single_value_enum() {
        let schema = parse(&json!({"type": "string", "const": "track"}), None, false).unwrap();
        let expected = strings(&["track"]);
        assert_eq!(schema.enum_values(), Some(expected.as_slice()));
        assert!(!schema.meta.is_nullable);
    }

    #[test]
    fn test_object_properties_and_required() {
        let schema = parse(
            &json!({
                "type": "object",
                "properties": {"x": {"type": "number"}},
                "required": ["x"]
            }),
            None,
            false,
        )
        .unwrap();
        let props = schema.properties();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name(), "x");
        assert_eq!(primitive(&props[0]).0, PrimitiveKind::Number);
        assert!(props[0].is_required());
    }

    #[test]
    fn test_property_order_is_preserved() {
        let raw: Value = serde_json::from_str(
            r#"{"type": "object", "properties": {"zeta": {}, "alpha": {}, "mid": {}}}"#,
        )
        .unwrap();
        let schema = parse(&raw, None, false).unwrap();
        let names: Vec<&str> = schema.properties().iter().map(Schema::name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_boolean_property_schemas_are_skipped() {
        let schema = parse(
            &json!({"type": "object", "properties": {"a": true, "b": {"type": "string"}}}),
            None,
            false,
        )
        .unwrap();
        let names: Vec<&str> = schema.properties().iter().map(Schema::name).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_union_members_carry_enum() {
        let schema = parse(
            &json!({"type": ["string", "boolean"], "enum": ["yes", "no", true, false]}),
            None,
            false,
        )
        .unwrap();
        match &schema.ty {
            SchemaType::Union { members, enum_values } => {
                assert_eq!(members.len(), 2);
                assert_eq!(members[0].primitive_kind(), Some(PrimitiveKind::String));
                assert_eq!(members[1].primitive_kind(), Some(PrimitiveKind::Boolean));
                assert_eq!(members[0].enum_values().map(<[_]>::len), Some(4));
                assert_eq!(enum_values.as_ref().map(Vec::len), Some(4));
            }
            other => panic!("Expected Union, got {:?}", other),
        }
        assert!(!schema.meta.is_nullable);
    }

    #[test]
    fn test_union_with_null_drops_null_member() {
        let schema = parse(&json!({"type": ["string", "integer", "null"]}), None, false).unwrap();
        match &schema.ty {
            SchemaType::Union { members, .. } => assert_eq!(members.len(), 2),
            other => panic!("Expected Union, got {:?}", other),
        }
        assert!(schema.meta.is_nullable);
    }

    #[test]
    fn test_array_items_default_to_any() {
        let schema = parse(&json!({"type": "array"}), None, false).unwrap();
        match &schema.ty {
            SchemaType::Array { items } => {
                assert_eq!(items.primitive_kind(), Some(PrimitiveKind::Any));
            }
            other => panic!("Expected Array, got {:?}", other),
        }
    }

    #[test]
    fn test_array_of_refs_lifts_ref_name() {
        let schema = parse(
            &json!({"type": "array", "items": {"$ref": "#/$defs/Product"}}),
            Some("products"),
            false,
        )
        .unwrap();
        assert_eq!(schema.ref_name(), Some("Product"));
        match &schema.ty {
            SchemaType::Array { items } => assert_eq!(items.ref_name(), Some("Product")),
            other => panic!("Expected Array, got {:?}", other),
        }
    }

    #[test]
    fn test_untyped_items_with_properties_become_hybrid() {
        let schema = parse(
            &json!({"type": "array", "items": {"properties": {"sku": {"type": "string"}}}}),
            None,
            false,
        )
        .unwrap();
        let SchemaType::Array { items } = &schema.ty else {
            panic!("Expected Array, got {:?}", schema.ty);
        };
        match &items.ty {
            SchemaType::Union { members, .. } => {
                assert_eq!(members[0].kind_label(), "array");
                assert_eq!(members[1].kind_label(), "object");
                assert_eq!(members[1].properties()[0].name(), "sku");
            }
            other => panic!("Expected Union, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_items_become_union() {
        let schema = parse(
            &json!({"type": "array", "items": [{"type": "string"}, {"type": "number"}]}),
            None,
            false,
        )
        .unwrap();
        let SchemaType::Array { items } = &schema.ty else {
            panic!("Expected Array, got {:?}", schema.ty);
        };
        match &items.ty {
            SchemaType::Union { members, .. } => {
                let kinds: Vec<_> = members.iter().map(Schema::primitive_kind).collect();
                assert_eq!(
                    kinds,
                    vec![Some(PrimitiveKind::String), Some(PrimitiveKind::Number)]
                );
            }
            other => panic!("Expected Union, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_entries_are_not_coerced_to_hybrids() {
        let schema = parse(
            &json!({
                "type": "array",
                "items": [
                    {"properties": {"sku": {"type": "string"}}},
                    {"type": "number"}
                ]
            }),
            None,
            false,
        )
        .unwrap();
        let SchemaType::Array { items } = &schema.ty else {
            panic!("Expected Array, got {:?}", schema.ty);
        };
        match &items.ty {
            SchemaType::Union { members, .. } => {
                assert_eq!(members[0].primitive_kind(), Some(PrimitiveKind::Any));
                assert_eq!(members[1].primitive_kind(), Some(PrimitiveKind::Number));
            }
            other => panic!("Expected Union, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_type_is_an_error() {
        let err = parse(
            &json!({"type": "object", "properties": {"when": {"type": "date"}}}),
            None,
            false,
        )
        .unwrap_err();
        match err {
            SchemaError::UnsupportedType { path, type_name } => {
                assert_eq!(type_name, "date");
                assert_eq!(path.to_string(), ".when");
            }
            other => panic!("Expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_metadata_assembly() {
        let schema = parse(
            &json!({
                "title": "Order Completed",
                "description": "Fired at checkout",
                "type": "string",
                "format": "email",
                "maxLength": 64,
                "$ref": "#/$defs/Email"
            }),
            None,
            true,
        )
        .unwrap();
        assert_eq!(schema.name(), "Order Completed");
        assert_eq!(schema.meta.description.as_deref(), Some("Fired at checkout"));
        assert!(schema.is_required());
        assert_eq!(schema.ref_name(), Some("Email"));
        assert_eq!(schema.meta.keywords.format, Some(json!("email")));
        assert_eq!(schema.meta.keywords.max_length, Some(json!(64)));
        assert!(schema.meta.keywords.pattern.is_none());

        let named = parse(&json!({"title": "Ignored"}), Some("explicit"), false).unwrap();
        assert_eq!(named.name(), "explicit");
    }

    #[test]
    fn test_extract_ref_name() {
        assert_eq!(extract_ref_name("#/$defs/Coord"), Some("Coord".to_string()));
        assert_eq!(extract_ref_name("#/definitions/Coord"), None);
        assert_eq!(extract_ref_name("other.json#/$defs/Coord"), None);
        assert_eq!(extract_ref_name("#/$defs/"), None);
    }

    #[test]
    fn test_non_local_ref_yields_no_ref_name() {
        let schema = parse(&json!({"$ref": "#/definitions/Coord"}), None, false).unwrap();
        assert_eq!(schema.ref_name(), None);
    }

    #[test]
    fn test_defs_are_parsed_into_object() {
        let schema = parse(
            &json!({
                "type": "object",
                "properties": {"where": {"$ref": "#/$defs/Coord"}},
                "$defs": {"Coord": {"type": "object", "properties": {"lat": {"type": "number"}}}}
            }),
            None,
            false,
        )
        .unwrap();
        let defs = schema.defs().unwrap();
        assert_eq!(defs["Coord"].name(), "Coord");
        assert_eq!(defs["Coord"].properties()[0].name(), "lat");
        assert_eq!(schema.properties()[0].ref_name(), Some("Coord"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let raw = json!({
            "type": "object",
            "properties": {
                "a": {"type": ["string", "null"]},
                "b": {"type": "array", "items": [{"type": "string"}, {"type": "boolean"}]}
            }
        });
        assert_eq!(parse(&raw, None, false).unwrap(), parse(&raw, None, false).unwrap());
    }

    #[test]
    fn test_properties_schema() {
        let event = parse(
            &json!({
                "title": "Order Completed",
                "description": "Order done",
                "type": "object",
                "properties": {
                    "properties": {
                        "type": "object",
                        "properties": {"total": {"type": "number"}},
                        "required": ["total"]
                    }
                },
                "$defs": {"Money": {"type": "number"}}
            }),
            None,
            false,
        )
        .unwrap();
        let props = properties_schema(&event);
        assert_eq!(props.name(), "Order Completed");
        assert_eq!(props.meta.description.as_deref(), Some("Order done"));
        assert!(props.is_required());
        assert!(!props.is_nullable());
        assert_eq!(props.properties()[0].name(), "total");
        assert!(props.defs().unwrap().contains_key("Money"));
    }

    #[test]
    fn test_properties_schema_defaults_to_empty_object() {
        let event = parse(&json!({"title": "Ping", "type": "object"}), None, false).unwrap();
        let props = properties_schema(&event);
        assert!(props.is_object());
        assert!(props.properties().is_empty());
        assert!(!props.is_required());
    }

    #[test]
    fn test_traits_schema_falls_back_to_context() {
        let event = parse(
            &json!({
                "type": "object",
                "properties": {
                    "context": {
                        "type": "object",
                        "properties": {
                            "traits": {
                                "type": "object",
                                "properties": {"email": {"type": "string"}}
                            }
                        }
                    }
                }
            }),
            Some("Identify"),
            false,
        )
        .unwrap();
        let traits = traits_schema(&event);
        assert_eq!(traits.name(), "Identify");
        assert_eq!(traits.properties()[0].name(), "email");
        assert!(!traits.is_required());
    }
}
