//! Schema AST
//!
//! The canonical, language-agnostic tree produced from a tracking-plan JSON Schema.
//! Emitters only ever see these types, never the raw JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

// =============================================================================
// Primitive Kinds
// =============================================================================

/// Scalar kind of a primitive node. `Any` stands for "no usable type information".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Any,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Any => "any",
        }
    }

    /// Whether `value` is a member this kind can hold. `null` is never admitted here;
    /// nullability is tracked separately.
    pub fn admits(&self, value: &EnumValue) -> bool {
        match (self, value) {
            (PrimitiveKind::Any, _) => true,
            (_, EnumValue::Null) => false,
            (PrimitiveKind::String, EnumValue::String(_)) => true,
            (PrimitiveKind::Boolean, EnumValue::Bool(_)) => true,
            (PrimitiveKind::Number, EnumValue::Number(_)) => true,
            (PrimitiveKind::Integer, EnumValue::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        }
    }
}

// =============================================================================
// Enum Values
// =============================================================================

/// A single allowed value of an enum. Objects and arrays are never enum members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl EnumValue {
    /// Convert a raw JSON value, rejecting objects and arrays.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(EnumValue::Null),
            Value::Bool(b) => Some(EnumValue::Bool(*b)),
            Value::Number(n) => Some(EnumValue::Number(n.clone())),
            Value::String(s) => Some(EnumValue::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, EnumValue::Null)
    }
}

// =============================================================================
// Advanced Keywords
// =============================================================================

/// JSON Schema keywords that are carried through verbatim for emitters that can
/// express them (validation annotations, doc comments).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedKeywords {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<Value>,
}

// =============================================================================
// Metadata
// =============================================================================

/// Data every node carries regardless of its shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMetadata {
    /// Source property key (empty for anonymous nodes and the root without a title)
    #[serde(default)]
    pub name: String,

    /// Generator-facing naming hint, independent of `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_required: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_nullable: bool,

    /// Id of the custom type this node stands in for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,

    #[serde(flatten)]
    pub keywords: AdvancedKeywords,
}

// =============================================================================
// Schema Node
// =============================================================================

/// Shape of a node. The variant decides which fields exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaType {
    Primitive {
        kind: PrimitiveKind,
        #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<EnumValue>>,
    },
    Array {
        items: Box<Schema>,
    },
    Object {
        properties: Vec<Schema>,
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        defs: IndexMap<String, Schema>,
    },
    Union {
        members: Vec<Schema>,
        #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<EnumValue>>,
    },
}

/// One node of the AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(flatten)]
    pub meta: SchemaMetadata,
    #[serde(flatten)]
    pub ty: SchemaType,
}

impl Schema {
    pub fn new(meta: SchemaMetadata, ty: SchemaType) -> Self {
        Self { meta, ty }
    }

    /// An anonymous node of the given shape with default metadata
    pub fn anonymous(ty: SchemaType) -> Self {
        Self::new(SchemaMetadata::default(), ty)
    }

    /// Unconstrained `Any` node without metadata
    pub fn any() -> Self {
        Self::anonymous(SchemaType::Primitive {
            kind: PrimitiveKind::Any,
            enum_values: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The identifier hint if one was set, else the source name
    pub fn display_name(&self) -> &str {
        self.meta.identifier_name.as_deref().unwrap_or(&self.meta.name)
    }

    pub fn ref_name(&self) -> Option<&str> {
        self.meta.ref_name.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.meta.is_required
    }

    pub fn is_nullable(&self) -> bool {
        self.meta.is_nullable
    }

    pub fn is_object(&self) -> bool {
        matches!(self.ty, SchemaType::Object { .. })
    }

    /// Primitive kind, `None` for arrays, objects and unions
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match &self.ty {
            SchemaType::Primitive { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Object properties (empty for every other shape)
    pub fn properties(&self) -> &[Schema] {
        match &self.ty {
            SchemaType::Object { properties, .. } => properties,
            _ => &[],
        }
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties().iter().find(|p| p.meta.name == name)
    }

    pub fn defs(&self) -> Option<&IndexMap<String, Schema>> {
        match &self.ty {
            SchemaType::Object { defs, .. } if !defs.is_empty() => Some(defs),
            _ => None,
        }
    }

    pub fn enum_values(&self) -> Option<&[EnumValue]> {
        match &self.ty {
            SchemaType::Primitive { enum_values, .. } | SchemaType::Union { enum_values, .. } => {
                enum_values.as_deref()
            }
            _ => None,
        }
    }

    pub fn has_required_property(&self) -> bool {
        self.properties().iter().any(|p| p.meta.is_required)
    }

    /// Short shape label for diagnostics
    pub fn kind_label(&self) -> &'static str {
        match &self.ty {
            SchemaType::Primitive { kind, .. } => kind.as_str(),
            SchemaType::Array { .. } => "array",
            SchemaType::Object { .. } => "object",
            SchemaType::Union { .. } => "union",
        }
    }

    /// Structural equality that ignores this node's own `name` and `is_required`,
    /// which depend on where the node is used rather than what it is.
    pub fn same_shape(&self, other: &Schema) -> bool {
        let strip = |s: &Schema| {
            let mut s = s.clone();
            s.meta.name.clear();
            s.meta.is_required = false;
            s
        };
        strip(self) == strip(other)
    }

    /// Pre-order walk over this node and every node below it
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Schema)) {
        f(self);
        match &self.ty {
            SchemaType::Primitive { .. } => {}
            SchemaType::Array { items } => items.visit(f),
            SchemaType::Object { properties, defs } => {
                for p in properties {
                    p.visit(f);
                }
                for d in defs.values() {
                    d.visit(f);
                }
            }
            SchemaType::Union { members, .. } => {
                for m in members {
                    m.visit(f);
                }
            }
        }
    }

    /// Ids of every custom type referenced at or below this node, first use first
    pub fn referenced_types(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        self.visit(&mut |node| {
            if let Some(r) = node.ref_name() {
                if !refs.contains(&r) {
                    refs.push(r);
                }
            }
        });
        refs
    }
}

// =============================================================================
// Schema Path
// =============================================================================

/// A segment of a location inside a raw schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// A named property of an object
    Property(String),
    /// The single `items` schema of an array
    Items,
    /// One entry of a tuple-style `items` list
    TupleItem(usize),
    /// An entry of `$defs`
    Definition(String),
    /// One arm of a multi-type node
    UnionMember(String),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Property(name) => write!(f, ".{}", name),
            Self::Items => write!(f, "[]"),
            Self::TupleItem(i) => write!(f, "[{}]", i),
            Self::Definition(id) => write!(f, "<$defs:{}>", id),
            Self::UnionMember(ty) => write!(f, "<{}>", ty),
        }
    }
}

/// Location of a node, used to point users at the offending part of their schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaPath(Vec<PathSegment>);

impl SchemaPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn join(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl std::fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
