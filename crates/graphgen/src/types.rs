//! Vendor type mapping.
//!
//! Vendor specs describe parameter types with a small grammar: scalar
//! names, enum type names, object names, and nested `list<...>` /
//! `map<K,V>` containers. Each parsed type knows its Rust rendering and
//! its JSON Schema fragment. Unknown names degrade to free-form values
//! rather than failing the build.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::spec::EnumTable;

#[derive(Debug, Clone, PartialEq)]
pub enum VendorType {
    Str,
    Int,
    UInt,
    Float,
    Bool,
    DateTime,
    /// A named enum from the global table; schemas inline its values.
    Enum(String),
    /// A reference to another spec object, carried as raw JSON.
    ObjectRef(String),
    List(Box<VendorType>),
    Map(Box<VendorType>, Box<VendorType>),
    /// The vendor's untyped `Object` / bare `map`.
    AnyObject,
    /// Anything unrecognized.
    Any,
}

impl VendorType {
    /// Parse a vendor type expression. `enums` and `objects` give the
    /// known names so bare identifiers can be classified.
    pub fn parse(raw: &str, enums: &EnumTable, objects: &BTreeSet<String>) -> VendorType {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix("list<").and_then(|r| r.strip_suffix('>')) {
            return VendorType::List(Box::new(VendorType::parse(inner, enums, objects)));
        }
        if let Some(inner) = raw.strip_prefix("map<").and_then(|r| r.strip_suffix('>')) {
            if let Some((k, v)) = split_top_level(inner) {
                let key = VendorType::parse(k, enums, objects);
                // JSON object keys are strings; container or free-form
                // key types are forced down to string.
                let key = if key.is_scalar() { key } else { VendorType::Str };
                return VendorType::Map(
                    Box::new(key),
                    Box::new(VendorType::parse(v, enums, objects)),
                );
            }
            return VendorType::AnyObject;
        }
        match raw {
            "string" => VendorType::Str,
            "int" | "integer" => VendorType::Int,
            "unsigned int" | "unsigned integer" => VendorType::UInt,
            "float" | "double" => VendorType::Float,
            "bool" | "boolean" => VendorType::Bool,
            "datetime" => VendorType::DateTime,
            "Object" | "object" | "map" => VendorType::AnyObject,
            other if enums.contains(other) => VendorType::Enum(other.to_string()),
            other if objects.contains(other) => VendorType::ObjectRef(other.to_string()),
            _ => VendorType::Any,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            VendorType::Str
                | VendorType::Int
                | VendorType::UInt
                | VendorType::Float
                | VendorType::Bool
                | VendorType::DateTime
                | VendorType::Enum(_)
        )
    }

    /// The Rust type spelled into generated argument structs.
    pub fn rust_type(&self) -> String {
        match self {
            VendorType::Str | VendorType::DateTime | VendorType::Enum(_) => {
                "String".to_string()
            }
            VendorType::Int => "i64".to_string(),
            VendorType::UInt => "u64".to_string(),
            VendorType::Float => "f64".to_string(),
            VendorType::Bool => "bool".to_string(),
            VendorType::List(inner) => {
                if inner.rust_type() == "String" {
                    "Vec<String>".to_string()
                } else {
                    "Vec<serde_json::Value>".to_string()
                }
            }
            VendorType::Map(..)
            | VendorType::ObjectRef(_)
            | VendorType::AnyObject
            | VendorType::Any => "serde_json::Value".to_string(),
        }
    }

    /// The JSON Schema fragment for this type. Enum values inline from
    /// the table so agents see the full value set without a lookup.
    pub fn json_schema(&self, enums: &EnumTable) -> Value {
        match self {
            VendorType::Str => json!({"type": "string"}),
            VendorType::Int | VendorType::UInt => json!({"type": "integer"}),
            VendorType::Float => json!({"type": "number"}),
            VendorType::Bool => json!({"type": "boolean"}),
            VendorType::DateTime => json!({"type": "string", "format": "date-time"}),
            VendorType::Enum(name) => match enums.get(name) {
                Some(spec) => json!({"type": "string", "enum": spec.values}),
                None => json!({"type": "string"}),
            },
            VendorType::List(inner) => {
                json!({"type": "array", "items": inner.json_schema(enums)})
            }
            VendorType::Map(..) | VendorType::ObjectRef(_) | VendorType::AnyObject => {
                json!({"type": "object", "additionalProperties": true})
            }
            VendorType::Any => json!({}),
        }
    }
}

/// Split `K,V` at the first comma outside angle brackets.
fn split_top_level(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some((&inner[..i], &inner[i + 1..])),
            _ => {}
        }
    }
    None
}
