//! Spec file loading.
//!
//! A specs directory holds one JSON file per Graph object (fields plus
//! endpoints) and a global `enum-types.json` listing every enum type and
//! its values. Object files that fail to parse are logged and skipped so
//! one bad vendor export never blocks the rest of the catalog; a broken
//! enum file is fatal because every schema depends on it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::GenError;

/// File name of the global enum table inside a specs directory.
pub const ENUM_FILE: &str = "enum-types.json";

/// HTTP methods the vendor API uses for tool-shaped endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    fn parse(raw: &str) -> Option<Method> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// One field descriptor from an object spec.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: String,
}

/// One endpoint parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEndpoint {
    method: String,
    endpoint: String,
    #[serde(rename = "return", default)]
    return_type: Option<String>,
    #[serde(default)]
    params: Vec<ParamSpec>,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    #[serde(default)]
    fields: Vec<FieldSpec>,
    #[serde(default)]
    apis: Vec<RawEndpoint>,
}

/// A parsed endpoint. The suffix is the path segment under the object
/// node; an empty suffix addresses the node itself.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub method: Method,
    pub suffix: String,
    pub return_type: Option<String>,
    pub params: Vec<ParamSpec>,
}

/// A parsed object spec. Field and endpoint order is preserved from the
/// input file.
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub endpoints: Vec<EndpointSpec>,
}

/// One vendor enum type with its values, duplicates removed keeping the
/// first occurrence.
#[derive(Debug, Clone, Deserialize)]
pub struct EnumSpec {
    pub name: String,
    #[serde(default)]
    pub node: String,
    pub values: Vec<String>,
}

/// The global enum table, keyed by vendor enum type name.
#[derive(Debug, Clone, Default)]
pub struct EnumTable {
    by_name: BTreeMap<String, EnumSpec>,
}

impl EnumTable {
    pub fn get(&self, name: &str) -> Option<&EnumSpec> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnumSpec> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Insert one enum type. Duplicate values keep their first
    /// occurrence; a repeated type name keeps the earlier entry.
    pub fn insert(&mut self, mut spec: EnumSpec) {
        let mut seen = std::collections::BTreeSet::new();
        spec.values.retain(|v| seen.insert(v.clone()));
        // Later entries for the same type name are ignored.
        self.by_name.entry(spec.name.clone()).or_insert(spec);
    }
}

/// Everything loaded from one specs directory, objects sorted by name.
#[derive(Debug, Clone, Default)]
pub struct ApiSpecSet {
    pub objects: Vec<ObjectSpec>,
    pub enums: EnumTable,
}

impl ApiSpecSet {
    pub fn object_names(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.name.as_str()).collect()
    }
}

/// Load every spec file under `dir` (non-recursive).
pub fn load_dir(dir: &Path) -> Result<ApiSpecSet, GenError> {
    let mut set = ApiSpecSet::default();
    let mut enum_raw: Option<String> = None;

    let mut entries: Vec<_> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| e.into_path())
        .collect();
    entries.sort();

    for path in entries {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let text = std::fs::read_to_string(&path)
            .map_err(|e| GenError::Io(format!("{}: {}", path.display(), e)))?;

        if file_name == ENUM_FILE {
            enum_raw = Some(text);
            continue;
        }

        let object = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        match serde_json::from_str::<RawSpec>(&text) {
            Ok(raw) => set.objects.push(parse_object(object, raw)),
            Err(e) => {
                warn!(file = %file_name, error = %e, "skipping unparseable spec file");
            }
        }
    }

    match enum_raw {
        Some(text) => {
            let raw: Vec<EnumSpec> = serde_json::from_str(&text)
                .map_err(|e| GenError::EnumFile(e.to_string()))?;
            for spec in raw {
                set.enums.insert(spec);
            }
        }
        None => warn!("no {} found, enum fields degrade to plain strings", ENUM_FILE),
    }

    if set.objects.is_empty() {
        return Err(GenError::Spec(format!(
            "no object spec files found under {}",
            dir.display()
        )));
    }
    Ok(set)
}

fn parse_object(name: String, raw: RawSpec) -> ObjectSpec {
    let mut endpoints = Vec::with_capacity(raw.apis.len());
    for api in raw.apis {
        let Some(method) = Method::parse(&api.method) else {
            warn!(object = %name, method = %api.method, "skipping endpoint with unknown method");
            continue;
        };
        endpoints.push(EndpointSpec {
            method,
            suffix: api.endpoint.trim_matches('/').to_string(),
            return_type: api.return_type,
            params: api.params,
        });
    }
    ObjectSpec {
        name,
        fields: raw.fields,
        endpoints,
    }
}
