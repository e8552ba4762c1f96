//! Tool synthesis.
//!
//! Turns parsed object specs into tool definitions: the wire-visible tool
//! name, its input JSON Schema, and the request shape (method, path,
//! arguments) the emitted handler needs. Naming here is a compatibility
//! surface; agents address tools by these strings.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::naming::{field_ident, pascal_ident, rust_field_ident, snake_ident};
use crate::spec::{ApiSpecSet, EndpointSpec, EnumTable, Method, ObjectSpec};
use crate::types::VendorType;
use crate::GenError;

/// Hard cap on generated description length.
pub const MAX_DESCRIPTION_LEN: usize = 200;

const ID_PATTERN: &str = "^[0-9]+$";

/// The full synthesized catalog, ready for emission.
#[derive(Debug)]
pub struct Catalog {
    pub objects: Vec<ObjectTools>,
    pub enums: EnumTable,
}

/// All tools generated from one object spec file.
#[derive(Debug)]
pub struct ObjectTools {
    /// Vendor object name, e.g. `AdAccount`.
    pub object: String,
    /// Generated module name, e.g. `ad_account`.
    pub module: String,
    /// Scope name agents toggle, e.g. `adaccount`.
    pub scope: String,
    /// Field names the object exposes, for `fields` selection.
    pub fields: Vec<String>,
    pub tools: Vec<ToolDef>,
}

/// How the handler builds the request path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathKind {
    /// `/{id}`
    Id,
    /// `/{id}/{suffix}`
    IdSuffix(String),
    /// A fixed path such as `/me`.
    Fixed(String),
}

#[derive(Debug)]
pub struct ToolDef {
    pub name: String,
    /// Argument struct name, e.g. `AdAccountListAdsArgs`.
    pub struct_name: String,
    pub description: String,
    pub method: Method,
    pub path: PathKind,
    pub id_bearing: bool,
    /// Declared parameters plus injected pagination; `id` is separate.
    pub args: Vec<ArgDef>,
    pub schema: Value,
}

#[derive(Debug)]
pub struct ArgDef {
    pub vendor_name: String,
    pub rust_name: String,
    pub ty: VendorType,
    pub required: bool,
    pub pagination: bool,
}

/// Build the catalog from loaded specs. Fails on tool-name collisions;
/// everything else degrades per-type.
pub fn build_catalog(specs: &ApiSpecSet) -> Result<Catalog, GenError> {
    let objects: BTreeSet<String> = specs.objects.iter().map(|o| o.name.clone()).collect();
    let mut seen_names = BTreeSet::new();
    let mut out = Vec::with_capacity(specs.objects.len());

    for object in &specs.objects {
        let mut tools = Vec::with_capacity(object.endpoints.len());
        for endpoint in &object.endpoints {
            let tool = build_tool(object, endpoint, &specs.enums, &objects);
            if !seen_names.insert(tool.name.clone()) {
                return Err(GenError::NameCollision(tool.name));
            }
            tools.push(tool);
        }
        out.push(ObjectTools {
            module: snake_ident(&object.name),
            scope: object.name.to_lowercase(),
            fields: object.fields.iter().map(|f| f.name.clone()).collect(),
            object: object.name.clone(),
            tools,
        });
    }

    Ok(Catalog {
        objects: out,
        enums: specs.enums.clone(),
    })
}

fn build_tool(
    object: &ObjectSpec,
    endpoint: &EndpointSpec,
    enums: &EnumTable,
    objects: &BTreeSet<String>,
) -> ToolDef {
    let suffix = suffix_ident(&endpoint.suffix);
    let id_bearing = is_id_bearing(&object.name, endpoint.method, &suffix);
    let name = format!(
        "{}_{}",
        snake_ident(&object.name),
        verb(endpoint.method, &suffix)
    );
    let path = if id_bearing {
        if suffix.is_empty() {
            PathKind::Id
        } else {
            PathKind::IdSuffix(endpoint.suffix.clone())
        }
    } else if suffix.is_empty() {
        PathKind::Fixed("/me".to_string())
    } else {
        PathKind::Fixed(format!("/{}", endpoint.suffix))
    };

    let mut used: BTreeSet<String> = ["id", "extra"].iter().map(|s| s.to_string()).collect();
    let mut args = Vec::with_capacity(endpoint.params.len() + 4);
    for param in &endpoint.params {
        let mut rust_name = rust_field_ident(&param.name);
        while !used.insert(rust_name.clone()) {
            rust_name.push('_');
        }
        args.push(ArgDef {
            vendor_name: param.name.clone(),
            rust_name,
            ty: VendorType::parse(&param.vendor_type, enums, objects),
            required: param.required,
            pagination: false,
        });
    }

    if endpoint.method == Method::Get {
        let pagination: [(&str, VendorType); 4] = [
            ("fields", VendorType::List(Box::new(VendorType::Str))),
            ("limit", VendorType::Int),
            ("after", VendorType::Str),
            ("before", VendorType::Str),
        ];
        for (vendor_name, ty) in pagination {
            if args.iter().any(|a| a.vendor_name == vendor_name) {
                continue;
            }
            let mut rust_name = rust_field_ident(vendor_name);
            while !used.insert(rust_name.clone()) {
                rust_name.push('_');
            }
            args.push(ArgDef {
                vendor_name: vendor_name.to_string(),
                rust_name,
                ty,
                required: false,
                pagination: true,
            });
        }
    }

    let schema = input_schema(&object.name, endpoint.method, id_bearing, &args, enums);

    let mut required_names = Vec::new();
    if id_bearing {
        required_names.push("id".to_string());
    }
    required_names.extend(args.iter().filter(|a| a.required).map(|a| a.vendor_name.clone()));
    let description = tool_description(
        &object.name,
        endpoint.method,
        &suffix,
        &path,
        endpoint.return_type.as_deref(),
        &required_names,
    );

    ToolDef {
        struct_name: format!("{}Args", pascal_ident(&name)),
        name,
        description,
        method: endpoint.method,
        path,
        id_bearing,
        args,
        schema,
    }
}

/// Endpoints that address a whole collection rather than a node never
/// take an `id`: search endpoints, and the User self lookup which the
/// gateway resolves to `/me`.
fn is_id_bearing(object: &str, method: Method, suffix: &str) -> bool {
    if suffix == "search" || suffix.ends_with("_search") {
        return false;
    }
    !(object == "User" && method == Method::Get && suffix.is_empty())
}

fn verb(method: Method, suffix: &str) -> String {
    match (method, suffix.is_empty()) {
        (Method::Get, true) => "get".to_string(),
        (Method::Get, false) => format!("list_{}", suffix),
        (Method::Post, true) => "update".to_string(),
        (Method::Post, false) => format!("create_{}", singular(suffix)),
        (Method::Delete, true) => "delete".to_string(),
        (Method::Delete, false) => format!("delete_{}", suffix),
    }
}

/// One trailing `s` comes off for create verbs. Irregular plurals keep
/// the result (`businesses` -> `businesse`); published tool names carry
/// this form.
fn singular(suffix: &str) -> &str {
    suffix.strip_suffix('s').unwrap_or(suffix)
}

fn suffix_ident(suffix: &str) -> String {
    suffix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn input_schema(
    object: &str,
    method: Method,
    id_bearing: bool,
    args: &[ArgDef],
    enums: &EnumTable,
) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    if id_bearing {
        properties.insert(
            "id".to_string(),
            json!({
                "type": "string",
                "pattern": ID_PATTERN,
                "description": format!("ID of the {}", object),
            }),
        );
        required.push("id".to_string());
    }

    for arg in args {
        let mut fragment = arg.ty.json_schema(enums);
        if let Value::Object(map) = &mut fragment {
            map.insert(
                "description".to_string(),
                json!(clamp(param_description(object, arg))),
            );
            if id_like(&arg.vendor_name)
                && map.get("type") == Some(&json!("string"))
            {
                map.insert("pattern".to_string(), json!(ID_PATTERN));
            }
            if arg.pagination && arg.vendor_name == "limit" {
                map.insert("minimum".to_string(), json!(1));
                map.insert("maximum".to_string(), json!(100));
            }
        }
        properties.insert(arg.vendor_name.clone(), fragment);
        if arg.required {
            required.push(arg.vendor_name.clone());
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": method == Method::Get,
    })
}

fn id_like(name: &str) -> bool {
    name == "id" || name.ends_with("_id")
}

fn param_description(object: &str, arg: &ArgDef) -> String {
    if arg.pagination {
        return match arg.vendor_name.as_str() {
            "fields" => "Fields to include in the response".to_string(),
            "limit" => "Maximum number of results per page (1-100)".to_string(),
            "after" => "Pagination cursor for the next page".to_string(),
            "before" => "Pagination cursor for the previous page".to_string(),
            other => humanize(other),
        };
    }
    match arg.vendor_name.as_str() {
        "name" => format!("Name of the {}", object),
        "status" => format!("Current status of the {}", object),
        n if id_like(n) => format!("ID of the {}", field_ident(n.trim_end_matches("_id"))),
        n if arg.ty == VendorType::DateTime => {
            format!("{} (ISO 8601 date-time)", humanize(n))
        }
        n => humanize(n),
    }
}

fn humanize(name: &str) -> String {
    let spaced = name.replace(['_', '.'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

fn tool_description(
    object: &str,
    method: Method,
    suffix: &str,
    path: &PathKind,
    return_type: Option<&str>,
    required: &[String],
) -> String {
    let mut out = match (method, suffix.is_empty()) {
        (Method::Get, true) => {
            if *path == PathKind::Fixed("/me".to_string()) {
                "Fetches the profile of the current user.".to_string()
            } else {
                format!("Fetches details of a {}.", object)
            }
        }
        (Method::Get, false) => format!("Lists {} under a {}.", suffix, object),
        (Method::Post, true) => format!("Updates a {}.", object),
        (Method::Post, false) => {
            format!("Creates a new {} under a {}.", singular(suffix), object)
        }
        (Method::Delete, true) => format!("Deletes a {}.", object),
        (Method::Delete, false) => format!("Removes {} from a {}.", suffix, object),
    };
    if let Some(ret) = return_type {
        out.push_str(&format!(" Returns {}.", ret));
    }
    if !required.is_empty() {
        out.push_str(&format!(" Required: {}.", required.join(", ")));
    }
    clamp(out)
}

fn clamp(text: String) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_LEN {
        return text;
    }
    let truncated: String = text.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
    format!("{}...", truncated)
}
