//! Catalog emission.
//!
//! Renders a synthesized [`Catalog`] as a single Rust source file. The
//! output is included by the server crate at build time, so everything
//! here must stay deterministic: same catalog in, same bytes out.
//!
//! Each object becomes a module holding one argument struct, one schema
//! function, and one handler per tool, plus a closed `TOOL_NAMES` list
//! and a `tools()` dispatch table. A final `object_scopes()` function
//! stitches the modules together for scope registration.

use std::collections::BTreeSet;

use crate::naming::{enum_const_ident, enum_type_ident, snake_ident};
use crate::schema::{ArgDef, Catalog, ObjectTools, PathKind, ToolDef};
use crate::spec::Method;
use crate::types::VendorType;

/// Render the full catalog source.
pub fn emit_catalog(catalog: &Catalog) -> String {
    let mut out = String::with_capacity(64 * 1024);
    out.push_str("// @generated by graphgen. DO NOT EDIT.\n");
    out.push_str("// Edit the spec files and rebuild instead.\n\n");

    emit_enums(&mut out, catalog);
    for object in &catalog.objects {
        emit_object_module(&mut out, object);
    }
    emit_object_scopes(&mut out, catalog);
    out
}

/// Rust string literal for `s`.
fn lit(s: &str) -> String {
    format!("{:?}", s)
}

/// Serde-visible name of a generated struct field (raw prefix stripped).
fn serde_name(rust_name: &str) -> &str {
    rust_name.strip_prefix("r#").unwrap_or(rust_name)
}

/// How a vendor type lands in a generated struct and in request
/// assembly. Collapses the type grammar to the handful of shapes the
/// templates below know how to move onto the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ArgShape {
    Text,
    Number,
    Flag,
    TextList,
    JsonList,
    Json,
}

fn arg_shape(ty: &VendorType) -> ArgShape {
    match ty.rust_type().as_str() {
        "String" => ArgShape::Text,
        "i64" | "u64" | "f64" => ArgShape::Number,
        "bool" => ArgShape::Flag,
        "Vec<String>" => ArgShape::TextList,
        "Vec<serde_json::Value>" => ArgShape::JsonList,
        _ => ArgShape::Json,
    }
}

fn rust_field_type(arg: &ArgDef) -> String {
    let shape = arg_shape(&arg.ty);
    let base = match shape {
        ArgShape::Json => "Value".to_string(),
        ArgShape::JsonList => "Vec<Value>".to_string(),
        _ => arg.ty.rust_type(),
    };
    match shape {
        ArgShape::TextList | ArgShape::JsonList => base,
        _ if arg.required => base,
        _ => format!("Option<{}>", base),
    }
}

fn emit_enums(out: &mut String, catalog: &Catalog) {
    if catalog.enums.is_empty() {
        return;
    }
    out.push_str("/// String constants for every vendor enum type.\n");
    out.push_str("pub mod enums {\n");
    let mut used_modules = BTreeSet::new();
    for spec in catalog.enums.iter() {
        let mut module = snake_ident(&enum_type_ident(&spec.name));
        while !used_modules.insert(module.clone()) {
            module.push('_');
        }
        out.push_str(&format!("    pub mod {} {{\n", module));
        let mut used_consts = BTreeSet::new();
        for value in &spec.values {
            let const_name = enum_const_ident(value);
            if !used_consts.insert(const_name.clone()) {
                continue;
            }
            out.push_str(&format!(
                "        pub const {}: &str = {};\n",
                const_name,
                lit(value)
            ));
        }
        out.push_str("    }\n");
    }
    out.push_str("}\n\n");
}

fn emit_object_module(out: &mut String, object: &ObjectTools) {
    let has_get = object.tools.iter().any(|t| t.method == Method::Get);
    let has_post = object.tools.iter().any(|t| t.method == Method::Post);

    out.push_str(&format!("/// Tools generated from the {} spec.\n", object.object));
    out.push_str(&format!("pub mod {} {{\n", object.module));
    out.push_str("    use std::sync::Arc;\n\n");
    out.push_str("    use serde::{Deserialize, Serialize};\n");
    if has_post {
        out.push_str("    use serde_json::{json, Map, Value};\n");
    } else {
        out.push_str("    use serde_json::{json, Value};\n");
    }
    out.push_str("    use tokio_util::sync::CancellationToken;\n\n");
    out.push_str("    use fbgraph::GraphClient;\n\n");
    if has_get {
        out.push_str("    use crate::tools::{bind_args, raw_response, render_extra, GeneratedTool, HandlerResult};\n\n");
    } else {
        out.push_str("    use crate::tools::{bind_args, raw_response, GeneratedTool, HandlerResult};\n\n");
    }

    out.push_str(&format!(
        "    /// Fields the {} object exposes for `fields` selection.\n",
        object.object
    ));
    out.push_str("    pub const FIELDS: &[&str] = &[\n");
    for field in &object.fields {
        out.push_str(&format!("        {},\n", lit(field)));
    }
    out.push_str("    ];\n\n");

    out.push_str("    /// Every tool this module registers, in catalog order.\n");
    out.push_str("    pub const TOOL_NAMES: &[&str] = &[\n");
    for tool in &object.tools {
        out.push_str(&format!("        {},\n", lit(&tool.name)));
    }
    out.push_str("    ];\n\n");

    for tool in &object.tools {
        emit_struct(out, tool);
        emit_schema_fn(out, tool);
        emit_handler(out, tool);
    }

    emit_tools_fn(out, object);
    out.push_str("}\n\n");
}

fn emit_struct(out: &mut String, tool: &ToolDef) {
    out.push_str("    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
    if tool.method != Method::Get {
        out.push_str("    #[serde(deny_unknown_fields)]\n");
    }
    out.push_str(&format!("    pub struct {} {{\n", tool.struct_name));
    if tool.id_bearing {
        out.push_str("        pub id: String,\n");
    }
    for arg in &tool.args {
        if serde_name(&arg.rust_name) != arg.vendor_name {
            out.push_str(&format!(
                "        #[serde(rename = {})]\n",
                lit(&arg.vendor_name)
            ));
        }
        let shape = arg_shape(&arg.ty);
        match shape {
            ArgShape::TextList | ArgShape::JsonList => {
                out.push_str(
                    "        #[serde(default, skip_serializing_if = \"Vec::is_empty\")]\n",
                );
            }
            _ if !arg.required => {
                out.push_str(
                    "        #[serde(default, skip_serializing_if = \"Option::is_none\")]\n",
                );
            }
            _ => {}
        }
        out.push_str(&format!(
            "        pub {}: {},\n",
            arg.rust_name,
            rust_field_type(arg)
        ));
    }
    if tool.method == Method::Get {
        out.push_str("        #[serde(flatten)]\n");
        out.push_str(
            "        pub extra: std::collections::BTreeMap<String, serde_json::Value>,\n",
        );
    }
    out.push_str("    }\n\n");
}

fn emit_schema_fn(out: &mut String, tool: &ToolDef) {
    let pretty = serde_json::to_string_pretty(&tool.schema)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('\n', "\n        ");
    out.push_str(&format!("    pub fn {}_schema() -> Value {{\n", tool.name));
    out.push_str(&format!("        json!({})\n", pretty));
    out.push_str("    }\n\n");
}

fn emit_handler(out: &mut String, tool: &ToolDef) {
    out.push_str(&format!("    pub async fn {}(\n", tool.name));
    out.push_str("        client: Arc<GraphClient>,\n");
    out.push_str("        args: Value,\n");
    out.push_str("        cancel: CancellationToken,\n");
    out.push_str("    ) -> HandlerResult {\n");
    out.push_str(&format!(
        "        let args: {} = bind_args(args)?;\n",
        tool.struct_name
    ));
    match &tool.path {
        PathKind::Id => {
            out.push_str("        let path = format!(\"/{}\", args.id);\n");
        }
        PathKind::IdSuffix(suffix) => {
            out.push_str(&format!(
                "        let path = format!(\"/{{}}/{}\", args.id);\n",
                suffix
            ));
        }
        PathKind::Fixed(path) => {
            out.push_str(&format!("        let path = {}.to_string();\n", lit(path)));
        }
    }
    match tool.method {
        Method::Get => {
            emit_query_assembly(out, tool, true);
            out.push_str("        let body = client.get(&path, &query, &cancel).await?;\n");
            out.push_str("        Ok(raw_response(&body))\n");
        }
        Method::Delete => {
            emit_query_assembly(out, tool, false);
            out.push_str("        let body = client.delete(&path, &query, &cancel).await?;\n");
            out.push_str("        Ok(raw_response(&body))\n");
        }
        Method::Post => {
            emit_body_assembly(out, tool);
            out.push_str(
                "        let body = client.post_json(&path, &Value::Object(params), &cancel).await?;\n",
            );
            out.push_str("        Ok(raw_response(&body))\n");
        }
    }
    out.push_str("    }\n\n");
}

fn emit_query_assembly(out: &mut String, tool: &ToolDef, with_extra: bool) {
    let mutated = !tool.args.is_empty() || with_extra;
    if mutated {
        out.push_str("        let mut query: Vec<(String, String)> = Vec::new();\n");
    } else {
        out.push_str("        let query: Vec<(String, String)> = Vec::new();\n");
    }
    for arg in &tool.args {
        let field = format!("args.{}", arg.rust_name);
        let key = lit(&arg.vendor_name);
        match (arg_shape(&arg.ty), arg.required) {
            (ArgShape::Text, true) => {
                out.push_str(&format!(
                    "        query.push(({}.to_string(), {}.clone()));\n",
                    key, field
                ));
            }
            (ArgShape::Text, false) => {
                out.push_str(&format!(
                    "        if let Some(value) = &{} {{\n            query.push(({}.to_string(), value.clone()));\n        }}\n",
                    field, key
                ));
            }
            (ArgShape::Number, true) | (ArgShape::Flag, true) => {
                out.push_str(&format!(
                    "        query.push(({}.to_string(), {}.to_string()));\n",
                    key, field
                ));
            }
            (ArgShape::Number, false) | (ArgShape::Flag, false) => {
                out.push_str(&format!(
                    "        if let Some(value) = {} {{\n            query.push(({}.to_string(), value.to_string()));\n        }}\n",
                    field, key
                ));
            }
            (ArgShape::TextList, _) => {
                out.push_str(&format!(
                    "        if !{field}.is_empty() {{\n            query.push(({key}.to_string(), {field}.join(\",\")));\n        }}\n",
                    field = field,
                    key = key
                ));
            }
            (ArgShape::JsonList, _) => {
                out.push_str(&format!(
                    "        if !{field}.is_empty() {{\n            query.push(({key}.to_string(), Value::Array({field}.clone()).to_string()));\n        }}\n",
                    field = field,
                    key = key
                ));
            }
            (ArgShape::Json, true) => {
                out.push_str(&format!(
                    "        query.push(({}.to_string(), {}.to_string()));\n",
                    key, field
                ));
            }
            (ArgShape::Json, false) => {
                out.push_str(&format!(
                    "        if let Some(value) = &{} {{\n            query.push(({}.to_string(), value.to_string()));\n        }}\n",
                    field, key
                ));
            }
        }
    }
    if with_extra {
        out.push_str("        for (key, value) in &args.extra {\n");
        out.push_str("            query.push((key.clone(), render_extra(value)));\n");
        out.push_str("        }\n");
    }
}

fn emit_body_assembly(out: &mut String, tool: &ToolDef) {
    if tool.args.is_empty() {
        out.push_str("        let params = Map::new();\n");
        return;
    }
    out.push_str("        let mut params = Map::new();\n");
    for arg in &tool.args {
        let field = format!("args.{}", arg.rust_name);
        let key = lit(&arg.vendor_name);
        match (arg_shape(&arg.ty), arg.required) {
            (ArgShape::Json, true) => {
                out.push_str(&format!(
                    "        params.insert({}.to_string(), {}.clone());\n",
                    key, field
                ));
            }
            (ArgShape::Json, false) => {
                out.push_str(&format!(
                    "        if let Some(value) = &{} {{\n            params.insert({}.to_string(), value.clone());\n        }}\n",
                    field, key
                ));
            }
            (ArgShape::TextList, _) | (ArgShape::JsonList, _) => {
                out.push_str(&format!(
                    "        if !{field}.is_empty() {{\n            params.insert({key}.to_string(), json!({field}));\n        }}\n",
                    field = field,
                    key = key
                ));
            }
            (_, true) => {
                out.push_str(&format!(
                    "        params.insert({}.to_string(), json!({}));\n",
                    key, field
                ));
            }
            (_, false) => {
                out.push_str(&format!(
                    "        if let Some(value) = &{} {{\n            params.insert({}.to_string(), json!(value));\n        }}\n",
                    field, key
                ));
            }
        }
    }
}

fn emit_tools_fn(out: &mut String, object: &ObjectTools) {
    out.push_str("    /// Handler table for this object, one entry per tool.\n");
    out.push_str("    pub fn tools() -> Vec<GeneratedTool> {\n");
    out.push_str("        vec![\n");
    for tool in &object.tools {
        out.push_str("            GeneratedTool {\n");
        out.push_str(&format!("                name: {},\n", lit(&tool.name)));
        out.push_str(&format!(
            "                description: {},\n",
            lit(&tool.description)
        ));
        out.push_str(&format!("                schema: {}_schema,\n", tool.name));
        out.push_str(&format!(
            "                handler: |client, args, cancel| Box::pin({}(client, args, cancel)),\n",
            tool.name
        ));
        out.push_str("            },\n");
    }
    out.push_str("        ]\n");
    out.push_str("    }\n");
}

fn emit_object_scopes(out: &mut String, catalog: &Catalog) {
    out.push_str("/// One scope per generated object module.\n");
    out.push_str("pub fn object_scopes() -> Vec<crate::tools::ObjectScope> {\n");
    out.push_str("    vec![\n");
    for object in &catalog.objects {
        out.push_str("        crate::tools::ObjectScope {\n");
        out.push_str(&format!("            name: {},\n", lit(&object.scope)));
        out.push_str(&format!("            fields: {}::FIELDS,\n", object.module));
        out.push_str(&format!(
            "            tool_names: {}::TOOL_NAMES,\n",
            object.module
        ));
        out.push_str(&format!("            tools: {}::tools(),\n", object.module));
        out.push_str("        },\n");
    }
    out.push_str("    ]\n");
    out.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build_catalog;
    use crate::spec::{ApiSpecSet, EndpointSpec, EnumSpec, EnumTable, FieldSpec, ObjectSpec, ParamSpec};

    fn sample_set() -> ApiSpecSet {
        let mut enums = EnumTable::default();
        enums.insert(EnumSpec {
            name: "AdEffectiveStatus".to_string(),
            node: "Ad".to_string(),
            values: vec!["ACTIVE".to_string(), "PAUSED".to_string()],
        });
        ApiSpecSet {
            objects: vec![ObjectSpec {
                name: "AdAccount".to_string(),
                fields: vec![
                    FieldSpec {
                        name: "id".to_string(),
                        vendor_type: "string".to_string(),
                    },
                    FieldSpec {
                        name: "name".to_string(),
                        vendor_type: "string".to_string(),
                    },
                ],
                endpoints: vec![
                    EndpointSpec {
                        method: crate::spec::Method::Get,
                        suffix: "ads".to_string(),
                        return_type: Some("Ad".to_string()),
                        params: vec![ParamSpec {
                            name: "effective_status".to_string(),
                            vendor_type: "list<AdEffectiveStatus>".to_string(),
                            required: false,
                        }],
                    },
                    EndpointSpec {
                        method: crate::spec::Method::Post,
                        suffix: "campaigns".to_string(),
                        return_type: Some("Campaign".to_string()),
                        params: vec![
                            ParamSpec {
                                name: "name".to_string(),
                                vendor_type: "string".to_string(),
                                required: true,
                            },
                            ParamSpec {
                                name: "special_ad_categories".to_string(),
                                vendor_type: "list<string>".to_string(),
                                required: false,
                            },
                        ],
                    },
                    EndpointSpec {
                        method: crate::spec::Method::Delete,
                        suffix: String::new(),
                        return_type: None,
                        params: vec![],
                    },
                ],
            }],
            enums,
        }
    }

    #[test]
    fn test_emission_is_deterministic() {
        let catalog = build_catalog(&sample_set()).unwrap();
        let first = emit_catalog(&catalog);
        let second = emit_catalog(&build_catalog(&sample_set()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_emitted_module_shape() {
        let catalog = build_catalog(&sample_set()).unwrap();
        let code = emit_catalog(&catalog);

        assert!(code.starts_with("// @generated"));
        assert!(code.contains("pub mod ad_account {"));
        assert!(code.contains("pub struct AdAccountListAdsArgs {"));
        assert!(code.contains("pub async fn ad_account_list_ads("));
        assert!(code.contains("pub fn ad_account_list_ads_schema() -> Value {"));
        assert!(code.contains("let path = format!(\"/{}/ads\", args.id);"));
        assert!(code.contains("query.push((key.clone(), render_extra(value)));"));

        // Mutations close their structs; GETs flatten the remainder.
        assert!(code.contains("#[serde(deny_unknown_fields)]\n    pub struct AdAccountCreateCampaignArgs"));
        assert!(code.contains("#[serde(flatten)]"));

        // The create handler posts a JSON body and skips empty lists.
        assert!(code.contains("params.insert(\"name\".to_string(), json!(args.name));"));
        assert!(code.contains("if !args.special_ad_categories.is_empty()"));

        // Delete with no params needs no mutable query.
        assert!(code.contains("let query: Vec<(String, String)> = Vec::new();"));

        assert!(code.contains("pub const TOOL_NAMES: &[&str] = &["));
        assert!(code.contains("\"ad_account_list_ads\","));
        assert!(code.contains("pub fn object_scopes() -> Vec<crate::tools::ObjectScope> {"));
        assert!(code.contains("name: \"adaccount\","));
    }

    #[test]
    fn test_enum_constants_emitted() {
        let catalog = build_catalog(&sample_set()).unwrap();
        let code = emit_catalog(&catalog);
        assert!(code.contains("pub mod enums {"));
        assert!(code.contains("pub mod ad_effective_status {"));
        assert!(code.contains("pub const ACTIVE: &str = \"ACTIVE\";"));
    }

    #[test]
    fn test_schema_function_bodies_are_json_macros() {
        let catalog = build_catalog(&sample_set()).unwrap();
        let code = emit_catalog(&catalog);
        let start = code.find("pub fn ad_account_list_ads_schema").unwrap();
        let body = &code[start..start + 400];
        assert!(body.contains("json!({"));
        assert!(body.contains("\"additionalProperties\": true"));
    }
}
