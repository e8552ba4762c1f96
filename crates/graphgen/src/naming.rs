//! Name mangling.
//!
//! Vendor field names, enum type names, and enum values arrive with dots,
//! digits, punctuation, and inconsistent casing. These functions turn them
//! into stable identifiers. All of them are pure, total, and idempotent;
//! renames here ripple through every generated schema and tool name, so
//! the rules only ever grow.

/// Acronyms normalized in field identifiers. Longest-prefix entries come
/// first so `Https` never ends up as `HTTPs`.
const ACRONYMS: &[(&str, &str)] = &[
    ("Https", "HTTPS"),
    ("Http", "HTTP"),
    ("Id", "ID"),
    ("Url", "URL"),
    ("Api", "API"),
    ("Ios", "IOS"),
];

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const",
    "continue", "do", "dyn", "else", "enum", "extern", "false", "final",
    "fn", "for", "if", "impl", "in", "let", "loop", "macro", "match",
    "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

fn title_concat(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for piece in name.replace('.', "_").split('_') {
        let mut chars = piece.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// CamelCase identifier for a vendor field name.
///
/// Dots become separators, each piece is title-cased and concatenated,
/// digit-leading results get an `F` prefix, and known acronyms are
/// normalized (`page_id` -> `PageID`, `image_url` -> `ImageURL`).
pub fn field_ident(name: &str) -> String {
    let mut out = title_concat(name);
    if out.is_empty() {
        return "Field".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'F');
    }
    for (from, to) in ACRONYMS {
        out = out.replace(from, to);
    }
    out
}

/// CamelCase identifier for a vendor enum type name. Same pieces as
/// [`field_ident`] but without the acronym pass, so generated enum module
/// names match the vendor spelling closely.
pub fn enum_type_ident(name: &str) -> String {
    let mut out = title_concat(name);
    if out.is_empty() {
        return "UnknownEnum".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'F');
    }
    out
}

/// SCREAMING_SNAKE constant identifier for an enum value. Punctuation
/// either becomes an underscore or is spelled out (`&` -> `_AND_`,
/// `+` -> `_PLUS_`), runs of underscores collapse, and anything still
/// empty or digit-leading gets an underscore prefix.
pub fn enum_const_ident(value: &str) -> String {
    let mut raw = String::with_capacity(value.len());
    for ch in value.to_uppercase().chars() {
        match ch {
            c if c.is_ascii_alphanumeric() => raw.push(c),
            '&' => raw.push_str("_AND_"),
            '+' => raw.push_str("_PLUS_"),
            '@' => raw.push_str("_AT_"),
            '#' => raw.push_str("_HASH_"),
            '$' => raw.push_str("_DOLLAR_"),
            '%' => raw.push_str("_PERCENT_"),
            '*' => raw.push_str("_STAR_"),
            '=' => raw.push_str("_EQUALS_"),
            '<' => raw.push_str("_LT_"),
            '>' => raw.push_str("_GT_"),
            _ => raw.push('_'),
        }
    }

    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{}", out)
    } else {
        out
    }
}

/// snake_case rendering of a CamelCase identifier (`AdAccount` ->
/// `ad_account`). Used for tool-name prefixes and generated module names.
pub fn snake_ident(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_joins = i > 0
                && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if i > 0 && (prev_joins || next_lower) && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Rust struct field identifier for a vendor parameter name. Lowercased,
/// non-alphanumerics become underscores, keywords get a raw prefix, and
/// the unrawable keywords (`self`, `super`, `crate`) get a trailing
/// underscore.
pub fn rust_field_ident(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push_str("field");
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'f');
    }
    if matches!(out.as_str(), "self" | "super" | "crate") {
        format!("{}_", out)
    } else if RUST_KEYWORDS.contains(&out.as_str()) {
        format!("r#{}", out)
    } else {
        out
    }
}

/// PascalCase rendering of a snake_case tool name, for struct names.
pub fn pascal_ident(name: &str) -> String {
    title_concat(name)
}
