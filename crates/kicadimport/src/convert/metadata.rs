//! Names, descriptions and other element attributes

use crate::kicad::Property;
use crate::librepcb::{ElementMeta, Resource};
use crate::ImportSettings;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use uuid::Uuid;

static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{C}").unwrap());

static INVALID_IDENTIFIER_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^-a-zA-Z0-9_+/!?@#$]").unwrap());

static INVALID_PREFIX_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z_]").unwrap());

const MAX_ELEMENT_NAME_LENGTH: usize = 70;
const MAX_CIRCUIT_IDENTIFIER_LENGTH: usize = 32;
const MAX_COMPONENT_PREFIX_LENGTH: usize = 16;

fn truncated(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Single line element name without control characters
pub fn clean_element_name(name: &str) -> String {
    let name = CONTROL_CHARS.replace_all(name, " ");
    truncated(name.trim(), MAX_ELEMENT_NAME_LENGTH)
}

/// Identifier usable as pin or signal name
pub fn clean_circuit_identifier(name: &str) -> String {
    let name = name.trim().replace(' ', "_");
    truncated(
        &INVALID_IDENTIFIER_CHARS.replace_all(&name, ""),
        MAX_CIRCUIT_IDENTIFIER_LENGTH,
    )
}

/// Component prefix like "R" or "U"
pub fn clean_component_prefix(prefix: &str) -> String {
    truncated(
        &INVALID_PREFIX_CHARS.replace_all(prefix, ""),
        MAX_COMPONENT_PREFIX_LENGTH,
    )
}

/// Property lookup, ignoring the case of the key
pub fn find_property<'a>(properties: &'a [Property], key: &str) -> Option<&'a Property> {
    properties
        .iter()
        .find(|p| p.key.to_lowercase() == key.to_lowercase())
}

pub fn element_description(lib_name: &str, element_name: &str, properties: &[Property]) -> String {
    let mut description = find_property(properties, "description")
        .map(|p| p.value.trim().to_string())
        .unwrap_or_default();
    if !description.is_empty() {
        description.push_str("\n\n");
    }
    description.push_str(&format!(
        "Imported from KiCad ({}:{}).",
        lib_name, element_name
    ));
    description
}

pub fn element_keywords(common_keywords: &str, properties: &[Property]) -> String {
    let mut keywords = common_keywords.to_string();
    if let Some(property) = find_property(properties, "ki_keywords") {
        for keyword in property.value.split(' ').map(str::trim) {
            if !keyword.is_empty() {
                keywords.push(',');
                keywords.push_str(keyword);
            }
        }
    }
    keywords
}

/// Datasheet link, KiCad uses "~" for "no datasheet"
pub fn resources(properties: &[Property]) -> Vec<Resource> {
    find_property(properties, "datasheet")
        .filter(|p| p.value.len() > 1 && !p.value.trim().is_empty())
        .map(|p| Resource {
            name: "Datasheet".to_string(),
            media_type: "application/pdf".to_string(),
            url: p.value.trim().to_string(),
        })
        .into_iter()
        .collect()
}

/// Metadata of a new element converted from a KiCad symbol or footprint
pub fn element_meta(
    settings: &ImportSettings,
    lib_name: &str,
    name: &str,
    properties: &[Property],
    generated_by: &str,
    categories: &BTreeSet<Uuid>,
) -> ElementMeta {
    ElementMeta {
        uuid: Uuid::new_v4(),
        name: clean_element_name(&format!("{}{}", settings.name_prefix, name)),
        description: element_description(lib_name, name, properties),
        keywords: element_keywords(&settings.keywords, properties),
        author: settings.author.clone(),
        version: settings.version.clone(),
        generated_by: generated_by.to_string(),
        categories: categories.clone(),
        resources: resources(properties),
    }
}
