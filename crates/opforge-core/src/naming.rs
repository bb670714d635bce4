//! Name derivation for packages, companion commands and API resources

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Plural forms that don't follow the suffix rules, keyed by lowercase singular
static IRREGULAR_PLURALS: phf::Map<&'static str, &'static str> = phf_map! {
    "person" => "people",
    "child" => "children",
    "man" => "men",
    "woman" => "women",
    "mouse" => "mice",
    "goose" => "geese",
    "foot" => "feet",
    "tooth" => "teeth",
    "leaf" => "leaves",
    "knife" => "knives",
    "life" => "lives",
    "wife" => "wives",
    "index" => "indices",
    "matrix" => "matrices",
    "vertex" => "vertices",
    "endpoints" => "endpoints",
    "series" => "series",
    "species" => "species",
    "chassis" => "chassis",
    "sheep" => "sheep",
    "fish" => "fish",
    "data" => "data",
    "metadata" => "metadata",
};

/// Normalize a workload name into a single lowercase token
///
/// Every non-alphanumeric character is dropped: `web-store_v2` -> `webstorev2`.
pub fn to_package_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Upper-camel identifier: `web-store` -> `WebStore`, `hasrootcommand` -> `Hasrootcommand`
pub fn to_var_name(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

/// Lowercase file stem with separators removed
pub fn to_file_name(name: &str) -> String {
    to_package_name(name)
}

/// Snake-case identifier: `web-store` -> `web_store`, `WebStore` -> `web_store`
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c.to_ascii_lowercase());
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// English plural of a resource kind, lowercased: `Widget` -> `widgets`, `Policy` -> `policies`
pub fn pluralize(kind: &str) -> String {
    let lower = kind.to_ascii_lowercase();
    if lower.is_empty() {
        return lower;
    }

    if let Some(irregular) = IRREGULAR_PLURALS.get(lower.as_str()) {
        return (*irregular).to_string();
    }

    // Compound kinds (NetworkPolicy, PodSecurityPolicy) pluralize on their last word
    for (singular, plural) in IRREGULAR_PLURALS.entries() {
        if lower.len() > singular.len() && lower.ends_with(singular) && singular.len() > 3 {
            return format!("{}{}", &lower[..lower.len() - singular.len()], plural);
        }
    }

    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{lower}es");
    }

    if let Some(stem) = lower.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{stem}ies");
        }
    }

    format!("{lower}s")
}

/// Whether a companion command is the tool's root or one of its subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRole {
    Root,
    Sub,
}

/// Companion command-line metadata for a workload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliCommand {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Identifier used for the generated command variable
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub var_name: String,

    /// Stem of the generated command source file
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_rootcommand: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_subcommand: bool,
}

impl CliCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    #[inline]
    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }

    /// True when nothing about the command was specified
    pub fn is_empty(&self) -> bool {
        !self.has_name() && !self.has_description()
    }

    /// Fill unset name/description and recompute the derived fields
    ///
    /// Values already present are kept, so calling this repeatedly is a no-op.
    pub fn set_common_values(
        &mut self,
        default_name: &str,
        default_description: &str,
        role: CommandRole,
    ) {
        if !self.has_name() {
            self.name = default_name.to_string();
        }
        if !self.has_description() {
            self.description = default_description.to_string();
        }

        self.var_name = to_var_name(&self.name);
        self.file_name = to_file_name(&self.name);
        self.is_rootcommand = role == CommandRole::Root;
        self.is_subcommand = role == CommandRole::Sub;
    }
}
