//! schema.org Recipe extraction from JSON-LD script blocks.
//!
//! The structured data is flattened into plain text for the model rather than
//! mapped field by field: quantities and steps are re-extracted downstream.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Regex to find JSON-LD script tags (case-insensitive for type attribute)
static JSONLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid JSON-LD regex")
});

/// A Recipe found in structured data, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLdRecipe {
    pub text: String,
    pub image: Option<String>,
}

/// Find the first JSON-LD Recipe in the page.
pub fn extract_jsonld_recipe(html: &str) -> Option<JsonLdRecipe> {
    for cap in JSONLD_REGEX.captures_iter(html) {
        let json_text = match cap.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };

        let sanitized = sanitize_json(json_text);
        let json: Value = match serde_json::from_str(&sanitized) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable JSON-LD block");
                continue;
            }
        };

        if let Some(recipe) = find_recipe_in_json(&json) {
            if let Some(rendered) = render_recipe(recipe) {
                return Some(rendered);
            }
        }
    }
    None
}

/// Some sites include literal newlines/tabs inside JSON strings instead of escaped versions.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }

    result
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(arr)) => arr.iter().any(|v| v == "Recipe"),
        _ => false,
    }
}

/// Recursively search for a Recipe object. Handles @graph arrays and nesting.
fn find_recipe_in_json(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if is_recipe_type(json) {
                return Some(json);
            }
            if let Some(recipe) = obj.get("@graph").and_then(find_recipe_in_json) {
                return Some(recipe);
            }
            obj.values().find_map(find_recipe_in_json)
        }
        Value::Array(arr) => arr.iter().find_map(find_recipe_in_json),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flatten recipeInstructions: a string, strings, HowToStep, or HowToSection.
fn collect_instructions(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_instructions(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(text) = obj.get("text").and_then(text_of) {
                out.push(text);
            } else if let Some(items) = obj.get("itemListElement") {
                collect_instructions(items, out);
            } else if let Some(name) = obj.get("name").and_then(text_of) {
                out.push(name);
            }
        }
        _ => {}
    }
}

fn extract_image(recipe: &Value) -> Option<String> {
    match recipe.get("image")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(arr) => arr.iter().find_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("url").and_then(|v| v.as_str()).map(str::to_string),
            _ => None,
        }),
        Value::Object(obj) => obj.get("url").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

fn render_recipe(recipe: &Value) -> Option<JsonLdRecipe> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = recipe.get("name").and_then(text_of) {
        parts.push(format!("Name: {}", name));
    }
    if let Some(description) = recipe.get("description").and_then(text_of) {
        parts.push(format!("Description: {}", description));
    }

    if let Some(Value::Array(items)) = recipe.get("recipeIngredient") {
        let ingredients: Vec<String> = items.iter().filter_map(text_of).collect();
        if !ingredients.is_empty() {
            parts.push(format!("\nIngredients:\n{}", ingredients.join("\n")));
        }
    }

    if let Some(instructions) = recipe.get("recipeInstructions") {
        let mut steps = Vec::new();
        collect_instructions(instructions, &mut steps);
        if !steps.is_empty() {
            let numbered: Vec<String> = steps
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {}", i + 1, s))
                .collect();
            parts.push(format!("\nInstructions:\n{}", numbered.join("\n")));
        }
    }

    let categories: Vec<String> = match recipe.get("recipeCategory") {
        Some(Value::Array(arr)) => arr.iter().filter_map(text_of).collect(),
        Some(other) => text_of(other).into_iter().collect(),
        None => Vec::new(),
    };
    if !categories.is_empty() {
        parts.push(format!("\nCategories: {}", categories.join(", ")));
    }

    if parts.is_empty() {
        return None;
    }

    Some(JsonLdRecipe {
        text: parts.join("\n"),
        image: extract_image(recipe),
    })
}
