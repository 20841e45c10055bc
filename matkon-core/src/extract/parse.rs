//! Strict decoding of model output.
//!
//! Model text is untrusted: it may wrap the JSON in prose, return the
//! no-recipe sentinel, or return something that is JSON but not a recipe.
//! Each case is a distinct `InferenceOutcome`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{
    ExtractedIngredient, ExtractedRecipe, CANONICAL_CATEGORIES, DEFAULT_TITLE, FALLBACK_CATEGORY,
};

const NO_RECIPE_SENTINEL: &str = "no_recipe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    RecipeFound(ExtractedRecipe),
    NotFound,
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct RawInference {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    ingredients: Option<Vec<RawIngredient>>,
    #[serde(default)]
    steps: Option<Vec<String>>,
    #[serde(default)]
    categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawIngredient {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    unit: Option<String>,
}

/// Accept a string or a number; treat null and blank strings as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Find the first balanced `{...}` in the text, ignoring braces inside strings.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Keep only canonical categories, first occurrence wins; never empty.
pub fn filter_categories<I, S>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut kept: Vec<String> = Vec::new();
    for category in categories {
        let category = category.as_ref().trim();
        if CANONICAL_CATEGORIES.contains(&category) && !kept.iter().any(|k| k == category) {
            kept.push(category.to_string());
        }
    }
    if kept.is_empty() {
        kept.push(FALLBACK_CATEGORY.to_string());
    }
    kept
}

pub fn decode_inference(text: &str) -> InferenceOutcome {
    let Some(json_text) = find_json_object(text) else {
        return InferenceOutcome::Malformed("no JSON object in response".to_string());
    };

    let value: Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(e) => return InferenceOutcome::Malformed(format!("invalid JSON: {}", e)),
    };

    if value.get("error").and_then(Value::as_str) == Some(NO_RECIPE_SENTINEL) {
        return InferenceOutcome::NotFound;
    }

    let raw: RawInference = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => return InferenceOutcome::Malformed(format!("unexpected shape: {}", e)),
    };

    if raw.title.is_none() && raw.ingredients.is_none() && raw.steps.is_none() {
        return InferenceOutcome::Malformed("object has no recipe fields".to_string());
    }

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let ingredients = raw
        .ingredients
        .unwrap_or_default()
        .into_iter()
        .filter_map(|ing| {
            let name = ing.name?.trim().to_string();
            (!name.is_empty()).then_some(ExtractedIngredient {
                name,
                quantity: ing.quantity,
                unit: ing.unit,
            })
        })
        .collect();

    let steps = raw
        .steps
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    InferenceOutcome::RecipeFound(ExtractedRecipe {
        title,
        ingredients,
        steps,
        categories: filter_categories(raw.categories.unwrap_or_default()),
    })
}
