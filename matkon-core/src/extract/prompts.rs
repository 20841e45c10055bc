//! Prompt templates for recipe extraction.

use crate::types::CANONICAL_CATEGORIES;

pub const TEXT_EXTRACT_PROMPT_NAME: &str = "text_extract";
pub const MEDIA_EXTRACT_PROMPT_NAME: &str = "media_extract";

const OUTPUT_FORMAT: &str = r#"Return ONLY a single JSON object with this exact structure, no other text:
{
  "title": "Recipe name",
  "ingredients": [
    {"name": "ingredient name", "quantity": "amount as a number, or null", "unit": "unit (cup/tablespoon/gram/unit etc.), or null"}
  ],
  "steps": ["step 1", "step 2"],
  "categories": ["category"]
}"#;

fn shared_rules() -> String {
    let categories = CANONICAL_CATEGORIES
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"- Separate the quantity and unit from the ingredient name. If there is no exact quantity, use null.
- Steps must be in the order they are performed.
- Allowed categories: {}. Choose every one that applies.
- Write all text in Hebrew."#,
        categories
    )
}

pub fn render_text_extract_prompt(content: &str) -> String {
    format!(
        r#"You are a recipe extraction expert. You are given the content of a social media post or web page. Extract the recipe from it.

{}

Rules:
{}
- If the content does not contain a recipe, return: {{"error": "no_recipe"}}

Post content:
{}"#,
        OUTPUT_FORMAT,
        shared_rules(),
        content
    )
}

/// The images precede this text in the request.
pub fn render_media_extract_prompt(hint: Option<&str>) -> String {
    let mut prompt = format!(
        r#"You are a recipe extraction expert working from images. The images contain a recipe. They may be screenshots of a recipe site or app, partial screenshots showing only ingredients or only instructions, frames from a cooking video, a handwritten recipe, or an ingredient list in any format.

Read all visible text in the images and extract a recipe. If only part of the recipe is visible, extract what is there.

{}

Rules:
{}
- If you see ingredients in the images (on a table, in a cooking video), list them even without explicit text.
- If you see preparation stages (video frames), describe what happens in each stage.
- If there are only ingredients and no instructions, use an empty steps array.
- If there are only instructions and no ingredients, use an empty ingredients array.
- Return {{"error": "no_recipe"}} only if the images are unrelated to food or cooking."#,
        OUTPUT_FORMAT,
        shared_rules()
    );

    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        prompt.push_str("\n\nAdditional information about the recipe:\n");
        prompt.push_str(hint);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prompt_lists_categories_and_content() {
        let prompt = render_text_extract_prompt("2 ביצים, קמח");
        for category in CANONICAL_CATEGORIES {
            assert!(prompt.contains(category));
        }
        assert!(prompt.contains(r#"{"error": "no_recipe"}"#));
        assert!(prompt.ends_with("2 ביצים, קמח"));
    }

    #[test]
    fn test_media_prompt_hint_is_optional() {
        let without = render_media_extract_prompt(None);
        assert!(!without.contains("Additional information"));

        let blank = render_media_extract_prompt(Some("   "));
        assert_eq!(blank, without);

        let with = render_media_extract_prompt(Some("שקשוקה"));
        assert!(with.ends_with("Additional information about the recipe:\nשקשוקה"));
    }
}
