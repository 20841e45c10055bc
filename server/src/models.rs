use chrono::{DateTime, Utc};
use diesel::prelude::*;
use matkon_core::{ExtractionStatus, NewIngredient, Platform, Recipe};
use uuid::Uuid;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub source_url: Option<String>,
    pub source_platform: String,
    pub video_embed_url: Option<String>,
    pub categories: Vec<String>,
    pub extraction_status: String,
    pub steps: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RecipeRow {
    pub fn into_recipe(self, ingredients: Vec<IngredientRow>) -> Recipe {
        Recipe {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            source_url: self.source_url,
            source_platform: Platform::from_str(&self.source_platform).unwrap_or_default(),
            video_embed_url: self.video_embed_url,
            categories: self.categories,
            extraction_status: ExtractionStatus::from_str(&self.extraction_status)
                .unwrap_or(ExtractionStatus::Partial),
            steps: self.steps,
            image_url: self.image_url,
            created_at: self.created_at,
            ingredients: ingredients.into_iter().map(IngredientRow::into_ingredient).collect(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipeRow<'a> {
    pub user_id: Uuid,
    pub title: &'a str,
    pub source_url: Option<&'a str>,
    pub source_platform: &'a str,
    pub video_embed_url: Option<&'a str>,
    pub categories: &'a [String],
    pub extraction_status: &'a str,
    pub steps: &'a [String],
    pub image_url: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct IngredientRow {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    pub canonical_name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub position: i32,
}

impl IngredientRow {
    pub fn into_ingredient(self) -> NewIngredient {
        NewIngredient {
            name: self.name,
            canonical_name: self.canonical_name,
            quantity: self.quantity,
            unit: self.unit,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ingredients)]
pub struct NewIngredientRow<'a> {
    pub recipe_id: Uuid,
    pub name: &'a str,
    pub canonical_name: &'a str,
    pub quantity: Option<&'a str>,
    pub unit: Option<&'a str>,
    pub position: i32,
}
