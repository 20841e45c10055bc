//! Postgres-backed `RecipeStore`, plus the read queries the API handlers share.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use matkon_core::{
    ExistingRecipe, NewIngredient, NewRecipe, Recipe, RecipeStore, StoreError,
    ThumbnailCandidate,
};
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{IngredientRow, NewIngredientRow, NewRecipeRow, RecipeRow};
use crate::schema::{ingredients, recipes};

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub struct PgRecipeStore {
    pool: Arc<DbPool>,
}

impl PgRecipeStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn find_by_source_url(
        &self,
        user_id: Uuid,
        source_url: &str,
    ) -> Result<Option<ExistingRecipe>, StoreError> {
        let mut conn = self.pool.get().map_err(backend)?;

        let found: Option<(Uuid, String)> = recipes::table
            .filter(recipes::user_id.eq(user_id))
            .filter(recipes::source_url.eq(source_url))
            .order(recipes::created_at.asc())
            .select((recipes::id, recipes::title))
            .first(&mut conn)
            .optional()
            .map_err(backend)?;

        Ok(found.map(|(id, title)| ExistingRecipe { id, title }))
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        let mut conn = self.pool.get().map_err(backend)?;

        let row = NewRecipeRow {
            user_id: recipe.user_id,
            title: &recipe.title,
            source_url: recipe.source_url.as_deref(),
            source_platform: recipe.source_platform.as_str(),
            video_embed_url: recipe.video_embed_url.as_deref(),
            categories: &recipe.categories,
            extraction_status: recipe.extraction_status.as_str(),
            steps: &recipe.steps,
            image_url: recipe.image_url.as_deref(),
        };

        let inserted: RecipeRow = diesel::insert_into(recipes::table)
            .values(&row)
            .returning(RecipeRow::as_returning())
            .get_result(&mut conn)
            .map_err(backend)?;

        Ok(inserted.into_recipe(Vec::new()))
    }

    async fn update_image_url(&self, recipe_id: Uuid, image_url: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().map_err(backend)?;

        let updated = diesel::update(recipes::table.find(recipe_id))
            .set(recipes::image_url.eq(image_url))
            .execute(&mut conn)
            .map_err(backend)?;

        if updated == 0 {
            return Err(StoreError::Backend(format!("recipe {} not found", recipe_id)));
        }
        Ok(())
    }

    async fn insert_ingredients(
        &self,
        recipe_id: Uuid,
        new_ingredients: &[NewIngredient],
    ) -> Result<(), StoreError> {
        if new_ingredients.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().map_err(backend)?;

        let rows: Vec<NewIngredientRow> = new_ingredients
            .iter()
            .enumerate()
            .map(|(position, ingredient)| NewIngredientRow {
                recipe_id,
                name: &ingredient.name,
                canonical_name: &ingredient.canonical_name,
                quantity: ingredient.quantity.as_deref(),
                unit: ingredient.unit.as_deref(),
                position: position as i32,
            })
            .collect();

        diesel::insert_into(ingredients::table)
            .values(&rows)
            .execute(&mut conn)
            .map_err(backend)?;
        Ok(())
    }

    async fn thumbnail_candidates(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ThumbnailCandidate>, StoreError> {
        let mut conn = self.pool.get().map_err(backend)?;

        let rows: Vec<RecipeRow> = recipes::table
            .filter(recipes::user_id.eq(user_id))
            .filter(recipes::source_url.is_not_null())
            .order(recipes::created_at.asc())
            .select(RecipeRow::as_select())
            .load(&mut conn)
            .map_err(backend)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let recipe = row.into_recipe(Vec::new());
                Some(ThumbnailCandidate {
                    id: recipe.id,
                    title: recipe.title,
                    source_url: recipe.source_url?,
                    source_platform: recipe.source_platform,
                    image_url: recipe.image_url,
                })
            })
            .collect())
    }
}

/// Attach ingredients (in their stored order) to a page of recipe rows with
/// a single query.
pub fn with_ingredients(
    conn: &mut PgConnection,
    rows: Vec<RecipeRow>,
) -> QueryResult<Vec<Recipe>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let mut all: Vec<IngredientRow> = if ids.is_empty() {
        Vec::new()
    } else {
        ingredients::table
            .filter(ingredients::recipe_id.eq_any(&ids))
            .order((ingredients::recipe_id, ingredients::position.asc()))
            .select(IngredientRow::as_select())
            .load(conn)?
    };

    Ok(rows
        .into_iter()
        .map(|row| {
            let (mine, rest): (Vec<_>, Vec<_>) =
                all.drain(..).partition(|i| i.recipe_id == row.id);
            all = rest;
            row.into_recipe(mine)
        })
        .collect())
}

/// One recipe owned by `user_id`, with its ingredients.
pub fn find_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> QueryResult<Option<Recipe>> {
    let row: Option<RecipeRow> = recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::user_id.eq(user_id))
        .select(RecipeRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => Ok(with_ingredients(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}
