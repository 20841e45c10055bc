//! Recipe persistence seam used by the ingestion pipeline.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{ExistingRecipe, NewIngredient, NewRecipe, Recipe, ThumbnailCandidate};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// A recipe this user already saved from the same source URL.
    async fn find_by_source_url(
        &self,
        user_id: Uuid,
        source_url: &str,
    ) -> Result<Option<ExistingRecipe>, StoreError>;

    /// Insert the recipe row. The returned recipe has no ingredients yet.
    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, StoreError>;

    async fn update_image_url(&self, recipe_id: Uuid, image_url: &str) -> Result<(), StoreError>;

    async fn insert_ingredients(
        &self,
        recipe_id: Uuid,
        ingredients: &[NewIngredient],
    ) -> Result<(), StoreError>;

    /// The user's recipes that have a source URL, oldest first.
    async fn thumbnail_candidates(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ThumbnailCandidate>, StoreError>;
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    recipes: Mutex<Vec<Recipe>>,
    fail_inserts: bool,
    fail_ingredient_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose recipe inserts always fail.
    pub fn failing() -> Self {
        Self {
            recipes: Mutex::new(Vec::new()),
            fail_inserts: true,
            fail_ingredient_inserts: false,
        }
    }

    /// A store that saves recipes but rejects every ingredient batch.
    pub fn failing_ingredients() -> Self {
        Self {
            recipes: Mutex::new(Vec::new()),
            fail_inserts: false,
            fail_ingredient_inserts: true,
        }
    }

    pub fn recipes(&self) -> Vec<Recipe> {
        self.recipes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, id: Uuid) -> Option<Recipe> {
        self.recipes().into_iter().find(|r| r.id == id)
    }

    fn with_recipe<F>(&self, recipe_id: Uuid, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Recipe),
    {
        let mut recipes = self.recipes.lock().unwrap_or_else(|e| e.into_inner());
        let recipe = recipes
            .iter_mut()
            .find(|r| r.id == recipe_id)
            .ok_or_else(|| StoreError::Backend(format!("recipe {} not found", recipe_id)))?;
        f(recipe);
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_by_source_url(
        &self,
        user_id: Uuid,
        source_url: &str,
    ) -> Result<Option<ExistingRecipe>, StoreError> {
        let recipes = self.recipes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(recipes
            .iter()
            .find(|r| r.user_id == user_id && r.source_url.as_deref() == Some(source_url))
            .map(|r| ExistingRecipe {
                id: r.id,
                title: r.title.clone(),
            }))
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        if self.fail_inserts {
            return Err(StoreError::Backend("insert rejected".to_string()));
        }

        let row = Recipe {
            id: Uuid::new_v4(),
            user_id: recipe.user_id,
            title: recipe.title.clone(),
            source_url: recipe.source_url.clone(),
            source_platform: recipe.source_platform,
            video_embed_url: recipe.video_embed_url.clone(),
            categories: recipe.categories.clone(),
            extraction_status: recipe.extraction_status,
            steps: recipe.steps.clone(),
            image_url: recipe.image_url.clone(),
            created_at: Utc::now(),
            ingredients: Vec::new(),
        };
        self.recipes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(row.clone());
        Ok(row)
    }

    async fn update_image_url(&self, recipe_id: Uuid, image_url: &str) -> Result<(), StoreError> {
        self.with_recipe(recipe_id, |r| r.image_url = Some(image_url.to_string()))
    }

    async fn insert_ingredients(
        &self,
        recipe_id: Uuid,
        ingredients: &[NewIngredient],
    ) -> Result<(), StoreError> {
        if self.fail_ingredient_inserts {
            return Err(StoreError::Backend("ingredient insert rejected".to_string()));
        }
        self.with_recipe(recipe_id, |r| r.ingredients.extend_from_slice(ingredients))
    }

    async fn thumbnail_candidates(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ThumbnailCandidate>, StoreError> {
        let recipes = self.recipes.lock().unwrap_or_else(|e| e.into_inner());
        Ok(recipes
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                Some(ThumbnailCandidate {
                    id: r.id,
                    title: r.title.clone(),
                    source_url: r.source_url.clone()?,
                    source_platform: r.source_platform,
                    image_url: r.image_url.clone(),
                })
            })
            .collect())
    }
}
