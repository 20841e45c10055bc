use crate::api::{error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::RecipeRow;
use crate::schema::recipes;
use crate::store::with_ingredients;
use crate::{categories_overlap, matches_search, raw_sql};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::get::RecipeResponse;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRecipesParams {
    /// Full-text search over title and steps
    pub search: Option<String>,
    /// Comma-separated ingredients the user has. Re-ranks the page by how
    /// few ingredients are missing and drops recipes with no match at all.
    pub ingredients: Option<String>,
    /// Comma-separated categories; recipes in any of them match
    pub categories: Option<String>,
    /// 1-based page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 20, max: 100)
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeResponse>,
    /// Matching recipes before pagination and ingredient filtering
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Split a comma-separated parameter, dropping blank entries.
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Order recipes by how many of their ingredients are missing from
/// `available`, fewest first.
///
/// An ingredient counts as available when either canonical name contains
/// the other, case-insensitively. Recipes with no available ingredient are
/// dropped. The sort is stable, so ties keep their incoming order.
pub fn rank_by_available_ingredients(
    recipes: Vec<RecipeResponse>,
    available: &[String],
) -> Vec<RecipeResponse> {
    let available: Vec<String> = available
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect();

    let mut ranked: Vec<RecipeResponse> = recipes
        .into_iter()
        .filter_map(|mut recipe| {
            let names: Vec<String> = recipe
                .ingredients
                .iter()
                .map(|i| i.canonical_name.to_lowercase())
                .collect();
            let missing: Vec<String> = names
                .iter()
                .filter(|name| {
                    !available
                        .iter()
                        .any(|a| name.contains(a.as_str()) || a.contains(name.as_str()))
                })
                .cloned()
                .collect();

            if names.len() == missing.len() {
                return None;
            }
            recipe.missing_ingredients = Some(missing);
            Some(recipe)
        })
        .collect();

    ranked.sort_by_key(|r| r.missing_ingredients.as_ref().map_or(0, Vec::len));
    ranked
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    params(ListRecipesParams),
    responses(
        (status = 200, description = "Page of the user's recipes, newest first", body = ListRecipesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user_id): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListRecipesParams>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = (page - 1).saturating_mul(limit);

    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let categories = split_list(params.categories.as_deref());
    let available = split_list(params.ingredients.as_deref());

    let mut conn = get_conn!(pool);

    let mut query = recipes::table
        .filter(recipes::user_id.eq(user_id))
        .into_boxed();

    if let Some(ref search) = search {
        query = query.filter(matches_search!(search));
    }

    if !categories.is_empty() {
        query = query.filter(categories_overlap!(&categories));
    }

    // COUNT(*) OVER() computes the total count across all matching rows
    let results: Vec<(RecipeRow, i64)> = match query
        .order(recipes::created_at.desc())
        .select((RecipeRow::as_select(), raw_sql::count_over()))
        .limit(limit)
        .offset(offset)
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "failed to list recipes");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "שגיאה בטעינת המתכונים");
        }
    };

    let total = results.first().map(|(_, total)| *total).unwrap_or(0);
    let rows = results.into_iter().map(|(row, _)| row).collect();

    let recipes = match with_ingredients(&mut conn, rows) {
        Ok(recipes) => recipes,
        Err(e) => {
            tracing::error!(error = %e, "failed to load ingredients");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "שגיאה בטעינת המתכונים");
        }
    };

    let mut recipes: Vec<RecipeResponse> = recipes.into_iter().map(Into::into).collect();
    if !available.is_empty() {
        recipes = rank_by_available_ingredients(recipes, &available);
    }

    (
        StatusCode::OK,
        Json(ListRecipesResponse {
            recipes,
            total,
            page,
            limit,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::recipes::get::IngredientResponse;
    use chrono::Utc;
    use uuid::Uuid;

    fn recipe(title: &str, ingredients: &[&str]) -> RecipeResponse {
        RecipeResponse {
            id: Uuid::new_v4(),
            title: title.to_string(),
            source_url: None,
            source_platform: "website".to_string(),
            video_embed_url: None,
            categories: vec!["פרווה".to_string()],
            extraction_status: "complete".to_string(),
            steps: vec!["לערבב".to_string()],
            image_url: None,
            created_at: Utc::now(),
            ingredients: ingredients
                .iter()
                .map(|name| IngredientResponse {
                    name: name.to_string(),
                    canonical_name: name.to_string(),
                    quantity: None,
                    unit: None,
                })
                .collect(),
            missing_ingredients: None,
        }
    }

    fn titles(recipes: &[RecipeResponse]) -> Vec<&str> {
        recipes.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_rank_fewest_missing_first() {
        let recipes = vec![
            recipe("B", &["egg", "butter", "milk"]),
            recipe("C", &["fish", "salt"]),
            recipe("A", &["egg", "flour", "sugar"]),
        ];
        let available = vec!["egg".to_string(), "flour".to_string()];

        let ranked = rank_by_available_ingredients(recipes, &available);
        assert_eq!(titles(&ranked), vec!["A", "B"]);
        assert_eq!(ranked[0].missing_ingredients, Some(vec!["sugar".to_string()]));
        assert_eq!(
            ranked[1].missing_ingredients,
            Some(vec!["butter".to_string(), "milk".to_string()])
        );
    }

    #[test]
    fn test_rank_matches_substrings_both_ways() {
        let recipes = vec![
            recipe("short", &["קמח"]),
            recipe("long", &["קמח מלא", "סוכר"]),
        ];

        let ranked = rank_by_available_ingredients(recipes, &["קמח".to_string()]);
        assert_eq!(titles(&ranked), vec!["short", "long"]);

        let recipes = vec![recipe("short", &["קמח"])];
        let ranked = rank_by_available_ingredients(recipes, &["קמח מלא".to_string()]);
        assert_eq!(ranked[0].missing_ingredients, Some(vec![]));
    }

    #[test]
    fn test_rank_is_case_insensitive_and_stable() {
        let recipes = vec![
            recipe("first", &["Egg", "Sugar"]),
            recipe("second", &["EGG", "Milk"]),
        ];

        let ranked = rank_by_available_ingredients(recipes, &[" egg ".to_string()]);
        assert_eq!(titles(&ranked), vec!["first", "second"]);
        assert_eq!(ranked[0].missing_ingredients, Some(vec!["sugar".to_string()]));
    }

    #[test]
    fn test_rank_drops_recipes_without_ingredients() {
        let recipes = vec![recipe("empty", &[])];
        assert!(rank_by_available_ingredients(recipes, &["egg".to_string()]).is_empty());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("חלבי, בשרי,,")),
            vec!["חלבי".to_string(), "בשרי".to_string()]
        );
        assert!(split_list(None).is_empty());
        assert!(split_list(Some(" , ")).is_empty());
    }
}
