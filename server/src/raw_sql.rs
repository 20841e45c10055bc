//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! User input is ALWAYS passed via `.bind()` parameters, never concatenated
//! into the SQL text. New fragments must keep to that and document why the
//! DSL can't be used.

use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::sql_types::BigInt;

/// Window function for counting total rows across the full result set.
///
/// Returns `COUNT(*) OVER()` which gives the total count before LIMIT/OFFSET.
/// Diesel doesn't support window functions natively.
pub fn count_over() -> SqlLiteral<BigInt> {
    sql::<BigInt>("COUNT(*) OVER()")
}

/// Full-text match against the trigger-maintained `search_vector`.
///
/// # Why raw SQL?
/// `tsvector` has no Diesel type without an extra crate.
#[macro_export]
macro_rules! matches_search {
    ($query:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>(
            "(recipes.search_vector @@ plainto_tsquery('simple', ",
        )
        .bind::<diesel::sql_types::Text, _>($query)
        .sql("))")
    };
}

/// Array overlap between `recipes.categories` and the bound list.
///
/// # Why raw SQL?
/// Diesel's `overlaps_with` needs a typed array expression on both sides,
/// binding the list directly is simpler.
#[macro_export]
macro_rules! categories_overlap {
    ($categories:expr) => {
        diesel::dsl::sql::<diesel::sql_types::Bool>("(recipes.categories && ")
            .bind::<diesel::sql_types::Array<diesel::sql_types::Text>, _>($categories)
            .sql(")")
    };
}

/// Distinct categories across a user's recipes.
///
/// Uses `unnest()` to expand the categories array, which isn't in Diesel's DSL.
///
/// # Safety
/// The user_id MUST be passed via `.bind()`, not interpolated.
pub const DISTINCT_CATEGORIES_QUERY: &str = "SELECT DISTINCT unnest(r.categories) AS category \
    FROM recipes r \
    WHERE r.user_id = $1 \
    ORDER BY category";

/// Distinct canonical ingredient names containing a pattern, across a user's recipes.
///
/// # Safety
/// Both the user_id ($1) and the escaped ILIKE pattern ($2) MUST be bound.
pub const SUGGEST_INGREDIENTS_QUERY: &str = "SELECT DISTINCT i.canonical_name AS name \
    FROM ingredients i \
    JOIN recipes r ON r.id = i.recipe_id \
    WHERE r.user_id = $1 AND i.canonical_name ILIKE $2 \
    ORDER BY name \
    LIMIT $3";

/// Escape `%`, `_` and the escape character itself for use inside an ILIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
