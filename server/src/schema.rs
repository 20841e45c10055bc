// `recipes.search_vector` is trigger-maintained and only touched from raw SQL,
// so it is left out of the table definition.

diesel::table! {
    sessions (id) {
        id -> Uuid,
        user_id -> Uuid,
        #[max_length = 255]
        token_hash -> Varchar,
        expires_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    recipes (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        source_url -> Nullable<Text>,
        #[max_length = 32]
        source_platform -> Varchar,
        video_embed_url -> Nullable<Text>,
        categories -> Array<Text>,
        #[max_length = 16]
        extraction_status -> Varchar,
        steps -> Array<Text>,
        image_url -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    ingredients (id) {
        id -> Uuid,
        recipe_id -> Uuid,
        name -> Text,
        canonical_name -> Text,
        quantity -> Nullable<Text>,
        unit -> Nullable<Text>,
        position -> Int4,
    }
}

diesel::joinable!(ingredients -> recipes (recipe_id));

diesel::allow_tables_to_appear_in_same_query!(ingredients, recipes, sessions,);
