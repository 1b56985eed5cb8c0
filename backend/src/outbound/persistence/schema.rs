//! Diesel table definitions for the PostgreSQL schema.
//!
//! These must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Bird reference data, bulk loaded with contiguous ids `1..=N`.
    birds (id) {
        id -> Int4,
        common_name -> Varchar,
        scientific_name -> Varchar,
        family -> Varchar,
        /// One of `common`, `uncommon`, `rare`.
        rarity -> Varchar,
        description -> Text,
        image_url -> Nullable<Text>,
        image_credit -> Nullable<Text>,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Named places, unique per `(user_id, name)`. Never hard-deleted.
    locations (id) {
        id -> Uuid,
        user_id -> Uuid,
        name -> Varchar,
        latitude -> Float8,
        longitude -> Float8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sightings (id) {
        id -> Uuid,
        user_id -> Uuid,
        bird_id -> Int4,
        /// `NULL` once the location reference has been removed.
        location_id -> Nullable<Uuid>,
        sighted_on -> Date,
        note -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Singleton rotation row, always `id = 1`.
    bird_of_the_day (id) {
        id -> Int4,
        backlog -> Array<Int4>,
        current_bird_id -> Nullable<Int4>,
        /// Compare-and-swap counter, incremented by every save.
        revision -> Int4,
        rotated_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(locations -> users (user_id));
diesel::joinable!(sightings -> birds (bird_id));
diesel::joinable!(sightings -> locations (location_id));
diesel::joinable!(sightings -> users (user_id));
diesel::joinable!(bird_of_the_day -> birds (current_bird_id));

diesel::allow_tables_to_appear_in_same_query!(bird_of_the_day, birds, locations, sightings, users);
