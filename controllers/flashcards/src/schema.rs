table! {
    collection_reviews (id) {
        id -> Int4,
        rating -> Int4,
        review -> Text,
        user_id -> Int4,
        collection_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    collections (id) {
        id -> Int4,
        user_id -> Int4,
        name -> Varchar,
        average_rating -> Float8,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    daily_set_creations (date) {
        date -> Date,
        total_created -> Int4,
    }
}

table! {
    flashcard_sets (id) {
        id -> Int4,
        user_id -> Int4,
        name -> Varchar,
        description -> Nullable<Text>,
        private -> Bool,
        average_rating -> Float8,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    flashcards (id) {
        id -> Int4,
        set_id -> Int4,
        term -> Text,
        definition -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    set_reviews (id) {
        id -> Int4,
        rating -> Int4,
        review -> Text,
        user_id -> Int4,
        set_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    settings (key) {
        key -> Varchar,
        value -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        role -> Varchar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(collection_reviews -> collections (collection_id));
joinable!(collection_reviews -> users (user_id));
joinable!(collections -> users (user_id));
joinable!(flashcard_sets -> users (user_id));
joinable!(flashcards -> flashcard_sets (set_id));
joinable!(set_reviews -> flashcard_sets (set_id));
joinable!(set_reviews -> users (user_id));

allow_tables_to_appear_in_same_query!(
    collection_reviews,
    collections,
    daily_set_creations,
    flashcard_sets,
    flashcards,
    set_reviews,
    settings,
    users,
);
