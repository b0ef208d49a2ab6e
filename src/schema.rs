diesel::table! {
    items (id) {
        id -> BigInt, // SQLite row ids are 64-bit
        list_id -> Integer,
        name -> Text,
        description -> Text,
        done -> Bool,
        active -> Bool,
        created_at -> Timestamp,
        updated_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    lists (id) {
        id -> Integer,
        active -> Bool,
        created_at -> Timestamp,
        updated_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    sessions (id) {
        id -> Text,
        email -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        uuid -> Text,
        email -> Text,
        list_id -> Integer,
        active -> Bool,
        created_at -> Timestamp,
        updated_at -> Nullable<Timestamp>,
    }
}

diesel::joinable!(items -> lists (list_id));
diesel::joinable!(users -> lists (list_id));

diesel::allow_tables_to_appear_in_same_query!(
    items,
    lists,
    sessions,
    users,
);
