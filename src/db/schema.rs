diesel::table! {
    boards (id) {
        id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    columns (id) {
        id -> Text,
        board_id -> Text,
        name -> Text,
        position -> Integer,
        color -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    tasks (id) {
        id -> Text,
        board_id -> Text,
        column_id -> Text,
        title -> Text,
        description -> Nullable<Text>,
        assignee -> Nullable<Text>,
        priority -> Text,
        story_points -> Nullable<Integer>,
        position -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(columns -> boards (board_id));
diesel::joinable!(tasks -> columns (column_id));

diesel::allow_tables_to_appear_in_same_query!(
    boards,
    columns,
    tasks,
);
