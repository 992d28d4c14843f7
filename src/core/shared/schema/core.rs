diesel::table! {
    profiles (id) {
        id -> Uuid,
        email -> Text,
        full_name -> Nullable<Text>,
        role -> Text,
        managing_hq -> Nullable<Text>,
        managing_branch -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    projects (id) {
        id -> Uuid,
        name -> Text,
        managing_hq -> Text,
        managing_branch -> Text,
        site_address -> Nullable<Text>,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        client_name -> Nullable<Text>,
        start_date -> Nullable<Date>,
        end_date -> Nullable<Date>,
        is_active -> Jsonb,
        display_order -> Int4,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
