diesel::table! {
    tbm_submissions (id) {
        id -> Uuid,
        project_id -> Uuid,
        meeting_date -> Date,
        leader_name -> Text,
        attendee_count -> Int4,
        work_content -> Text,
        risk_factors -> Nullable<Text>,
        safety_measures -> Nullable<Text>,
        remarks -> Nullable<Text>,
        photo_url -> Nullable<Text>,
        submitted_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    manager_inspections (id) {
        id -> Uuid,
        project_id -> Uuid,
        inspection_date -> Date,
        inspector_name -> Text,
        category -> Text,
        findings -> Nullable<Text>,
        status -> Text,
        signer_name -> Nullable<Text>,
        signature -> Nullable<Text>,
        signed_by -> Nullable<Uuid>,
        signed_at -> Nullable<Timestamptz>,
        created_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    heat_wave_checks (id) {
        id -> Uuid,
        project_id -> Uuid,
        check_date -> Date,
        temperature -> Nullable<Float8>,
        feels_like -> Nullable<Float8>,
        alert_level -> Text,
        water_supplied -> Bool,
        shade_available -> Bool,
        rest_provided -> Bool,
        work_adjusted -> Bool,
        emergency_ready -> Bool,
        notes -> Nullable<Text>,
        checked_by -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
