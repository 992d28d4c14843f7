pub mod core;
pub use self::core::*;

pub mod safety;
pub use self::safety::*;

diesel::joinable!(tbm_submissions -> projects (project_id));
diesel::joinable!(manager_inspections -> projects (project_id));
diesel::joinable!(heat_wave_checks -> projects (project_id));

diesel::allow_tables_to_appear_in_same_query!(
    profiles,
    projects,
    tbm_submissions,
    manager_inspections,
    heat_wave_checks,
);
