//! Storage tests against a real Postgres. They run only when `DATABASE_URL`
//! points at a scratch database and are skipped otherwise.

#[cfg(test)]
mod db_integration_tests {
    use chrono::{NaiveDate, Utc};
    use diesel::prelude::*;
    use std::sync::{mpsc, OnceLock};
    use std::thread;
    use std::time::Duration;
    use uuid::Uuid;

    use sitesafe::core::shared::error::ApiError;
    use sitesafe::core::shared::schema::{heat_wave_checks, manager_inspections, projects};
    use sitesafe::core::shared::utils::{create_conn, run_migrations, DbConn, DbPool};
    use sitesafe::heat_wave::storage::{self as heat_wave_storage, upsert_check, DbHeatWaveCheck};
    use sitesafe::inspections::storage::{bulk_sign, sign_inspection, DbInspection, Signature};
    use sitesafe::projects::storage::{
        load_ordered_projects, move_project, next_display_order, reorder_projects,
        status_to_json, DbProject,
    };
    use sitesafe::projects::types::QuarterStatus;
    use sitesafe::security::{AuthUser, UserRole};
    use sitesafe::tbm::storage::{self as tbm_storage, DbTbmSubmission};

    fn pool() -> Option<&'static DbPool> {
        static POOL: OnceLock<Option<DbPool>> = OnceLock::new();
        POOL.get_or_init(|| {
            let url = std::env::var("DATABASE_URL").ok()?;
            let pool = create_conn(&url).expect("connect to DATABASE_URL");
            run_migrations(&pool).expect("run migrations");
            Some(pool)
        })
        .as_ref()
    }

    macro_rules! conn_or_skip {
        () => {
            match pool() {
                Some(pool) => pool.get().expect("pooled connection"),
                None => {
                    eprintln!("DATABASE_URL not set, skipping");
                    return;
                }
            }
        };
    }

    /// An hq name no other test uses, so admin-free scopes stay isolated.
    fn unique_hq() -> String {
        format!("본부-{}", Uuid::new_v4())
    }

    fn user(role: UserRole, hq: &str, branch: Option<&str>) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "tester@example.com".to_string(),
            full_name: Some("테스터".to_string()),
            role,
            managing_hq: Some(hq.to_string()),
            managing_branch: branch.map(str::to_string),
        }
    }

    fn insert_project(conn: &mut DbConn, hq: &str, branch: &str, name: &str, order: i32) -> Uuid {
        insert_project_with(conn, hq, branch, name, order, QuarterStatus::default())
    }

    fn insert_project_with(
        conn: &mut DbConn,
        hq: &str,
        branch: &str,
        name: &str,
        order: i32,
        status: QuarterStatus,
    ) -> Uuid {
        let now = Utc::now();
        let row = DbProject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            managing_hq: hq.to_string(),
            managing_branch: branch.to_string(),
            site_address: None,
            latitude: None,
            longitude: None,
            client_name: None,
            start_date: None,
            end_date: None,
            is_active: status_to_json(status),
            display_order: order,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(projects::table)
            .values(&row)
            .execute(conn)
            .unwrap();
        row.id
    }

    fn insert_inspection(conn: &mut DbConn, project_id: Uuid, status: &str) -> Uuid {
        let row = DbInspection {
            id: Uuid::new_v4(),
            project_id,
            inspection_date: date(),
            inspector_name: "김점검".to_string(),
            category: "비계".to_string(),
            findings: None,
            status: status.to_string(),
            signer_name: None,
            signature: None,
            signed_by: None,
            signed_at: None,
            created_by: None,
            created_at: Utc::now(),
        };
        diesel::insert_into(manager_inspections::table)
            .values(&row)
            .execute(conn)
            .unwrap();
        row.id
    }

    fn status_of(conn: &mut DbConn, id: Uuid) -> String {
        manager_inspections::table
            .find(id)
            .select(manager_inspections::status)
            .first(conn)
            .unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    fn signature(user: &AuthUser) -> Signature<'static> {
        Signature {
            signer_name: "박소장",
            signature: None,
            signed_by: user.id,
        }
    }

    #[test]
    fn test_bulk_sign_unknown_id_signs_nothing() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let writer = user(UserRole::Hq, &hq, None);
        let project = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let pending = insert_inspection(&mut conn, project, "pending");
        let unknown = Uuid::new_v4();

        let err = bulk_sign(&mut conn, &writer, &[pending, unknown], &signature(&writer))
            .unwrap_err();
        match err {
            ApiError::MissingIds(ids) => assert_eq!(ids, vec![unknown]),
            other => panic!("expected MissingIds, got {other:?}"),
        }
        assert_eq!(status_of(&mut conn, pending), "pending");
    }

    #[test]
    fn test_bulk_sign_out_of_scope_id_is_missing() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let writer = user(UserRole::Hq, &hq, None);
        let mine = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let theirs = insert_project(&mut conn, &unique_hq(), "수원지사", "B현장", 0);
        let pending = insert_inspection(&mut conn, mine, "pending");
        let foreign = insert_inspection(&mut conn, theirs, "pending");

        let err = bulk_sign(&mut conn, &writer, &[pending, foreign], &signature(&writer))
            .unwrap_err();
        match err {
            ApiError::MissingIds(ids) => assert_eq!(ids, vec![foreign]),
            other => panic!("expected MissingIds, got {other:?}"),
        }
        assert_eq!(status_of(&mut conn, pending), "pending");
        assert_eq!(status_of(&mut conn, foreign), "pending");
    }

    #[test]
    fn test_bulk_sign_splits_pending_and_signed() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let writer = user(UserRole::Hq, &hq, None);
        let project = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let pending = insert_inspection(&mut conn, project, "pending");
        let signed = insert_inspection(&mut conn, project, "signed");

        let result = bulk_sign(&mut conn, &writer, &[pending, signed], &signature(&writer))
            .unwrap();
        assert_eq!(result.signed, vec![pending]);
        assert_eq!(result.already_signed, vec![signed]);
        assert_eq!(status_of(&mut conn, pending), "signed");
    }

    #[test]
    fn test_bulk_sign_waits_for_concurrent_single_sign() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let writer = user(UserRole::Hq, &hq, None);
        let project = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let raced = insert_inspection(&mut conn, project, "pending");
        let other = insert_inspection(&mut conn, project, "pending");

        let (locked_tx, locked_rx) = mpsc::channel();
        let mut rival = pool().unwrap().get().unwrap();
        let signer = thread::spawn(move || {
            rival
                .transaction::<_, diesel::result::Error, _>(|conn| {
                    diesel::update(manager_inspections::table.find(raced))
                        .set(manager_inspections::status.eq("signed"))
                        .execute(conn)?;
                    locked_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
                .unwrap();
        });

        locked_rx.recv().unwrap();
        let result = bulk_sign(&mut conn, &writer, &[raced, other], &signature(&writer)).unwrap();
        signer.join().unwrap();

        assert_eq!(result.signed, vec![other]);
        assert_eq!(result.already_signed, vec![raced]);
    }

    #[test]
    fn test_sign_twice_is_rejected() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let writer = user(UserRole::Hq, &hq, None);
        let project = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let id = insert_inspection(&mut conn, project, "pending");

        let signed = sign_inspection(&mut conn, &writer, id, &signature(&writer)).unwrap();
        assert_eq!(signed.status, "signed");
        assert_eq!(signed.signer_name.as_deref(), Some("박소장"));

        let again = sign_inspection(&mut conn, &writer, id, &signature(&writer));
        assert!(matches!(again, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_reorder_rejects_bad_batches() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let manager = user(UserRole::Hq, &hq, None);
        let a = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let b = insert_project(&mut conn, &hq, "강남지사", "B현장", 1);
        let foreign = insert_project(&mut conn, &unique_hq(), "수원지사", "C현장", 0);

        let duplicate = reorder_projects(&mut conn, &manager, &[a, b, a]);
        assert!(matches!(duplicate, Err(ApiError::Validation(_))));

        let unknown = Uuid::new_v4();
        match reorder_projects(&mut conn, &manager, &[b, unknown]) {
            Err(ApiError::MissingIds(ids)) => assert_eq!(ids, vec![unknown]),
            other => panic!("expected MissingIds, got {other:?}"),
        }

        let out_of_scope = reorder_projects(&mut conn, &manager, &[b, foreign]);
        assert!(matches!(out_of_scope, Err(ApiError::Forbidden(_))));

        let names: Vec<String> = load_ordered_projects(&mut conn, &manager)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["A현장", "B현장"]);
    }

    #[test]
    fn test_reorder_persists_client_order() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let manager = user(UserRole::Hq, &hq, None);
        let a = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let b = insert_project(&mut conn, &hq, "강남지사", "B현장", 1);
        let c = insert_project(&mut conn, &hq, "강남지사", "C현장", 2);

        let ordered = reorder_projects(&mut conn, &manager, &[c, a, b]).unwrap();
        let ids: Vec<Uuid> = ordered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn test_move_persists_order() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let manager = user(UserRole::Hq, &hq, None);
        let a = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let b = insert_project(&mut conn, &hq, "강남지사", "B현장", 1);
        let c = insert_project(&mut conn, &hq, "강남지사", "C현장", 2);

        let moved = move_project(&mut conn, &manager, c, 0).unwrap();
        let ids: Vec<Uuid> = moved.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![c, a, b]);

        let reloaded = load_ordered_projects(&mut conn, &manager).unwrap();
        let persisted: Vec<(Uuid, i32)> = reloaded.iter().map(|p| (p.id, p.display_order)).collect();
        assert_eq!(persisted, vec![(c, 0), (a, 1), (b, 2)]);

        let missing = move_project(&mut conn, &manager, Uuid::new_v4(), 0);
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_next_display_order_is_scoped() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let manager = user(UserRole::Hq, &hq, None);
        assert_eq!(next_display_order(&mut conn, &manager).unwrap(), 0);

        insert_project(&mut conn, &hq, "강남지사", "A현장", 4);
        insert_project(&mut conn, &unique_hq(), "수원지사", "B현장", 900);
        assert_eq!(next_display_order(&mut conn, &manager).unwrap(), 5);
    }

    fn heat_check(project_id: Uuid, temperature: f64, water: bool) -> DbHeatWaveCheck {
        let now = Utc::now();
        DbHeatWaveCheck {
            id: Uuid::new_v4(),
            project_id,
            check_date: date(),
            temperature: Some(temperature),
            feels_like: Some(temperature),
            alert_level: "warning".to_string(),
            water_supplied: water,
            shade_available: false,
            rest_provided: false,
            work_adjusted: false,
            emergency_ready: false,
            notes: None,
            checked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_heat_wave_upsert_overwrites_same_day() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let project = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);

        let first = upsert_check(&mut conn, &heat_check(project, 33.0, false)).unwrap();
        let second = upsert_check(&mut conn, &heat_check(project, 35.5, true)).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.temperature, Some(35.5));
        assert!(second.water_supplied);

        let rows: i64 = heat_wave_checks::table
            .filter(heat_wave_checks::project_id.eq(project))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_summaries_list_idle_sites_and_skip_completed() {
        let mut conn = conn_or_skip!();
        let hq = unique_hq();
        let viewer = user(UserRole::Viewer, &hq, None);
        let busy = insert_project(&mut conn, &hq, "강남지사", "A현장", 0);
        let idle = insert_project(&mut conn, &hq, "서초지사", "B현장", 1);
        insert_project_with(&mut conn, &hq, "강남지사", "C현장", 2, QuarterStatus::completed());

        let now = Utc::now();
        let tbm = DbTbmSubmission {
            id: Uuid::new_v4(),
            project_id: busy,
            meeting_date: date(),
            leader_name: "이반장".to_string(),
            attendee_count: 7,
            work_content: "거푸집 설치".to_string(),
            risk_factors: None,
            safety_measures: None,
            remarks: None,
            photo_url: None,
            submitted_by: None,
            created_at: now,
        };
        diesel::insert_into(sitesafe::core::shared::schema::tbm_submissions::table)
            .values(&tbm)
            .execute(&mut conn)
            .unwrap();
        upsert_check(&mut conn, &heat_check(busy, 34.0, true)).unwrap();

        let summary = tbm_storage::daily_summary(&mut conn, &viewer, date()).unwrap();
        let rows: Vec<(Uuid, i64, i64)> = summary
            .projects
            .iter()
            .map(|r| (r.project_id, r.submissions, r.attendees))
            .collect();
        assert_eq!(rows, vec![(busy, 1, 7), (idle, 0, 0)]);
        assert_eq!(summary.total_projects, 2);
        assert_eq!(summary.submitted_projects, 1);

        let summary = heat_wave_storage::daily_summary(&mut conn, &viewer, date()).unwrap();
        let ids: Vec<Uuid> = summary.projects.iter().map(|r| r.project_id).collect();
        assert_eq!(ids, vec![busy, idle]);
        assert!(summary.projects[0].check.is_some());
        assert!(summary.projects[1].check.is_none());
        assert_eq!(summary.checked_projects, 1);
        let average = summary.average_compliance.unwrap();
        assert!((average - 0.2).abs() < 1e-9);
    }
}
