use rollcall_core::{
    open_db_in_memory, AccessError, Actor, Capacity, CommitPolicy, NoopNotifier, NotFoundTarget,
    Registrant, RegistrantKey, RegistrationError, RegistrationService, SessionDraft,
    SessionPatch, SessionService, SessionStatus, SignupStatus, SqliteRegistrationRepository,
    SqliteSessionRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

const HOUR_MS: i64 = 60 * 60 * 1000;

fn sessions(conn: &Connection) -> SessionService<SqliteSessionRepository<'_>> {
    SessionService::new(SqliteSessionRepository::new(conn), CommitPolicy::default())
}

fn draft(topic: &str, start_at: i64, capacity: Capacity) -> SessionDraft {
    SessionDraft {
        topic: topic.to_string(),
        instructor: "Prof. Lin".to_string(),
        location: "Library 3F".to_string(),
        start_at,
        end_at: None,
        capacity,
    }
}

#[test]
fn add_session_defaults_end_time_and_opens() {
    let conn = open_db_in_memory().unwrap();
    let session = sessions(&conn)
        .add_session(
            &Actor::Admin,
            &draft("  Torts Review ", 10 * HOUR_MS, Capacity::limited(12).unwrap()),
        )
        .unwrap();

    assert_eq!(session.topic, "Torts Review");
    assert_eq!(session.end_at, 11 * HOUR_MS);
    assert_eq!(session.status, SessionStatus::Open);
    assert_eq!((session.confirmed_count, session.waitlist_count), (0, 0));
    assert_eq!(session.seats_left(), Some(12));
}

#[test]
fn add_session_rejects_inverted_range() {
    let conn = open_db_in_memory().unwrap();
    let mut bad = draft("Evidence", 10 * HOUR_MS, Capacity::Unlimited);
    bad.end_at = Some(9 * HOUR_MS);

    let err = sessions(&conn).add_session(&Actor::Admin, &bad).unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidInput(_)));
}

#[test]
fn list_sessions_orders_by_start_time() {
    let conn = open_db_in_memory().unwrap();
    let service = sessions(&conn);
    for (topic, hour) in [("late", 30), ("early", 5), ("middle", 12)] {
        service
            .add_session(&Actor::Admin, &draft(topic, hour * HOUR_MS, Capacity::Unlimited))
            .unwrap();
    }

    let topics: Vec<String> = service
        .list_sessions()
        .unwrap()
        .into_iter()
        .map(|session| session.topic)
        .collect();
    assert_eq!(topics, vec!["early", "middle", "late"]);
}

#[test]
fn patch_updates_metadata_but_not_counters() {
    let conn = open_db_in_memory().unwrap();
    let service = sessions(&conn);
    let session = service
        .add_session(
            &Actor::Admin,
            &draft("Contracts", HOUR_MS, Capacity::limited(2).unwrap()),
        )
        .unwrap();
    RegistrationService::new(
        SqliteRegistrationRepository::new(&conn),
        NoopNotifier,
        CommitPolicy::default(),
    )
    .register(
        &Actor::Admin,
        session.id,
        &Registrant::new("Ada", "ada@law.edu"),
    )
    .unwrap();

    let patch = SessionPatch {
        location: Some("Auditorium".to_string()),
        capacity: Some(Capacity::limited(1).unwrap()),
        ..SessionPatch::default()
    };
    let updated = service
        .update_session(&Actor::Admin, session.id, &patch)
        .unwrap();

    assert_eq!(updated.location, "Auditorium");
    assert_eq!(updated.capacity, Capacity::limited(1).unwrap());
    assert_eq!(updated.confirmed_count, 1);
    assert_eq!(updated.seats_left(), Some(0));
}

#[test]
fn lowering_capacity_keeps_existing_confirmations() {
    let conn = open_db_in_memory().unwrap();
    let service = sessions(&conn);
    let session = service
        .add_session(
            &Actor::Admin,
            &draft("Property", HOUR_MS, Capacity::limited(3).unwrap()),
        )
        .unwrap();
    let registrations = RegistrationService::new(
        SqliteRegistrationRepository::new(&conn),
        NoopNotifier,
        CommitPolicy::default(),
    );
    for email in ["a@law.edu", "b@law.edu", "c@law.edu"] {
        registrations
            .register(&Actor::Admin, session.id, &Registrant::new("S", email))
            .unwrap();
    }

    let patch = SessionPatch {
        capacity: Some(Capacity::limited(1).unwrap()),
        ..SessionPatch::default()
    };
    let shrunk = service
        .update_session(&Actor::Admin, session.id, &patch)
        .unwrap();
    assert_eq!(shrunk.confirmed_count, 3);
    assert_eq!(shrunk.seats_left(), Some(0));

    let late = registrations
        .register(&Actor::Admin, session.id, &Registrant::new("S", "d@law.edu"))
        .unwrap();
    assert_eq!(late.status, SignupStatus::Waitlist);
}

#[test]
fn set_session_status_toggles_registration_gate() {
    let conn = open_db_in_memory().unwrap();
    let service = sessions(&conn);
    let session = service
        .add_session(&Actor::Admin, &draft("Crim Law", HOUR_MS, Capacity::Unlimited))
        .unwrap();

    let closed = service
        .set_session_status(&Actor::Admin, session.id, SessionStatus::Closed)
        .unwrap();
    assert!(!closed.is_open());

    let reopened = service
        .set_session_status(&Actor::Admin, session.id, SessionStatus::Open)
        .unwrap();
    assert!(reopened.is_open());
}

#[test]
fn delete_session_cascades_signups() {
    let conn = open_db_in_memory().unwrap();
    let service = sessions(&conn);
    let session = service
        .add_session(
            &Actor::Admin,
            &draft("Civ Pro", HOUR_MS, Capacity::limited(1).unwrap()),
        )
        .unwrap();
    let registrations = RegistrationService::new(
        SqliteRegistrationRepository::new(&conn),
        NoopNotifier,
        CommitPolicy::default(),
    );
    for email in ["a@law.edu", "b@law.edu"] {
        registrations
            .register(&Actor::Admin, session.id, &Registrant::new("S", email))
            .unwrap();
    }

    let removal = service.delete_session(&Actor::Admin, session.id).unwrap();
    assert_eq!(removal.signups_removed, 2);
    assert!(service.get_session(session.id).unwrap().is_none());

    let orphans: i64 = conn
        .query_row("SELECT COUNT(*) FROM signups;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphans, 0);

    let err = service.delete_session(&Actor::Admin, session.id).unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::NotFound(NotFoundTarget::Session(id)) if id == session.id
    ));
}

#[test]
fn empty_patch_on_missing_session_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = sessions(&conn)
        .update_session(&Actor::Admin, Uuid::new_v4(), &SessionPatch::default())
        .unwrap_err();
    assert!(matches!(err, RegistrationError::NotFound(_)));
}

#[test]
fn session_admin_requires_admin() {
    let conn = open_db_in_memory().unwrap();
    let actor = Actor::registrant(RegistrantKey::from_email("ada@law.edu").unwrap());

    let err = sessions(&conn)
        .add_session(&actor, &draft("Tax", HOUR_MS, Capacity::Unlimited))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Unauthorized(AccessError::AdminRequired(_))
    ));
    assert!(sessions(&conn).list_sessions().unwrap().is_empty());
}
