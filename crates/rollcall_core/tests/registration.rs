use rollcall_core::{
    open_db_in_memory, AccessError, Actor, Capacity, CommitPolicy, NotFoundTarget, Notifier,
    NotifyError, Registrant, RegistrantKey, RegistrationError, RegistrationNotice,
    RegistrationService, SessionDraft, SessionId, SessionRepository, SessionService,
    SessionStatus, SignupRemoval, SignupStatus, SqliteNotificationOutbox,
    SqliteRegistrationRepository, SqliteSessionRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

const START_AT: i64 = 1_767_225_600_000;

fn add_session(conn: &Connection, capacity: Capacity) -> SessionId {
    let service = SessionService::new(SqliteSessionRepository::new(conn), CommitPolicy::default());
    let draft = SessionDraft {
        topic: "Legal Writing Workshop".to_string(),
        instructor: "Prof. Okafor".to_string(),
        location: "Room 204".to_string(),
        start_at: START_AT,
        end_at: None,
        capacity,
    };
    service.add_session(&Actor::Admin, &draft).unwrap().id
}

fn registration_service(
    conn: &Connection,
) -> RegistrationService<SqliteRegistrationRepository<'_>, SqliteNotificationOutbox<'_>> {
    RegistrationService::new(
        SqliteRegistrationRepository::new(conn),
        SqliteNotificationOutbox::new(conn),
        CommitPolicy::default(),
    )
}

fn registrant(index: usize) -> Registrant {
    Registrant::new(format!("Student {index}"), format!("student{index}@law.edu"))
}

fn session_counts(conn: &Connection, session_id: SessionId) -> (u32, u32) {
    let session = SqliteSessionRepository::new(conn)
        .get_session(session_id)
        .unwrap()
        .unwrap();
    (session.confirmed_count, session.waitlist_count)
}

#[test]
fn fills_capacity_then_waitlists() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(2).unwrap());
    let service = registration_service(&conn);

    let statuses: Vec<SignupStatus> = (0..4)
        .map(|i| {
            service
                .register(&Actor::Admin, session_id, &registrant(i))
                .unwrap()
                .status
        })
        .collect();

    assert_eq!(
        statuses,
        vec![
            SignupStatus::Confirmed,
            SignupStatus::Confirmed,
            SignupStatus::Waitlist,
            SignupStatus::Waitlist,
        ]
    );
    assert_eq!(session_counts(&conn, session_id), (2, 2));
}

#[test]
fn unlimited_session_confirms_everyone() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::from_raw(-1).unwrap());
    let service = registration_service(&conn);

    for i in 0..25 {
        let outcome = service
            .register(&Actor::Admin, session_id, &registrant(i))
            .unwrap();
        assert_eq!(outcome.status, SignupStatus::Confirmed);
    }
    assert_eq!(session_counts(&conn, session_id), (25, 0));
}

#[test]
fn duplicate_email_is_rejected_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(5).unwrap());
    let service = registration_service(&conn);

    let first = service
        .register(
            &Actor::Admin,
            session_id,
            &Registrant::new("Ada", "ada@law.edu"),
        )
        .unwrap();
    let err = service
        .register(
            &Actor::Admin,
            session_id,
            &Registrant::new("Ada L.", "  ADA@Law.edu "),
        )
        .unwrap_err();

    match err {
        RegistrationError::Duplicate {
            session_id: dup_session,
            registrant_key,
        } => {
            assert_eq!(dup_session, session_id);
            assert_eq!(registrant_key.as_str(), "ada@law.edu");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session_counts(&conn, session_id), (1, 0));

    let existing = service
        .get_signup_by_registrant(session_id, "Ada@law.edu")
        .unwrap()
        .unwrap();
    assert_eq!(existing.id, first.signup_id);
}

#[test]
fn closed_session_rejects_registration() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(5).unwrap());
    SessionService::new(SqliteSessionRepository::new(&conn), CommitPolicy::default())
        .set_session_status(&Actor::Admin, session_id, SessionStatus::Closed)
        .unwrap();

    let err = registration_service(&conn)
        .register(&Actor::Admin, session_id, &registrant(1))
        .unwrap_err();
    assert!(matches!(err, RegistrationError::Closed(id) if id == session_id));
    assert_eq!(session_counts(&conn, session_id), (0, 0));
}

#[test]
fn unknown_session_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let missing = Uuid::new_v4();

    let err = registration_service(&conn)
        .register(&Actor::Admin, missing, &registrant(1))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::NotFound(NotFoundTarget::Session(id)) if id == missing
    ));
}

#[test]
fn malformed_email_is_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(5).unwrap());

    let err = registration_service(&conn)
        .register(
            &Actor::Admin,
            session_id,
            &Registrant::new("Ada", "not-an-email"),
        )
        .unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidInput(_)));
}

#[test]
fn registrant_cannot_sign_up_someone_else() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(5).unwrap());
    let actor = Actor::registrant(RegistrantKey::from_email("ada@law.edu").unwrap());
    let service = registration_service(&conn);

    let err = service
        .register(&actor, session_id, &Registrant::new("Bo", "bo@law.edu"))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Unauthorized(AccessError::NotOwner)
    ));

    let outcome = service
        .register(&actor, session_id, &Registrant::new("Ada", "Ada@law.edu"))
        .unwrap();
    assert_eq!(outcome.status, SignupStatus::Confirmed);
}

#[test]
fn registrant_cannot_file_signup_under_another_account() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(5).unwrap());
    let service = registration_service(&conn);
    let mallory = Actor::registrant_with_user(
        RegistrantKey::from_email("mallory@law.edu").unwrap(),
        "mallory-uid",
    );

    let err = service
        .register(
            &mallory,
            session_id,
            &Registrant::new("Mallory", "mallory@law.edu").with_user_id("victim-uid"),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Unauthorized(AccessError::NotOwner)
    ));
    assert!(service
        .list_registrations_for_user("victim-uid")
        .unwrap()
        .is_empty());
    assert_eq!(session_counts(&conn, session_id), (0, 0));

    let outcome = service
        .register(
            &mallory,
            session_id,
            &Registrant::new("Mallory", "mallory@law.edu"),
        )
        .unwrap();
    assert_eq!(outcome.signup.user_id.as_deref(), Some("mallory-uid"));
    assert_eq!(
        service
            .list_registrations_for_user("mallory-uid")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn cancel_own_signup_releases_seat_without_promotion() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(1).unwrap());
    let service = registration_service(&conn);

    let ada = Actor::registrant(RegistrantKey::from_email("ada@law.edu").unwrap());
    service
        .register(&ada, session_id, &Registrant::new("Ada", "ada@law.edu"))
        .unwrap();
    let waiting = service
        .register(&Actor::Admin, session_id, &registrant(2))
        .unwrap();
    assert_eq!(waiting.status, SignupStatus::Waitlist);

    let removal = service.cancel_own_signup(&ada, session_id).unwrap();
    assert!(matches!(removal, SignupRemoval::Removed { .. }));
    assert_eq!(session_counts(&conn, session_id), (0, 1));

    let again = service.cancel_own_signup(&ada, session_id).unwrap();
    assert_eq!(again, SignupRemoval::AlreadyGone);
    assert_eq!(session_counts(&conn, session_id), (0, 1));

    let err = service
        .cancel_own_signup(&Actor::Admin, session_id)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Unauthorized(AccessError::RegistrantRequired)
    ));
}

#[test]
fn waitlist_positions_follow_registration_order() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(1).unwrap());
    let service = registration_service(&conn);

    let outcomes: Vec<_> = (0..4)
        .map(|i| {
            service
                .register(&Actor::Admin, session_id, &registrant(i))
                .unwrap()
        })
        .collect();

    assert_eq!(
        service
            .waitlist_position(session_id, outcomes[0].signup_id)
            .unwrap(),
        None
    );
    for (expected, outcome) in outcomes[1..].iter().enumerate() {
        assert_eq!(
            service
                .waitlist_position(session_id, outcome.signup_id)
                .unwrap(),
            Some(expected as u32 + 1)
        );
    }
}

#[test]
fn user_history_spans_sessions() {
    let conn = open_db_in_memory().unwrap();
    let first = add_session(&conn, Capacity::limited(1).unwrap());
    let second = add_session(&conn, Capacity::limited(1).unwrap());
    let service = registration_service(&conn);

    let form = Registrant::new("Ada", "ada@law.edu").with_user_id("user-42");
    service.register(&Actor::Admin, first, &form).unwrap();
    service.register(&Actor::Admin, second, &form).unwrap();
    service
        .register(&Actor::Admin, second, &registrant(9))
        .unwrap();

    let history = service.list_registrations_for_user("user-42").unwrap();
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|entry| entry.signup.user_id.as_deref() == Some("user-42")));
    assert!(history
        .iter()
        .all(|entry| entry.topic == "Legal Writing Workshop"));
}

#[test]
fn committed_registration_enqueues_notification() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(1).unwrap());
    let service = registration_service(&conn);

    service
        .register(&Actor::Admin, session_id, &registrant(1))
        .unwrap();
    service
        .register(&Actor::Admin, session_id, &registrant(2))
        .unwrap();

    let outbox = SqliteNotificationOutbox::new(&conn);
    let pending = outbox.pending(10).unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].recipient_email, "student1@law.edu");
    assert_eq!(pending[0].payload.status, SignupStatus::Confirmed);
    assert_eq!(pending[1].payload.status, SignupStatus::Waitlist);
    assert_eq!(pending[1].payload.location, "Room 204");

    assert!(outbox.mark_delivered(pending[0].id).unwrap());
    assert!(!outbox.mark_delivered(pending[0].id).unwrap());
    assert_eq!(outbox.pending(10).unwrap().len(), 1);
}

struct BrokenMailer;

impl Notifier for BrokenMailer {
    fn enqueue(&self, _notice: &RegistrationNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Sqlite(rusqlite::Error::InvalidQuery))
    }
}

#[test]
fn notification_failure_keeps_registration() {
    let conn = open_db_in_memory().unwrap();
    let session_id = add_session(&conn, Capacity::limited(3).unwrap());
    let service = RegistrationService::new(
        SqliteRegistrationRepository::new(&conn),
        BrokenMailer,
        CommitPolicy::default(),
    );

    let outcome = service
        .register(&Actor::Admin, session_id, &registrant(1))
        .unwrap();
    assert_eq!(outcome.status, SignupStatus::Confirmed);
    assert_eq!(session_counts(&conn, session_id), (1, 0));
}
