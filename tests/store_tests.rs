//! Store-level tests against a SQLite file.

use chrono::{Duration, NaiveDate};
use dochazka::config::SecurityConfig;
use dochazka::db::{NewUser, ResetToken, Store};

async fn temp_store() -> Store {
    let db_path =
        std::env::temp_dir().join(format!("dochazka-store-test-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("Failed to open store")
}

fn fast_security() -> SecurityConfig {
    SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    }
}

async fn create_user(store: &Store) -> i32 {
    store
        .create_user(
            NewUser {
                username: "jana".to_string(),
                email: "jana@example.com".to_string(),
                password: "secret1".to_string(),
                card_number: Some(42),
            },
            &fast_security(),
        )
        .await
        .unwrap()
        .id
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_user_password_roundtrip() {
    let store = temp_store().await;
    let id = create_user(&store).await;

    assert!(
        store
            .verify_user_password("jana@example.com", "secret1")
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .verify_user_password("jana@example.com", "nope")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        store
            .verify_user_password("nobody@example.com", "secret1")
            .await
            .unwrap()
            .is_none()
    );

    store
        .update_user_password(id, "changed1", &fast_security())
        .await
        .unwrap();
    assert!(
        store
            .verify_user_password("jana@example.com", "changed1")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_reset_token_reuse_and_single_use() {
    let store = temp_store().await;
    let user_id = create_user(&store).await;

    let first = store
        .get_or_create_reset_token(user_id, Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(first.value.len(), 64);

    let again = store
        .get_or_create_reset_token(user_id, Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(again.id, first.id);

    assert!(
        store
            .find_valid_reset_token(user_id, &first.value)
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .reset_password_with_token(&first, "changed1", &fast_security())
            .await
            .unwrap()
    );
    assert!(
        !store
            .reset_password_with_token(&first, "changed2", &fast_security())
            .await
            .unwrap()
    );
    assert!(
        store
            .verify_user_password("jana@example.com", "changed1")
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .find_valid_reset_token(user_id, &first.value)
            .await
            .unwrap()
            .is_none()
    );

    let next = store
        .get_or_create_reset_token(user_id, Duration::hours(1))
        .await
        .unwrap();
    assert_ne!(next.id, first.id);
}

#[tokio::test]
async fn test_expired_reset_token_is_not_valid() {
    let store = temp_store().await;
    let user_id = create_user(&store).await;

    let expired = store
        .get_or_create_reset_token(user_id, Duration::hours(-1))
        .await
        .unwrap();
    assert!(
        store
            .find_valid_reset_token(user_id, &expired.value)
            .await
            .unwrap()
            .is_none()
    );

    let fresh = store
        .get_or_create_reset_token(user_id, Duration::hours(1))
        .await
        .unwrap();
    assert_ne!(fresh.id, expired.id);
}

#[tokio::test]
async fn test_daily_summary_groups_by_day() {
    let store = temp_store().await;
    for (card, time) in [
        (42, "2024-02-29 23:50"),
        (42, "2024-03-01 08:00"),
        (42, "2024-03-01 16:00"),
        (42, "2024-03-02 09:15"),
        (43, "2024-03-01 07:00"),
    ] {
        let time = chrono::NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M").unwrap();
        store.record_punch(card, time).await.unwrap();
    }

    let rows = store
        .daily_punch_summary(42, date(2024, 3, 1), date(2024, 4, 1))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2024-03-01");
    assert_eq!(rows[0].first_punch, "08:00");
    assert_eq!(rows[0].last_punch, "16:00");
    assert!((rows[0].hours - 8.0).abs() < 1e-6);
    assert_eq!(rows[1].date, "2024-03-02");
    assert!(rows[1].hours.abs() < 1e-6);

    assert_eq!(
        store.punch_months(42).await.unwrap(),
        vec!["2024-03".to_string(), "2024-02".to_string()]
    );
}

#[tokio::test]
async fn test_work_day_edit_upsert() {
    let store = temp_store().await;
    let day = date(2024, 6, 3);

    assert!(store.get_work_day_edit(42, day).await.unwrap().is_none());

    let first = store
        .save_work_day_edit(42, day, "9:00", "11:00")
        .await
        .unwrap();
    let second = store
        .save_work_day_edit(42, day, "7:00", "15:30")
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.start_time, "7:00");
    assert_eq!(second.end_time, "15:30");

    store
        .save_work_day_edit(42, date(2024, 7, 1), "8:00", "12:00")
        .await
        .unwrap();
    let june = store
        .work_day_edits(42, date(2024, 6, 1), date(2024, 7, 1))
        .await
        .unwrap();
    assert_eq!(june.len(), 1);
}

#[tokio::test]
async fn test_email_lookup_ignores_case() {
    let store = temp_store().await;
    create_user(&store).await;

    let found = store.get_user_by_email(" Jana@Example.COM ").await.unwrap();
    assert!(found.is_some());
    assert!(!store.email_is_available("JANA@example.com").await.unwrap());
    assert!(!store.username_is_available("jana").await.unwrap());
    assert!(store.username_is_available("petr").await.unwrap());
}

#[tokio::test]
async fn test_punch_slice_without_limit_returns_everything() {
    let store = temp_store().await;
    for time in ["2024-03-01 08:00", "2024-03-01 16:00", "2024-04-02 09:00"] {
        let time = chrono::NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M").unwrap();
        store.record_punch(42, time).await.unwrap();
    }

    let all = store.punch_slice(0, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].time, "2024-04");

    let tail = store.punch_slice(1, None).await.unwrap();
    assert_eq!(tail.iter().map(|r| r.id).collect::<Vec<_>>(), vec![all[1].id, all[2].id]);

    let window = store.punch_slice(1, Some(1)).await.unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, all[1].id);
}

#[tokio::test]
async fn test_failed_password_write_keeps_reset_token() {
    let store = temp_store().await;
    let user_id = create_user(&store).await;

    let token = store
        .get_or_create_reset_token(user_id, Duration::hours(1))
        .await
        .unwrap();

    // Points the write at a user that does not exist
    let orphan = ResetToken {
        user_id: user_id + 1000,
        ..token.clone()
    };
    assert!(
        store
            .reset_password_with_token(&orphan, "changed1", &fast_security())
            .await
            .is_err()
    );

    assert!(
        store
            .find_valid_reset_token(user_id, &token.value)
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        store
            .reset_password_with_token(&token, "changed1", &fast_security())
            .await
            .unwrap()
    );
}
