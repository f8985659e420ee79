//! Runs against a real MySQL server started in Docker.
//!
//! `cargo test -p ember-storage -- --ignored` with a Docker daemon available.

use std::sync::Arc;
use std::time::Duration;

use ember_core::{Destination, OwnerId, ShortToken};
use ember_storage::{LinkRecord, LinkRepository, MySqlRepository, StorageError};
use ember_test_infra::mysql::{MySqlServer, MysqlConfig};
use jiff::{SignedDuration, Timestamp};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    repo: MySqlRepository,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let url = mysql.database_url().await.expect("mysql url");
        let pool = connect_with_retry(&url).await;

        let repo = MySqlRepository::new(pool);
        repo.ensure_schema().await.expect("create schema");

        Self {
            _mysql: mysql,
            repo,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
        {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

fn token(value: &str) -> ShortToken {
    ShortToken::new_unchecked(value)
}

fn record(code: &str, owner: &str, expires_at: Timestamp, click_limit: u32) -> LinkRecord {
    LinkRecord {
        short_token: token(code),
        owner_id: OwnerId::new_unchecked(owner),
        destination: Destination::new_unchecked("https://example.com"),
        expires_at,
        click_limit,
        click_count: 0,
        created_at: Timestamp::from_millisecond(Timestamp::now().as_millisecond()).unwrap(),
    }
}

fn in_one_hour() -> Timestamp {
    let later = Timestamp::now() + SignedDuration::from_hours(1);
    Timestamp::from_millisecond(later.as_millisecond()).unwrap()
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn insert_and_find_record() {
    let fixture = Fixture::start().await;
    let rec = record("abc123", "alice", in_one_hour(), 2);

    fixture.repo.insert(&rec).await.unwrap();

    let got = fixture
        .repo
        .find_by_token(&token("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got, rec);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn insert_conflicts_when_token_already_exists() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .insert(&record("abc123", "alice", in_one_hour(), 1))
        .await
        .unwrap();

    let err = fixture
        .repo
        .insert(&record("abc123", "bob", in_one_hour(), 1))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn concurrent_clicks_respect_the_limit() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .insert(&record("hot", "alice", in_one_hour(), 3))
        .await
        .unwrap();

    let repo = Arc::new(fixture.repo.clone());
    let mut handles = vec![];
    for _ in 0..10 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.record_click(&token("hot"), Timestamp::now())
                .await
                .unwrap()
                .is_some()
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 3);
    let rec = repo.find_by_token(&token("hot")).await.unwrap().unwrap();
    assert_eq!(rec.click_count, 3);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn delete_dead_removes_expired_and_exhausted() {
    let fixture = Fixture::start().await;
    let now = Timestamp::now();
    let past = now - SignedDuration::from_secs(1);

    fixture
        .repo
        .insert(&record("alive", "alice", in_one_hour(), 1))
        .await
        .unwrap();
    fixture
        .repo
        .insert(&record("expired", "alice", past, 1))
        .await
        .unwrap();
    fixture
        .repo
        .insert(&record("exhausted", "bob", in_one_hour(), 1))
        .await
        .unwrap();
    fixture
        .repo
        .update_click_count(&token("exhausted"), 1)
        .await
        .unwrap();

    let owner = OwnerId::new_unchecked("alice");
    assert_eq!(fixture.repo.delete_dead(now, Some(&owner)).await.unwrap(), 1);
    assert_eq!(fixture.repo.delete_dead(now, None).await.unwrap(), 1);
    assert_eq!(fixture.repo.delete_dead(now, None).await.unwrap(), 0);
    assert!(fixture.repo.exists(&token("alive")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn updates_are_scoped_to_the_owner() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .insert(&record("abc123", "alice", in_one_hour(), 1))
        .await
        .unwrap();
    let alice = OwnerId::new_unchecked("alice");
    let bob = OwnerId::new_unchecked("bob");

    assert!(!fixture
        .repo
        .update_click_limit(&token("abc123"), &bob, 9)
        .await
        .unwrap());
    assert!(fixture
        .repo
        .update_click_limit(&token("abc123"), &alice, 4)
        .await
        .unwrap());

    let deadline = in_one_hour() + SignedDuration::from_hours(1);
    assert!(fixture
        .repo
        .update_expiry(&token("abc123"), &alice, deadline)
        .await
        .unwrap());

    let rec = fixture
        .repo
        .find_by_token(&token("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rec.click_limit, 4);
    assert_eq!(rec.expires_at, deadline);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn delete_if_dead_spares_a_revived_record() {
    let fixture = Fixture::start().await;
    let now = Timestamp::now();
    let past = now - SignedDuration::from_secs(1);
    let alice = OwnerId::new_unchecked("alice");

    fixture
        .repo
        .insert(&record("expired", "alice", past, 1))
        .await
        .unwrap();
    fixture
        .repo
        .update_expiry(&token("expired"), &alice, in_one_hour())
        .await
        .unwrap();

    assert!(!fixture
        .repo
        .delete_if_dead(&token("expired"), &alice, now)
        .await
        .unwrap());
    assert!(fixture.repo.exists(&token("expired")).await.unwrap());

    fixture
        .repo
        .update_click_count(&token("expired"), 1)
        .await
        .unwrap();
    assert!(!fixture
        .repo
        .delete_if_dead(&token("expired"), &OwnerId::new_unchecked("bob"), now)
        .await
        .unwrap());
    assert!(fixture
        .repo
        .delete_if_dead(&token("expired"), &alice, now)
        .await
        .unwrap());
    assert!(!fixture.repo.exists(&token("expired")).await.unwrap());
}
