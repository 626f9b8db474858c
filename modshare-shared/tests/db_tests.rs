/// Integration tests for the data layer
///
/// Each test opens a fresh SQLite file in a temporary directory, applies the
/// embedded migrations and exercises the models against it.

use chrono::Duration;
use modshare_shared::db::{
    self,
    migrations::{get_migration_status, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use modshare_shared::models::{
    image::Image,
    module::{CreateModule, Module},
    review::{CreateReview, Review},
    session::Session,
    user::{CreateUser, UpdateProfile, User},
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Opens a migrated database; the TempDir must outlive the pool
async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("test.db").display()),
        max_connections: 4,
        min_connections: 0,
        ..Default::default()
    };

    let pool = create_pool(config).await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");

    (dir, pool)
}

async fn create_user(pool: &SqlitePool, username: &str) -> User {
    User::create(
        pool,
        CreateUser {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
        },
    )
    .await
    .expect("Failed to create user")
}

async fn create_module(pool: &SqlitePool, owner: &User, title: &str) -> Module {
    Module::create(
        pool,
        CreateModule {
            title: title.to_string(),
            description: "short".to_string(),
            long_description: None,
            author: owner.username.clone(),
            file_path: format!("/uploads/{}.zip", title),
            user_id: owner.id,
        },
    )
    .await
    .expect("Failed to create module")
}

#[tokio::test]
async fn test_migrations_apply_and_are_idempotent() {
    let (_dir, pool) = setup_db().await;

    let status = get_migration_status(&pool).await.unwrap();
    assert!(status.applied_migrations > 0);
    assert!(status.latest_version.is_some());

    run_migrations(&pool).await.expect("Second run should be a no-op");
    let again = get_migration_status(&pool).await.unwrap();
    assert_eq!(status.applied_migrations, again.applied_migrations);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_duplicate_username_is_unique_violation() {
    let (_dir, pool) = setup_db().await;

    create_user(&pool, "alice").await;
    let err = User::create(
        &pool,
        CreateUser {
            username: "alice".to_string(),
            password_hash: "$argon2id$other".to_string(),
        },
    )
    .await
    .unwrap_err();

    assert!(db::is_unique_violation(&err));
    assert_eq!(User::count_by_username(&pool, "alice").await.unwrap(), 1);

    // Case-sensitive: a different casing is a different user
    create_user(&pool, "Alice").await;
}

#[tokio::test]
async fn test_update_profile_writes_only_supplied_fields() {
    let (_dir, pool) = setup_db().await;
    let user = create_user(&pool, "alice").await;

    let updated = User::update_profile(
        &pool,
        user.id,
        UpdateProfile {
            bio: Some("hello".to_string()),
            profile_picture: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hello"));
    assert!(updated.profile_picture.is_none());

    let updated = User::update_profile(
        &pool,
        user.id,
        UpdateProfile {
            bio: None,
            profile_picture: Some("/uploads/1-me.png".to_string()),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hello"));
    assert_eq!(updated.profile_picture.as_deref(), Some("/uploads/1-me.png"));

    assert!(User::update_profile(&pool, 9999, UpdateProfile {
        bio: Some("x".to_string()),
        ..Default::default()
    })
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn test_update_password() {
    let (_dir, pool) = setup_db().await;
    let user = create_user(&pool, "alice").await;

    assert!(User::update_password(&pool, user.id, "$argon2id$new").await.unwrap());
    let reloaded = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.password_hash, "$argon2id$new");

    assert!(!User::update_password(&pool, 4242, "$argon2id$x").await.unwrap());
}

#[tokio::test]
async fn test_module_with_images_in_transaction() {
    let (_dir, pool) = setup_db().await;
    let user = create_user(&pool, "alice").await;

    let mut tx = pool.begin().await.unwrap();
    let module = Module::create(
        &mut *tx,
        CreateModule {
            title: "Dungeon".to_string(),
            description: "short".to_string(),
            long_description: Some("long".to_string()),
            author: user.username.clone(),
            file_path: "/uploads/1-d.zip".to_string(),
            user_id: user.id,
        },
    )
    .await
    .unwrap();
    Image::create(&mut *tx, module.id, "/uploads/2-a.png").await.unwrap();
    Image::create(&mut *tx, module.id, "/uploads/3-b.png").await.unwrap();
    tx.commit().await.unwrap();

    let paths = Image::paths_by_module(&pool, module.id).await.unwrap();
    assert_eq!(paths, vec!["/uploads/2-a.png", "/uploads/3-b.png"]);

    let found = Module::find_by_id(&pool, module.id).await.unwrap().unwrap();
    assert_eq!(found.title, "Dungeon");
    assert_eq!(found.author, "alice");
    assert_eq!(found.long_description.as_deref(), Some("long"));
}

#[tokio::test]
async fn test_rolled_back_transaction_leaves_nothing() {
    let (_dir, pool) = setup_db().await;
    let user = create_user(&pool, "alice").await;

    {
        let mut tx = pool.begin().await.unwrap();
        let module = Module::create(
            &mut *tx,
            CreateModule {
                title: "Ghost".to_string(),
                description: "short".to_string(),
                long_description: None,
                author: user.username.clone(),
                file_path: "/uploads/1-g.zip".to_string(),
                user_id: user.id,
            },
        )
        .await
        .unwrap();
        Image::create(&mut *tx, module.id, "/uploads/2-g.png").await.unwrap();
        tx.rollback().await.unwrap();
    }

    assert_eq!(Module::count(&pool).await.unwrap(), 0);
    assert_eq!(Image::count(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_module_listing_order_and_ownership() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;

    let first = create_module(&pool, &alice, "first").await;
    let second = create_module(&pool, &bob, "second").await;
    let third = create_module(&pool, &alice, "third").await;

    let all: Vec<i64> = Module::list_all(&pool).await.unwrap().iter().map(|m| m.id).collect();
    assert_eq!(all, vec![first.id, second.id, third.id]);

    let mine: Vec<String> = Module::list_by_user(&pool, alice.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.title)
        .collect();
    assert_eq!(mine, vec!["first", "third"]);

    assert_eq!(
        Module::file_path_by_id(&pool, second.id).await.unwrap().as_deref(),
        Some("/uploads/second.zip")
    );
    assert!(Module::file_path_by_id(&pool, 999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_module_requires_existing_owner() {
    let (_dir, pool) = setup_db().await;

    let err = Module::create(
        &pool,
        CreateModule {
            title: "Orphan".to_string(),
            description: "short".to_string(),
            long_description: None,
            author: "nobody".to_string(),
            file_path: "/uploads/o.zip".to_string(),
            user_id: 12345,
        },
    )
    .await
    .unwrap_err();

    assert!(db::is_foreign_key_violation(&err));
}

#[tokio::test]
async fn test_one_review_per_user_per_module() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;
    let module = create_module(&pool, &alice, "Dungeon").await;

    let first = Review::create(
        &pool,
        CreateReview {
            module_id: module.id,
            user_id: alice.id,
            rating: 4.5,
            review_text: Some("great".to_string()),
        },
    )
    .await
    .unwrap();

    let err = Review::create(
        &pool,
        CreateReview {
            module_id: module.id,
            user_id: alice.id,
            rating: 1.0,
            review_text: Some("changed my mind".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert!(db::is_unique_violation(&err));

    let stored = Review::find_by_module_and_user(&pool, module.id, alice.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.rating, 4.5);
    assert_eq!(stored.review_text.as_deref(), Some("great"));
}

#[tokio::test]
async fn test_review_for_missing_module_is_foreign_key_violation() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;

    let err = Review::create(
        &pool,
        CreateReview {
            module_id: 777,
            user_id: alice.id,
            rating: 3.0,
            review_text: None,
        },
    )
    .await
    .unwrap_err();

    assert!(db::is_foreign_key_violation(&err));
}

#[tokio::test]
async fn test_reviews_newest_first_and_average() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;
    let bob = create_user(&pool, "bob").await;
    let module = create_module(&pool, &alice, "Dungeon").await;

    let empty = Review::rating_summary(&pool, module.id).await.unwrap();
    assert_eq!(empty.average, None);
    assert_eq!(empty.count, 0);

    for (user, rating) in [(&alice, 4.0), (&bob, 2.0)] {
        Review::create(
            &pool,
            CreateReview {
                module_id: module.id,
                user_id: user.id,
                rating,
                review_text: None,
            },
        )
        .await
        .unwrap();
    }

    let reviews = Review::list_by_module(&pool, module.id).await.unwrap();
    let names: Vec<&str> = reviews.iter().map(|r| r.username.as_str()).collect();
    assert_eq!(names, vec!["bob", "alice"]);

    let summary = Review::rating_summary(&pool, module.id).await.unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.average, Some(3.0));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;

    let live = Session::create(&pool, "live-session", alice.id, "alice", Duration::hours(24))
        .await
        .unwrap();
    assert!(live.expires_at > live.created_at);
    assert_eq!(
        live.expires_at - live.created_at,
        Duration::hours(24)
    );

    let found = Session::find_active(&pool, "live-session").await.unwrap().unwrap();
    assert_eq!(found.user_id, alice.id);
    assert_eq!(found.username, "alice");

    assert!(Session::delete(&pool, "live-session").await.unwrap());
    assert!(!Session::delete(&pool, "live-session").await.unwrap());
    assert!(Session::find_active(&pool, "live-session").await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_sessions_are_not_active() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;

    Session::create(&pool, "stale", alice.id, "alice", Duration::seconds(-1))
        .await
        .unwrap();
    Session::create(&pool, "stale-2", alice.id, "alice", Duration::seconds(-5))
        .await
        .unwrap();
    Session::create(&pool, "fresh", alice.id, "alice", Duration::hours(1))
        .await
        .unwrap();

    assert!(Session::find_active(&pool, "stale").await.unwrap().is_none());
    assert_eq!(Session::delete_expired(&pool).await.unwrap(), 1);
    assert!(Session::find_active(&pool, "fresh").await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_writes_are_visible_on_other_connections() {
    let (_dir, pool) = setup_db().await;
    let owner = create_user(&pool, "owner").await;
    let module = create_module(&pool, &owner, "Dungeon").await;

    // Two readers held at a time leave the other pool connections for writes
    let readers = std::sync::Arc::new(tokio::sync::Semaphore::new(2));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let pool = pool.clone();
        let readers = readers.clone();
        let module_id = module.id;
        tasks.spawn(async move {
            let username = format!("user{}", i);
            let _permit = readers.acquire_owned().await.unwrap();

            // Holding a connection forces every write below onto another one
            let mut reader = pool.acquire().await.unwrap();

            let user = create_user(&pool, &username).await;
            let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
                .bind(&username)
                .fetch_one(&mut *reader)
                .await
                .unwrap();
            assert_eq!(seen, 1, "{} not visible after create", username);

            let session_id = format!("session-{}", i);
            Session::create(&pool, &session_id, user.id, &username, Duration::hours(1))
                .await
                .unwrap();
            let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE id = ?")
                .bind(&session_id)
                .fetch_one(&mut *reader)
                .await
                .unwrap();
            assert_eq!(seen, 1, "{} not visible after create", session_id);

            Review::create(
                &pool,
                CreateReview {
                    module_id,
                    user_id: user.id,
                    rating: 4.0,
                    review_text: None,
                },
            )
            .await
            .unwrap();
            let seen: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = ?")
                    .bind(user.id)
                    .fetch_one(&mut *reader)
                    .await
                    .unwrap();
            assert_eq!(seen, 1, "review by {} not visible after create", username);

            drop(reader);

            let updated = User::update_profile(
                &pool,
                user.id,
                UpdateProfile {
                    bio: Some(format!("bio {}", i)),
                    profile_picture: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
            assert_eq!(updated.bio.as_deref(), Some(format!("bio {}", i).as_str()));

            let reread = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
            assert_eq!(reread.bio, updated.bio);
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    assert_eq!(Review::rating_summary(&pool, module.id).await.unwrap().count, 16);
}
