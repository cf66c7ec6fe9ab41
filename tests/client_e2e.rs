//! Client core against a live server on an ephemeral port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use scribe::blog::{Page, PageMeta};
use scribe::client::{
    ApiClient, ClientConfig, ClientError, FlashLevel, Freshness, Frontend, ListController,
    Mutation, MutationError, Outcome, PageSource, Phase, QueryCache, Resource, Scope,
};
use scribe::config::Config;
use scribe::db;
use scribe::db::models::{NewComment, NewPost, NewUser, Post, PostChanges};
use scribe::state::AppState;

struct TestServer {
    _dir: TempDir,
    config: ClientConfig,
}

async fn start_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    let app = scribe::routes::app(AppState {
        db: pool,
        config: Config::default(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        _dir: dir,
        config: ClientConfig {
            base_url: format!("http://{addr}/api/v1"),
            timeout_secs: 5,
            flash_ttl_secs: 5,
            ..Default::default()
        },
    }
}

fn frontend(server: &TestServer, confirm: bool) -> Frontend {
    Frontend::new(&server.config, Arc::new(move |_: &str| confirm)).unwrap()
}

async fn create_author(frontend: &Frontend) -> i64 {
    let outcome = frontend
        .mutations
        .submit(Mutation::CreateUser(NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }))
        .await
        .unwrap();
    match outcome {
        Outcome::Applied(Resource::User(user)) => user.id,
        other => panic!("unexpected outcome {other:?}"),
    }
}

async fn create_post(frontend: &Frontend, user_id: i64, title: &str) -> i64 {
    let outcome = frontend
        .mutations
        .submit(Mutation::CreatePost(NewPost {
            title: title.into(),
            body: "Body".into(),
            user_id: Some(user_id),
        }))
        .await
        .unwrap();
    match outcome {
        Outcome::Applied(Resource::Post(post)) => post.id,
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_list_presenter_pages_through_posts() {
    let server = start_server().await;
    let frontend = frontend(&server, true);
    let author = create_author(&frontend).await;
    for i in 1..=23 {
        create_post(&frontend, author, &format!("Post {i}")).await;
    }

    let posts = frontend.posts();
    assert!(posts.mount().await);
    posts
        .inspect(|p| {
            assert_eq!(p.phase(), Phase::Populated);
            assert_eq!(p.items().len(), 10);
            assert_eq!(p.previous_target(), None);
            assert_eq!(p.next_target(), Some(2));
        })
        .await;

    assert_eq!(posts.last().await, Some(true));
    posts
        .inspect(|p| {
            assert_eq!(p.requested_page(), 3);
            assert_eq!(p.items().len(), 3);
            assert_eq!(p.next_target(), None);
        })
        .await;
    assert_eq!(posts.next().await, None);

    // Beyond the end, the server clamps.
    assert!(posts.go_to(40).await);
    posts.inspect(|p| assert_eq!(p.requested_page(), 3)).await;
}

#[tokio::test]
async fn test_empty_lists() {
    let server = start_server().await;
    let frontend = frontend(&server, true);

    let posts = frontend.posts();
    posts.mount().await;
    posts
        .inspect(|p| {
            assert_eq!(p.phase(), Phase::Empty);
            let meta = p.page().unwrap().meta;
            assert_eq!(meta.current_page, 1);
            assert_eq!(meta.total_pages, 1);
            assert_eq!(meta.total_count, 0);
        })
        .await;
}

#[tokio::test]
async fn test_refresh_sees_writes_from_another_client() {
    let server = start_server().await;
    let reader = frontend(&server, true);
    let writer = frontend(&server, true);

    let posts = reader.posts();
    posts.mount().await;
    posts.inspect(|p| assert_eq!(p.phase(), Phase::Empty)).await;

    let author = create_author(&writer).await;
    create_post(&writer, author, "Written elsewhere").await;

    // The reader's cache was never invalidated, yet an explicit refresh
    // goes back to the server.
    assert!(posts.refresh().await);
    posts
        .inspect(|p| {
            assert_eq!(p.phase(), Phase::Populated);
            assert_eq!(p.page().unwrap().meta.total_count, 1);
            assert_eq!(p.items()[0].title, "Written elsewhere");
        })
        .await;

    let remounted = reader.posts();
    remounted.mount().await;
    remounted
        .inspect(|p| assert_eq!(p.page().unwrap().meta.total_count, 1))
        .await;
}

#[tokio::test]
async fn test_cached_pages_expire_after_ttl() {
    let mut server = start_server().await;
    server.config.cache_ttl_secs = 1;
    let reader = frontend(&server, true);
    let writer = frontend(&server, true);

    let empty = reader.fetcher.fetch::<Post>(None, 1).await.unwrap();
    assert_eq!(empty.meta.total_count, 0);

    let author = create_author(&writer).await;
    create_post(&writer, author, "Later").await;

    let cached = reader.fetcher.fetch::<Post>(None, 1).await.unwrap();
    assert_eq!(cached.meta.total_count, 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let fresh = reader.fetcher.fetch::<Post>(None, 1).await.unwrap();
    assert_eq!(fresh.meta.total_count, 1);
}

#[tokio::test]
async fn test_validation_errors_are_returned_not_flashed() {
    let server = start_server().await;
    let frontend = frontend(&server, true);
    let author = create_author(&frontend).await;
    frontend.flash.clear();

    let err = frontend
        .mutations
        .submit(Mutation::CreatePost(NewPost {
            title: String::new(),
            body: "Body".into(),
            user_id: Some(author),
        }))
        .await
        .unwrap_err();

    let errors = err.validation().expect("field errors");
    assert_eq!(errors.get("title"), Some("Title can't be blank"));
    assert!(frontend.flash.messages().is_empty());
    assert_eq!(frontend.cache().epoch(Scope::Posts), 0);
}

#[tokio::test]
async fn test_comment_mutations_refresh_lists() {
    let server = start_server().await;
    let frontend = frontend(&server, true);
    let author = create_author(&frontend).await;
    let post_id = create_post(&frontend, author, "Discussed").await;

    let posts = frontend.posts();
    posts.mount().await;
    let comments = frontend.comments(post_id);
    comments.mount().await;
    comments
        .inspect(|p| assert_eq!(p.phase(), Phase::Empty))
        .await;

    let outcome = frontend
        .mutations
        .submit(Mutation::CreateComment {
            post_id,
            comment: NewComment {
                body: "Great post".into(),
                user_id: Some(author),
                post_id: None,
            },
        })
        .await
        .unwrap();
    let Outcome::Applied(Resource::Comment(comment)) = outcome else {
        panic!("expected a comment");
    };

    assert_eq!(comments.refresh_if_stale().await, Some(true));
    comments
        .inspect(|p| {
            assert_eq!(p.phase(), Phase::Populated);
            assert_eq!(p.items()[0].body, "Great post");
        })
        .await;
    assert_eq!(posts.refresh_if_stale().await, Some(true));
    posts
        .inspect(|p| assert_eq!(p.items()[0].comments_count, 1))
        .await;
    assert_eq!(posts.refresh_if_stale().await, None);

    frontend
        .mutations
        .submit(Mutation::DeleteComment {
            post_id,
            comment_id: comment.id,
        })
        .await
        .unwrap();
    comments.refresh_if_stale().await;
    comments
        .inspect(|p| assert_eq!(p.page().unwrap().meta.total_count, 0))
        .await;

    let texts: Vec<String> = frontend
        .flash
        .messages()
        .into_iter()
        .filter(|m| m.level == FlashLevel::Success)
        .map(|m| m.text)
        .collect();
    assert!(texts.contains(&"Comment added successfully".to_string()));
    assert!(texts.contains(&"Comment deleted successfully".to_string()));
}

#[tokio::test]
async fn test_declined_delete_keeps_post() {
    let server = start_server().await;
    let creator = frontend(&server, true);
    let author = create_author(&creator).await;
    let post_id = create_post(&creator, author, "Keep me").await;

    let hesitant = frontend(&server, false);
    let outcome = hesitant
        .mutations
        .submit(Mutation::DeletePost { id: post_id })
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Cancelled);

    let client = ApiClient::new(&server.config).unwrap();
    assert_eq!(client.get_post(post_id).await.unwrap().title, "Keep me");
}

#[tokio::test]
async fn test_update_and_delete_post() {
    let server = start_server().await;
    let frontend = frontend(&server, true);
    let author = create_author(&frontend).await;
    let post_id = create_post(&frontend, author, "Draft").await;

    let post = frontend.fetcher.post(post_id).await.unwrap();
    assert_eq!(post.title, "Draft");

    frontend
        .mutations
        .submit(Mutation::UpdatePost {
            id: post_id,
            changes: PostChanges {
                title: Some("Final".into()),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    // The cached detail was invalidated by the update.
    assert_eq!(frontend.fetcher.post(post_id).await.unwrap().title, "Final");

    frontend
        .mutations
        .submit(Mutation::DeletePost { id: post_id })
        .await
        .unwrap();
    assert!(matches!(
        frontend.fetcher.post(post_id).await,
        Err(ClientError::NotFound)
    ));

    let err = frontend
        .mutations
        .submit(Mutation::DeletePost { id: post_id })
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Failed(ClientError::NotFound)));
    assert!(frontend
        .flash
        .messages()
        .iter()
        .any(|m| m.level == FlashLevel::Error && m.text == "Failed to delete post"));
}

#[tokio::test]
async fn test_unreachable_server_shows_error_state() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:9/api/v1".into(),
        timeout_secs: 1,
        flash_ttl_secs: 5,
        ..Default::default()
    };
    let frontend = Frontend::new(&config, Arc::new(|_: &str| true)).unwrap();
    let posts = frontend.posts();
    assert!(posts.mount().await);
    posts
        .inspect(|p| {
            assert_eq!(p.phase(), Phase::Error);
            assert!(p.page().is_none());
            assert_eq!(p.notice(), Some("Failed to fetch posts"));
        })
        .await;
    assert_eq!(frontend.flash.messages()[0].text, "Failed to fetch posts");
}

/// Source whose page 1 blocks until released, to force responses out of order.
struct GatedSource {
    release: Arc<Notify>,
    calls: AtomicUsize,
}

#[async_trait]
impl PageSource<u32> for GatedSource {
    fn scope(&self) -> Scope {
        Scope::Posts
    }

    async fn fetch_page(&self, page: u32, _: Freshness) -> Result<Page<u32>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if page == 1 {
            self.release.notified().await;
        }
        Ok(Page {
            items: vec![page * 10],
            meta: PageMeta {
                current_page: page,
                total_pages: 3,
                total_count: 3,
            },
        })
    }
}

#[tokio::test]
async fn test_last_requested_page_wins() {
    let release = Arc::new(Notify::new());
    let source = Arc::new(GatedSource {
        release: Arc::clone(&release),
        calls: AtomicUsize::new(0),
    });
    let controller: ListController<u32> = ListController::new(source.clone(), QueryCache::new());

    let slow = tokio::spawn({
        let controller = controller.clone();
        async move { controller.go_to(1).await }
    });
    while source.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert!(controller.go_to(2).await);
    release.notify_one();
    let slow_applied = tokio::time::timeout(Duration::from_secs(5), slow)
        .await
        .unwrap()
        .unwrap();

    assert!(!slow_applied);
    controller
        .inspect(|p| {
            assert_eq!(p.requested_page(), 2);
            assert_eq!(p.items(), &[20]);
        })
        .await;
}
