use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::gateway::{Gateway, GatewayError};
use crate::model::{Article, ArticleForm, ArticlePatch};

pub const FETCH_ERROR: &str = "Failed to fetch articles";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self { level: NoticeLevel::Success, message: message.to_string() }
    }

    fn error(message: &str) -> Self {
        Self { level: NoticeLevel::Error, message: message.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// State changed; re-read a snapshot.
    Changed,
    Notice(Notice),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub articles: Vec<Article>,
    pub loading: bool,
    pub error: Option<String>,
    pub search_query: String,
}

#[derive(Debug, Default)]
struct State {
    articles: Vec<Article>,
    fetches_in_flight: usize,
    error: Option<String>,
    search_query: String,
}

/// Owns the canonical article list and keeps it in step with the backend.
///
/// Cloning is cheap and every clone shares the same state, so operations can
/// run from spawned tasks. The lock is never held across an await; overlapping
/// operations apply their results in the order responses arrive.
pub struct ArticleStore<G> {
    gateway: Arc<G>,
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<StoreEvent>,
}

impl<G> Clone for ArticleStore<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}

impl<G: Gateway> ArticleStore<G> {
    pub fn new(gateway: G) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            gateway: Arc::new(gateway),
            state: Arc::new(Mutex::new(State::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            articles: state.articles.clone(),
            loading: state.fetches_in_flight > 0,
            error: state.error.clone(),
            search_query: state.search_query.clone(),
        }
    }

    pub fn find(&self, id: &str) -> Option<Article> {
        self.lock().articles.iter().find(|a| a.id == id).cloned()
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.lock().search_query = query.into();
        self.emit(StoreEvent::Changed);
    }

    /// Replaces the list with the backend's. On failure the old list stays and
    /// the error flag is raised; nothing is returned to the caller.
    pub async fn fetch_all(&self) {
        {
            let mut state = self.lock();
            state.fetches_in_flight += 1;
            state.error = None;
        }
        self.emit(StoreEvent::Changed);

        let result = self.gateway.list().await;

        let notice = {
            let mut state = self.lock();
            state.fetches_in_flight = state.fetches_in_flight.saturating_sub(1);
            match result {
                Ok(articles) => {
                    info!(count = articles.len(), "fetched articles");
                    state.articles = articles;
                    None
                }
                Err(e) => {
                    warn!(error = %e, "fetch failed");
                    state.error = Some(FETCH_ERROR.to_string());
                    Some(Notice::error("Failed to load articles"))
                }
            }
        };
        if let Some(notice) = notice {
            self.emit(StoreEvent::Notice(notice));
        }
        self.emit(StoreEvent::Changed);
    }

    /// Submits `form` as is; validation happens before this is called.
    pub async fn create(&self, form: ArticleForm) -> Result<Article, GatewayError> {
        match self.gateway.create(&form).await {
            Ok(article) => {
                info!(id = %article.id, "created article");
                self.lock().articles.push(article.clone());
                self.emit(StoreEvent::Notice(Notice::success("Article created successfully")));
                self.emit(StoreEvent::Changed);
                Ok(article)
            }
            Err(e) => {
                warn!(error = %e, "create failed");
                self.emit(StoreEvent::Notice(Notice::error("Failed to create article")));
                Err(e)
            }
        }
    }

    /// Merges the server's answer into the entry with `id`. If that entry is
    /// gone by the time the response lands, the merge is skipped.
    pub async fn update(&self, id: &str, patch: ArticlePatch) -> Result<(), GatewayError> {
        match self.gateway.update(id, &patch).await {
            Ok(changes) => {
                let merged = {
                    let mut state = self.lock();
                    match state.articles.iter_mut().find(|a| a.id == id) {
                        Some(entry) => {
                            entry.merge(changes);
                            true
                        }
                        None => false,
                    }
                };
                if merged {
                    info!(%id, "updated article");
                } else {
                    warn!(%id, "updated article is no longer in the list");
                }
                self.emit(StoreEvent::Notice(Notice::success("Article updated successfully")));
                self.emit(StoreEvent::Changed);
                Ok(())
            }
            Err(e) => {
                warn!(%id, error = %e, "update failed");
                self.emit(StoreEvent::Notice(Notice::error("Failed to update article")));
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        match self.gateway.delete(id).await {
            Ok(()) => {
                info!(%id, "deleted article");
                self.lock().articles.retain(|a| a.id != id);
                self.emit(StoreEvent::Notice(Notice::success("Article deleted successfully")));
                self.emit(StoreEvent::Changed);
                Ok(())
            }
            Err(e) => {
                warn!(%id, error = %e, "delete failed");
                self.emit(StoreEvent::Notice(Notice::error("Failed to delete article")));
                Err(e)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::article;
    use crate::model::{ArticleCategory, ArticleChanges, ArticleStatus};
    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct FakeGateway {
        articles: Mutex<Vec<Article>>,
        fail: AtomicBool,
        next_id: Mutex<u32>,
    }

    impl FakeGateway {
        fn with(articles: Vec<Article>) -> Self {
            Self { articles: Mutex::new(articles), ..Default::default() }
        }

        fn check(&self) -> Result<(), GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".into(),
                });
            }
            Ok(())
        }

        fn not_found() -> GatewayError {
            GatewayError::Status { status: StatusCode::NOT_FOUND, body: "Article not found".into() }
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn list(&self) -> Result<Vec<Article>, GatewayError> {
            self.check()?;
            Ok(self.articles.lock().unwrap().clone())
        }

        async fn list_page(&self, skip: usize, limit: usize) -> Result<Vec<Article>, GatewayError> {
            self.check()?;
            Ok(self.articles.lock().unwrap().iter().skip(skip).take(limit).cloned().collect())
        }

        async fn get(&self, id: &str) -> Result<Article, GatewayError> {
            self.check()?;
            self.articles.lock().unwrap().iter().find(|a| a.id == id).cloned().ok_or_else(Self::not_found)
        }

        async fn create(&self, form: &ArticleForm) -> Result<Article, GatewayError> {
            self.check()?;
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let now = Utc::now();
            let created = Article {
                id: format!("srv-{}", *next),
                title: form.title.clone(),
                content: form.content.clone(),
                author: form.author.clone(),
                publish_date: form.publish_date,
                status: form.status,
                category: form.category,
                created_at: now,
                updated_at: now,
            };
            self.articles.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: &str, patch: &ArticlePatch) -> Result<ArticleChanges, GatewayError> {
            self.check()?;
            let mut articles = self.articles.lock().unwrap();
            let entry = articles.iter_mut().find(|a| a.id == id).ok_or_else(Self::not_found)?;
            let changes = ArticleChanges {
                title: patch.title.clone(),
                content: patch.content.clone(),
                author: patch.author.clone(),
                publish_date: patch.publish_date,
                status: patch.status,
                category: patch.category,
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            entry.merge(changes.clone());
            Ok(changes)
        }

        async fn delete(&self, id: &str) -> Result<(), GatewayError> {
            self.check()?;
            let mut articles = self.articles.lock().unwrap();
            let before = articles.len();
            articles.retain(|a| a.id != id);
            if articles.len() == before {
                return Err(Self::not_found());
            }
            Ok(())
        }
    }

    fn seeded() -> Vec<Article> {
        vec![article("a1", "Bitcoin halving"), article("a2", "Mining rigs"), article("a3", "Crypto winter")]
    }

    async fn loaded_store() -> ArticleStore<FakeGateway> {
        let store = ArticleStore::new(FakeGateway::with(seeded()));
        store.fetch_all().await;
        store
    }

    fn form(title: &str) -> ArticleForm {
        ArticleForm {
            title: title.into(),
            content: "z".repeat(100),
            author: "Ann".into(),
            publish_date: Utc::now(),
            status: ArticleStatus::Draft,
            category: ArticleCategory::Mining,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<StoreEvent>) -> Vec<StoreEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn notices(events: &[StoreEvent]) -> Vec<Notice> {
        events
            .iter()
            .filter_map(|e| match e {
                StoreEvent::Notice(n) => Some(n.clone()),
                StoreEvent::Changed => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn fetch_all_replaces_list_in_backend_order() {
        let store = loaded_store().await;
        let snap = store.snapshot();
        assert_eq!(snap.articles, seeded());
        assert!(!snap.loading);
        assert_eq!(snap.error, None);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_stale_list_and_sets_error() {
        let store = loaded_store().await;
        let mut rx = store.subscribe();
        store.gateway.fail.store(true, Ordering::SeqCst);

        store.fetch_all().await;

        let snap = store.snapshot();
        assert_eq!(snap.articles, seeded());
        assert_eq!(snap.error.as_deref(), Some(FETCH_ERROR));
        assert!(!snap.loading);
        assert_eq!(notices(&drain(&mut rx)), vec![Notice::error("Failed to load articles")]);
    }

    #[tokio::test]
    async fn next_fetch_clears_error() {
        let store = loaded_store().await;
        store.gateway.fail.store(true, Ordering::SeqCst);
        store.fetch_all().await;
        store.gateway.fail.store(false, Ordering::SeqCst);

        store.fetch_all().await;
        assert_eq!(store.snapshot().error, None);
    }

    #[tokio::test]
    async fn create_appends_server_article() {
        let store = loaded_store().await;
        let mut rx = store.subscribe();

        let created = store.create(form("Fresh article")).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.articles.len(), 4);
        assert_eq!(snap.articles.last(), Some(&created));
        assert_eq!(created.id, "srv-1");
        assert_eq!(created.title, "Fresh article");
        let events = drain(&mut rx);
        assert_eq!(notices(&events), vec![Notice::success("Article created successfully")]);
        assert!(events.contains(&StoreEvent::Changed));
    }

    #[tokio::test]
    async fn create_failure_propagates_without_touching_state() {
        let store = loaded_store().await;
        let mut rx = store.subscribe();
        store.gateway.fail.store(true, Ordering::SeqCst);

        let err = store.create(form("Fresh article")).await.unwrap_err();

        assert!(matches!(err, GatewayError::Status { .. }));
        let snap = store.snapshot();
        assert_eq!(snap.articles, seeded());
        assert_eq!(snap.error, None);
        assert_eq!(notices(&drain(&mut rx)), vec![Notice::error("Failed to create article")]);
    }

    #[tokio::test]
    async fn update_merges_only_matching_entry() {
        let store = loaded_store().await;
        let patch = ArticlePatch {
            title: Some("Bitcoin halving, revisited".into()),
            status: Some(ArticleStatus::Published),
            ..Default::default()
        };

        store.update("a1", patch).await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.articles[0].title, "Bitcoin halving, revisited");
        assert_eq!(snap.articles[0].status, ArticleStatus::Published);
        assert_eq!(snap.articles[0].author, "Satoshi");
        assert_eq!(&snap.articles[1..], &seeded()[1..]);
    }

    #[tokio::test]
    async fn update_of_entry_missing_locally_is_skipped() {
        let store = ArticleStore::new(FakeGateway::with(seeded()));
        // list never fetched, so nothing local to merge into
        store.update("a1", ArticlePatch { title: Some("Whatever title".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(store.snapshot().articles.is_empty());
    }

    #[tokio::test]
    async fn update_failure_leaves_entry() {
        let store = loaded_store().await;
        let mut rx = store.subscribe();

        let err = store
            .update("nope", ArticlePatch { title: Some("Whatever title".into()), ..Default::default() })
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Status { status, .. } if status == StatusCode::NOT_FOUND));
        assert_eq!(store.snapshot().articles, seeded());
        assert_eq!(notices(&drain(&mut rx)), vec![Notice::error("Failed to update article")]);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = loaded_store().await;

        store.delete("a2").await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.articles.len(), 2);
        assert!(snap.articles.iter().all(|a| a.id != "a2"));
        assert_eq!(store.find("a2"), None);
    }

    #[tokio::test]
    async fn delete_failure_keeps_entry() {
        let store = loaded_store().await;
        let mut rx = store.subscribe();
        store.gateway.fail.store(true, Ordering::SeqCst);

        assert!(store.delete("a2").await.is_err());
        assert!(store.find("a2").is_some());
        assert_eq!(store.snapshot().error, None);
        assert_eq!(notices(&drain(&mut rx)), vec![Notice::error("Failed to delete article")]);
    }

    #[tokio::test]
    async fn search_query_is_shared_between_clones() {
        let store = ArticleStore::new(FakeGateway::default());
        let other = store.clone();
        let mut rx = store.subscribe();

        other.set_search_query("mining");

        assert_eq!(store.snapshot().search_query, "mining");
        assert_eq!(drain(&mut rx), vec![StoreEvent::Changed]);
    }

    type ListReply = Result<Vec<Article>, GatewayError>;

    /// Each `list` call takes the next gate and waits until the test answers it.
    struct GatedGateway {
        gates: Mutex<VecDeque<oneshot::Receiver<ListReply>>>,
    }

    impl GatedGateway {
        fn new(gates: Vec<oneshot::Receiver<ListReply>>) -> Self {
            Self { gates: Mutex::new(gates.into()) }
        }
    }

    #[async_trait]
    impl Gateway for GatedGateway {
        async fn list(&self) -> Result<Vec<Article>, GatewayError> {
            let gate = self.gates.lock().unwrap().pop_front().expect("no gate left");
            gate.await.expect("gate dropped")
        }

        async fn list_page(&self, _: usize, _: usize) -> Result<Vec<Article>, GatewayError> {
            unimplemented!()
        }

        async fn get(&self, _: &str) -> Result<Article, GatewayError> {
            unimplemented!()
        }

        async fn create(&self, _: &ArticleForm) -> Result<Article, GatewayError> {
            unimplemented!()
        }

        async fn update(&self, _: &str, _: &ArticlePatch) -> Result<ArticleChanges, GatewayError> {
            unimplemented!()
        }

        async fn delete(&self, _: &str) -> Result<(), GatewayError> {
            unimplemented!()
        }
    }

    async fn next_changed(rx: &mut broadcast::Receiver<StoreEvent>) {
        loop {
            if rx.recv().await.unwrap() == StoreEvent::Changed {
                return;
            }
        }
    }

    /// Spawns a fetch and returns once it is parked on its gate.
    async fn start_fetch<G: Gateway>(
        store: &ArticleStore<G>,
        rx: &mut broadcast::Receiver<StoreEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let s = store.clone();
        let handle = tokio::spawn(async move { s.fetch_all().await });
        next_changed(rx).await;
        handle
    }

    #[tokio::test]
    async fn overlapping_fetches_stay_loading_and_last_arrival_wins() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let store = ArticleStore::new(GatedGateway::new(vec![first_rx, second_rx]));
        let mut rx = store.subscribe();

        let first = start_fetch(&store, &mut rx).await;
        assert!(store.snapshot().loading);
        let second = start_fetch(&store, &mut rx).await;
        assert!(store.snapshot().loading);

        let newer = vec![article("b1", "Second response")];
        second_tx.send(Ok(newer.clone())).unwrap();
        second.await.unwrap();
        let snap = store.snapshot();
        assert!(snap.loading, "first fetch is still in flight");
        assert_eq!(snap.articles, newer);

        first_tx.send(Ok(seeded())).unwrap();
        first.await.unwrap();
        let snap = store.snapshot();
        assert!(!snap.loading);
        assert_eq!(snap.articles, seeded());
    }

    #[tokio::test]
    async fn retry_clears_error_while_in_flight() {
        let (fail_tx, fail_rx) = oneshot::channel();
        let (retry_tx, retry_rx) = oneshot::channel();
        let store = ArticleStore::new(GatedGateway::new(vec![fail_rx, retry_rx]));

        fail_tx
            .send(Err(GatewayError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "down".into(),
            }))
            .unwrap();
        store.fetch_all().await;
        assert_eq!(store.snapshot().error.as_deref(), Some(FETCH_ERROR));

        let mut rx = store.subscribe();
        let retry = start_fetch(&store, &mut rx).await;
        let snap = store.snapshot();
        assert!(snap.loading);
        assert_eq!(snap.error, None);

        retry_tx.send(Ok(seeded())).unwrap();
        retry.await.unwrap();
        let snap = store.snapshot();
        assert!(!snap.loading);
        assert_eq!(snap.error, None);
        assert_eq!(snap.articles, seeded());
    }
}
