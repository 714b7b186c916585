// SPDX-License-Identifier: MPL-2.0

use crate::api::remote::{RemoteApi, RemoteError};
use crate::api::DataError;
use crate::config::AppConfig;
use crate::model::{
    Card, CardPatch, Deck, DeckPatch, Folder, FolderPatch, NewCard, NewDeck, NewFolder,
    NewStudySession, NewTag, NewTheme, RecordId, SessionStats, StudySession, Tag, Theme,
    ThemePatch,
};
use crate::review::Grade;
use crate::store::{
    BlobStore, CardStore, DeckStore, FolderStore, LocalStore, SessionStore, StoreError, TagStore,
    ThemeStore,
};
use crate::validate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One async surface over the remote API and the local store.
///
/// Remote reachability is probed once and cached until
/// [`reset_reachability`](Self::reset_reachability). Each call goes to the
/// remote when it is reachable and falls back to the local store if that
/// call fails; a single call never writes to both. Clones share the store
/// and the reachability verdict.
///
/// There is no sync between the two backends: writes made while offline stay
/// local, and remote writes are not mirrored locally.
#[derive(Clone)]
pub struct DataClient {
    store: LocalStore,
    remote: Option<RemoteApi>,
    reachable: Arc<Mutex<Option<bool>>>,
}

impl DataClient {
    pub fn new(store: LocalStore, remote: Option<RemoteApi>) -> Self {
        Self {
            store,
            remote,
            reachable: Arc::new(Mutex::new(None)),
        }
    }

    /// A client that only ever uses the local store
    pub fn offline(store: LocalStore) -> Self {
        Self::new(store, None)
    }

    pub fn from_config(store: LocalStore, config: &AppConfig) -> Result<Self, RemoteError> {
        Ok(Self::new(store, RemoteApi::from_config(config)?))
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Probe the remote on first use and cache the answer.
    /// Concurrent callers wait for the first probe instead of sending their own.
    pub async fn is_remote_available(&self) -> bool {
        self.reachable_remote().await.is_some()
    }

    /// Forget the cached verdict; the next call probes again
    pub async fn reset_reachability(&self) {
        *self.reachable.lock().await = None;
        debug!("remote reachability reset");
    }

    async fn reachable_remote(&self) -> Option<RemoteApi> {
        let api = self.remote.as_ref()?;
        let mut reachable = self.reachable.lock().await;
        let up = match *reachable {
            Some(up) => up,
            None => {
                let up = api.probe().await;
                info!(remote = %api.base_url(), reachable = up, "probed remote");
                *reachable = Some(up);
                up
            }
        };
        up.then(|| api.clone())
    }

    /// Try the remote, fall back to the local store on any remote failure.
    /// Only the local result can be an error.
    async fn run<T, R, F>(
        &self,
        op: &'static str,
        remote: R,
        local: impl FnOnce(&LocalStore) -> Result<T, StoreError>,
    ) -> Result<T, DataError>
    where
        R: FnOnce(RemoteApi) -> F,
        F: Future<Output = Result<T, RemoteError>>,
    {
        if let Some(api) = self.reachable_remote().await {
            match remote(api).await {
                Ok(value) => {
                    debug!(op, "served by remote");
                    return Ok(value);
                }
                Err(e) => warn!(op, error = %e, "remote call failed, using local store"),
            }
        }
        local(&self.store).map_err(DataError::from)
    }

    // Folders

    pub async fn list_folders(&self) -> Result<Vec<Folder>, DataError> {
        self.run(
            "list_folders",
            |api| async move { api.list_folders().await },
            |db| FolderStore::new(db).list(),
        )
        .await
    }

    pub async fn create_folder(&self, input: &NewFolder) -> Result<Folder, DataError> {
        validate::new_folder(input)?;
        self.run(
            "create_folder",
            |api| async move { api.create_folder(input).await },
            |db| FolderStore::new(db).create(input),
        )
        .await
    }

    pub async fn update_folder(
        &self,
        id: RecordId,
        patch: &FolderPatch,
    ) -> Result<Folder, DataError> {
        validate::folder_patch(patch)?;
        self.run(
            "update_folder",
            |api| async move { api.update_folder(id, patch).await },
            |db| FolderStore::new(db).update(id, patch),
        )
        .await
    }

    /// Delete a folder. Its decks are kept and become unfiled.
    pub async fn delete_folder(&self, id: RecordId) -> Result<(), DataError> {
        self.run(
            "delete_folder",
            |api| async move { api.delete_folder(id).await },
            |db| FolderStore::new(db).delete(id),
        )
        .await
    }

    // Tags

    pub async fn list_tags(&self) -> Result<Vec<Tag>, DataError> {
        self.run(
            "list_tags",
            |api| async move { api.list_tags().await },
            |db| TagStore::new(db).list(),
        )
        .await
    }

    pub async fn create_tag(&self, input: &NewTag) -> Result<Tag, DataError> {
        validate::new_tag(input)?;
        self.run(
            "create_tag",
            |api| async move { api.create_tag(input).await },
            |db| TagStore::new(db).create(input),
        )
        .await
    }

    pub async fn delete_tag(&self, id: RecordId) -> Result<(), DataError> {
        self.run(
            "delete_tag",
            |api| async move { api.delete_tag(id).await },
            |db| TagStore::new(db).delete(id),
        )
        .await
    }

    // Decks

    pub async fn list_decks(&self) -> Result<Vec<Deck>, DataError> {
        self.run(
            "list_decks",
            |api| async move { api.list_decks().await },
            |db| DeckStore::new(db).list(),
        )
        .await
    }

    /// Decks filed under `folder_id`, or unfiled decks for `None`
    pub async fn list_decks_in_folder(
        &self,
        folder_id: Option<RecordId>,
    ) -> Result<Vec<Deck>, DataError> {
        self.run(
            "list_decks_in_folder",
            |api| async move { api.list_decks_in_folder(folder_id).await },
            |db| DeckStore::new(db).list_in_folder(folder_id),
        )
        .await
    }

    pub async fn get_deck(&self, id: RecordId) -> Result<Deck, DataError> {
        self.run(
            "get_deck",
            |api| async move { api.get_deck(id).await },
            |db| DeckStore::new(db).get(id),
        )
        .await
    }

    pub async fn create_deck(&self, input: &NewDeck) -> Result<Deck, DataError> {
        validate::new_deck(input)?;
        self.run(
            "create_deck",
            |api| async move { api.create_deck(input).await },
            |db| DeckStore::new(db).create(input),
        )
        .await
    }

    pub async fn update_deck(&self, id: RecordId, patch: &DeckPatch) -> Result<Deck, DataError> {
        validate::deck_patch(patch)?;
        self.run(
            "update_deck",
            |api| async move { api.update_deck(id, patch).await },
            |db| DeckStore::new(db).update(id, patch),
        )
        .await
    }

    /// Delete a deck together with its cards and tag links
    pub async fn delete_deck(&self, id: RecordId) -> Result<(), DataError> {
        self.run(
            "delete_deck",
            |api| async move { api.delete_deck(id).await },
            |db| DeckStore::new(db).delete(id),
        )
        .await
    }

    /// Move a deck into `folder_id` (`None` unfiles it).
    ///
    /// Read and write both happen on whichever backend serves the call.
    pub async fn move_deck(
        &self,
        id: RecordId,
        folder_id: Option<RecordId>,
    ) -> Result<Deck, DataError> {
        self.run(
            "move_deck",
            |api| async move {
                let deck = api.get_deck(id).await?;
                if deck.folder_id == folder_id {
                    return Ok(deck);
                }
                let patch = DeckPatch {
                    folder_id: Some(folder_id),
                    ..DeckPatch::default()
                };
                api.update_deck(id, &patch).await
            },
            |db| DeckStore::new(db).move_to_folder(id, folder_id),
        )
        .await
    }

    /// Put a deck's cards in the given order
    pub async fn reorder_cards(
        &self,
        deck_id: RecordId,
        card_ids: &[RecordId],
    ) -> Result<Deck, DataError> {
        self.run(
            "reorder_cards",
            |api| async move { api.reorder_cards(deck_id, card_ids).await },
            |db| DeckStore::new(db).reorder_cards(deck_id, card_ids),
        )
        .await
    }

    // Cards

    pub async fn list_cards(&self, deck_id: RecordId) -> Result<Vec<Card>, DataError> {
        self.run(
            "list_cards",
            |api| async move { api.list_cards(deck_id).await },
            |db| CardStore::new(db).list(deck_id),
        )
        .await
    }

    pub async fn add_card(&self, deck_id: RecordId, input: &NewCard) -> Result<Card, DataError> {
        validate::new_card(input)?;
        self.run(
            "add_card",
            |api| async move { api.add_card(deck_id, input).await },
            |db| DeckStore::new(db).add_card(deck_id, input),
        )
        .await
    }

    pub async fn get_card(&self, id: RecordId) -> Result<Card, DataError> {
        self.run(
            "get_card",
            |api| async move { api.get_card(id).await },
            |db| CardStore::new(db).get(id),
        )
        .await
    }

    pub async fn update_card(&self, id: RecordId, patch: &CardPatch) -> Result<Card, DataError> {
        validate::card_patch(patch)?;
        self.run(
            "update_card",
            |api| async move { api.update_card(id, patch).await },
            |db| CardStore::new(db).update(id, patch),
        )
        .await
    }

    pub async fn delete_card(&self, id: RecordId) -> Result<(), DataError> {
        self.run(
            "delete_card",
            |api| async move { api.delete_card(id).await },
            |db| CardStore::new(db).delete(id),
        )
        .await
    }

    /// Cards of a deck that are new or scheduled at or before `now`
    pub async fn due_cards(
        &self,
        deck_id: RecordId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>, DataError> {
        self.run(
            "due_cards",
            |api| async move { api.due_cards(deck_id, now).await },
            |db| CardStore::new(db).due(deck_id, now),
        )
        .await
    }

    /// Grade a review and reschedule the card
    pub async fn record_review(
        &self,
        id: RecordId,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<Card, DataError> {
        self.run(
            "record_review",
            |api| async move { api.review_card(id, grade, now).await },
            |db| CardStore::new(db).record_review(id, grade, now),
        )
        .await
    }

    // Study sessions

    pub async fn record_session(
        &self,
        input: &NewStudySession,
    ) -> Result<StudySession, DataError> {
        validate::new_session(input)?;
        self.run(
            "record_session",
            |api| async move { api.record_session(input).await },
            |db| SessionStore::new(db).record(input),
        )
        .await
    }

    pub async fn list_sessions(&self, deck_id: RecordId) -> Result<Vec<StudySession>, DataError> {
        self.run(
            "list_sessions",
            |api| async move { api.list_sessions(deck_id).await },
            |db| SessionStore::new(db).list_for_deck(deck_id),
        )
        .await
    }

    /// Latest sessions across all decks, newest first
    pub async fn recent_sessions(&self, limit: usize) -> Result<Vec<StudySession>, DataError> {
        self.run(
            "recent_sessions",
            |api| async move { api.recent_sessions(limit).await },
            |db| SessionStore::new(db).recent(limit),
        )
        .await
    }

    pub async fn session_stats(&self, deck_id: RecordId) -> Result<SessionStats, DataError> {
        let sessions = self.list_sessions(deck_id).await?;
        Ok(SessionStats::from_sessions(&sessions))
    }

    // Themes

    pub async fn list_themes(&self) -> Result<Vec<Theme>, DataError> {
        self.run(
            "list_themes",
            |api| async move { api.list_themes().await },
            |db| ThemeStore::new(db).list(),
        )
        .await
    }

    pub async fn active_theme(&self) -> Result<Theme, DataError> {
        self.run(
            "active_theme",
            |api| async move { api.active_theme().await },
            |db| ThemeStore::new(db).active(),
        )
        .await
    }

    pub async fn create_theme(&self, input: &NewTheme) -> Result<Theme, DataError> {
        validate::new_theme(input)?;
        self.run(
            "create_theme",
            |api| async move { api.create_theme(input).await },
            |db| ThemeStore::new(db).create(input),
        )
        .await
    }

    pub async fn update_theme(&self, id: RecordId, patch: &ThemePatch) -> Result<Theme, DataError> {
        validate::theme_patch(patch)?;
        self.run(
            "update_theme",
            |api| async move { api.update_theme(id, patch).await },
            |db| ThemeStore::new(db).update(id, patch),
        )
        .await
    }

    /// Make `id` the only active theme
    pub async fn activate_theme(&self, id: RecordId) -> Result<Theme, DataError> {
        self.run(
            "activate_theme",
            |api| async move { api.activate_theme(id).await },
            |db| ThemeStore::new(db).activate(id),
        )
        .await
    }

    pub async fn delete_theme(&self, id: RecordId) -> Result<(), DataError> {
        self.run(
            "delete_theme",
            |api| async move { api.delete_theme(id).await },
            |db| ThemeStore::new(db).delete(id),
        )
        .await
    }

    // Named state

    /// Read a named state document, `None` if it was never saved
    pub async fn load_state<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DataError> {
        self.run(
            "load_state",
            |api| async move { api.get_state(key).await },
            |db| BlobStore::new(db).get(key),
        )
        .await
    }

    pub async fn save_state<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DataError> {
        self.run(
            "save_state",
            |api| async move { api.put_state(key, value).await },
            |db| BlobStore::new(db).put(key, value),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{self, Difficulty};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};
    use url::Url;

    /// Minimal stand-in for the remote API running on a background thread.
    /// `health` answers the probe; everything else goes to `route`.
    struct FakeRemote {
        base: Url,
        probes: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeRemote {
        fn start(healthy: bool, route: fn(&str, &str) -> (u16, String)) -> Self {
            let server = Server::http("127.0.0.1:0").unwrap();
            let addr = server.server_addr().to_ip().unwrap();
            let probes = Arc::new(AtomicUsize::new(0));
            let calls = Arc::new(AtomicUsize::new(0));

            let (p, c) = (probes.clone(), calls.clone());
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    let method = request.method().to_string();
                    let path = request.url().to_string();
                    let (status, body) = if path == "/health" {
                        p.fetch_add(1, Ordering::SeqCst);
                        (if healthy { 200 } else { 503 }, String::new())
                    } else {
                        c.fetch_add(1, Ordering::SeqCst);
                        route(&method, &path)
                    };
                    let header = Header::from_bytes("Content-Type", "application/json").unwrap();
                    let _ = request.respond(
                        Response::from_string(body)
                            .with_status_code(status)
                            .with_header(header),
                    );
                }
            });

            Self {
                base: Url::parse(&format!("http://{addr}/")).unwrap(),
                probes,
                calls,
            }
        }

        fn client(&self, store: LocalStore) -> DataClient {
            self.client_with_timeout(store, Duration::from_secs(2))
        }

        fn client_with_timeout(&self, store: LocalStore, request_timeout: Duration) -> DataClient {
            let api = RemoteApi::new(self.base.clone(), request_timeout, Duration::from_millis(500))
                .unwrap();
            DataClient::new(store, Some(api))
        }

        fn probes(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn store() -> LocalStore {
        let db = LocalStore::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn remote_deck() -> Deck {
        Deck {
            id: 42,
            title: "Served remotely".into(),
            description: String::new(),
            folder_id: None,
            tag_ids: vec![],
            cards: vec![Card {
                id: 7,
                deck_id: 42,
                position: 0,
                front: "hola".into(),
                back: "hello".into(),
                front_image: None,
                back_image: None,
                difficulty: Difficulty::New,
                next_review: None,
                repetitions: 0,
            }],
            created_at: model::now(),
        }
    }

    fn spanish() -> NewDeck {
        NewDeck {
            title: "Spanish".into(),
            cards: vec![NewCard::text("hola", "hello")],
            ..NewDeck::default()
        }
    }

    #[tokio::test]
    async fn remote_result_is_returned_as_is() {
        let remote = FakeRemote::start(true, |method, path| match (method, path) {
            ("GET", "/decks/42") => (200, serde_json::to_string(&remote_deck()).unwrap()),
            _ => (404, String::new()),
        });
        let db = store();
        let client = remote.client(db.clone());

        let deck = client.get_deck(42).await.unwrap();
        assert_eq!(deck, remote_deck());
        // nothing was mirrored locally
        assert!(DeckStore::new(&db).list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_errors_fall_back_to_local() {
        let remote = FakeRemote::start(true, |_, _| (500, String::new()));
        let db = store();
        let client = remote.client(db.clone());

        let deck = client.create_deck(&spanish()).await.unwrap();
        assert_eq!(remote.calls(), 1);
        assert_eq!(DeckStore::new(&db).get(deck.id).unwrap(), deck);

        // later reads fail remotely too and see the local copy
        assert_eq!(client.get_deck(deck.id).await.unwrap(), deck);
        assert!(client.is_remote_available().await);
    }

    #[tokio::test]
    async fn stalled_remote_times_out_to_local() {
        let remote = FakeRemote::start(true, |_, _| {
            std::thread::sleep(Duration::from_secs(5));
            (200, String::new())
        });
        let db = store();
        let client = remote.client_with_timeout(db.clone(), Duration::from_millis(300));
        assert!(client.is_remote_available().await);

        let started = std::time::Instant::now();
        let deck = client.create_deck(&spanish()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(remote.calls(), 1);
        assert_eq!(deck.title, "Spanish");
        assert_eq!(DeckStore::new(&db).get(deck.id).unwrap(), deck);
    }

    #[tokio::test]
    async fn unreachable_remote_serves_everything_locally() {
        let api = RemoteApi::new(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            Duration::from_secs(1),
            Duration::from_millis(300),
        )
        .unwrap();
        let client = DataClient::new(store(), Some(api));

        assert!(!client.is_remote_available().await);
        let deck = client.create_deck(&spanish()).await.unwrap();
        let fetched = client.get_deck(deck.id).await.unwrap();
        assert_eq!(fetched.title, "Spanish");
        assert_eq!(fetched.cards.len(), 1);
    }

    #[tokio::test]
    async fn unhealthy_remote_is_never_called() {
        let remote = FakeRemote::start(false, |_, _| (200, "[]".into()));
        let client = remote.client(store());

        let tags = client.list_tags().await.unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(remote.probes(), 1);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn probe_runs_once_until_reset() {
        let remote = FakeRemote::start(true, |_, _| (200, "[]".into()));
        let client = remote.client(store());

        for _ in 0..3 {
            assert!(client.list_folders().await.unwrap().is_empty());
        }
        assert_eq!(remote.probes(), 1);
        assert_eq!(remote.calls(), 3);

        // clones share the cached verdict
        let other = client.clone();
        other.list_folders().await.unwrap();
        assert_eq!(remote.probes(), 1);

        client.reset_reachability().await;
        client.list_folders().await.unwrap();
        assert_eq!(remote.probes(), 2);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_a_backend() {
        let remote = FakeRemote::start(true, |_, _| (500, String::new()));
        let db = store();
        let client = remote.client(db.clone());

        let err = client
            .create_folder(&NewFolder {
                name: "  ".into(),
                color: "#336699".into(),
                icon: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
        assert_eq!(remote.probes(), 0);
        assert!(FolderStore::new(&db).list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_deck_stays_on_one_backend() {
        let client = DataClient::offline(store());
        let folder = client
            .create_folder(&NewFolder {
                name: "Languages".into(),
                color: "#336699".into(),
                icon: None,
            })
            .await
            .unwrap();
        let deck = client.create_deck(&spanish()).await.unwrap();

        let moved = client.move_deck(deck.id, Some(folder.id)).await.unwrap();
        assert_eq!(moved.folder_id, Some(folder.id));
        assert_eq!(
            client.list_decks_in_folder(Some(folder.id)).await.unwrap(),
            vec![moved]
        );

        let err = client.move_deck(deck.id, Some(999)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn offline_errors_come_from_the_local_store() {
        let client = DataClient::offline(store());
        assert!(!client.is_remote_available().await);

        let err = client.get_deck(404).await.unwrap_err();
        assert!(err.is_not_found());

        let err = client
            .create_tag(&NewTag {
                name: "Important".into(),
                color: "#000000".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));
    }

    #[tokio::test]
    async fn state_round_trips_offline() {
        let client = DataClient::offline(store());
        assert_eq!(client.load_state::<Vec<u32>>("counts").await.unwrap(), None);

        client.save_state("counts", &vec![1u32, 2, 3]).await.unwrap();
        assert_eq!(
            client.load_state::<Vec<u32>>("counts").await.unwrap(),
            Some(vec![1, 2, 3])
        );
    }
}
