// SPDX-License-Identifier: MPL-2.0

use crate::config::{APP_NAME, AppConfig};
use crate::model::{
    Card, CardPatch, Deck, DeckPatch, Folder, FolderPatch, NewCard, NewDeck, NewFolder,
    NewStudySession, NewTag, NewTheme, RecordId, StudySession, Tag, Theme, ThemePatch, timestamp,
};
use crate::review::Grade;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Path of the reachability probe, relative to the API root
const PROBE_PATH: &str = "health";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    #[error("remote returned status {0}")]
    Status(u16),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

#[derive(Serialize)]
struct ReviewRequest {
    grade: Grade,
    #[serde(with = "timestamp")]
    reviewed_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct OrderRequest<'a> {
    card_ids: &'a [RecordId],
}

/// JSON-over-HTTP client for the remote API. One endpoint per operation,
/// same document shapes as the local store. Cheap to clone.
#[derive(Clone)]
pub struct RemoteApi {
    http: reqwest::Client,
    base: Url,
    probe_timeout: Duration,
}

impl RemoteApi {
    pub fn new(
        base: Url,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(probe_timeout.min(request_timeout))
            .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        Ok(Self {
            http,
            base,
            probe_timeout,
        })
    }

    /// Build from config, `None` when no remote is configured
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, RemoteError> {
        config
            .api_base_url
            .clone()
            .map(|base| Self::new(base, config.request_timeout, config.probe_timeout))
            .transpose()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Cheap HEAD request; any 2xx within the probe timeout means reachable
    pub async fn probe(&self) -> bool {
        let Ok(url) = self.url(PROBE_PATH) else {
            return false;
        };
        match self
            .http
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|e| RemoteError::Endpoint(format!("{path}: {e}")))
    }

    /// Send a request and fail on transport errors or non-2xx statuses
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, RemoteError> {
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        Ok(response)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, RemoteError> {
        self.execute(method, url, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        self.request(Method::GET, self.url(path)?, None).await
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        self.request(method, self.url(path)?, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.execute(Method::DELETE, self.url(path)?, None).await?;
        Ok(())
    }

    // Folders

    pub async fn list_folders(&self) -> Result<Vec<Folder>, RemoteError> {
        self.get("folders").await
    }

    pub async fn create_folder(&self, input: &NewFolder) -> Result<Folder, RemoteError> {
        self.send(Method::POST, "folders", input).await
    }

    pub async fn update_folder(
        &self,
        id: RecordId,
        patch: &FolderPatch,
    ) -> Result<Folder, RemoteError> {
        self.send(Method::PATCH, &format!("folders/{id}"), patch)
            .await
    }

    pub async fn delete_folder(&self, id: RecordId) -> Result<(), RemoteError> {
        self.delete(&format!("folders/{id}")).await
    }

    // Tags

    pub async fn list_tags(&self) -> Result<Vec<Tag>, RemoteError> {
        self.get("tags").await
    }

    pub async fn create_tag(&self, input: &NewTag) -> Result<Tag, RemoteError> {
        self.send(Method::POST, "tags", input).await
    }

    pub async fn delete_tag(&self, id: RecordId) -> Result<(), RemoteError> {
        self.delete(&format!("tags/{id}")).await
    }

    // Decks

    pub async fn list_decks(&self) -> Result<Vec<Deck>, RemoteError> {
        self.get("decks").await
    }

    pub async fn list_decks_in_folder(
        &self,
        folder_id: Option<RecordId>,
    ) -> Result<Vec<Deck>, RemoteError> {
        let mut url = self.url("decks")?;
        match folder_id {
            Some(id) => url
                .query_pairs_mut()
                .append_pair("folder_id", &id.to_string()),
            None => url.query_pairs_mut().append_pair("folder_id", "none"),
        };
        self.request(Method::GET, url, None).await
    }

    pub async fn get_deck(&self, id: RecordId) -> Result<Deck, RemoteError> {
        self.get(&format!("decks/{id}")).await
    }

    pub async fn create_deck(&self, input: &NewDeck) -> Result<Deck, RemoteError> {
        self.send(Method::POST, "decks", input).await
    }

    pub async fn update_deck(&self, id: RecordId, patch: &DeckPatch) -> Result<Deck, RemoteError> {
        self.send(Method::PATCH, &format!("decks/{id}"), patch)
            .await
    }

    pub async fn reorder_cards(
        &self,
        id: RecordId,
        card_ids: &[RecordId],
    ) -> Result<Deck, RemoteError> {
        self.send(
            Method::PUT,
            &format!("decks/{id}/order"),
            &OrderRequest { card_ids },
        )
        .await
    }

    pub async fn delete_deck(&self, id: RecordId) -> Result<(), RemoteError> {
        self.delete(&format!("decks/{id}")).await
    }

    // Cards

    pub async fn list_cards(&self, deck_id: RecordId) -> Result<Vec<Card>, RemoteError> {
        self.get(&format!("decks/{deck_id}/cards")).await
    }

    pub async fn due_cards(
        &self,
        deck_id: RecordId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>, RemoteError> {
        let mut url = self.url(&format!("decks/{deck_id}/due"))?;
        url.query_pairs_mut()
            .append_pair("now", &timestamp::format(&now));
        self.request(Method::GET, url, None).await
    }

    pub async fn add_card(&self, deck_id: RecordId, input: &NewCard) -> Result<Card, RemoteError> {
        self.send(Method::POST, &format!("decks/{deck_id}/cards"), input)
            .await
    }

    pub async fn get_card(&self, id: RecordId) -> Result<Card, RemoteError> {
        self.get(&format!("cards/{id}")).await
    }

    pub async fn update_card(&self, id: RecordId, patch: &CardPatch) -> Result<Card, RemoteError> {
        self.send(Method::PATCH, &format!("cards/{id}"), patch)
            .await
    }

    pub async fn review_card(
        &self,
        id: RecordId,
        grade: Grade,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Card, RemoteError> {
        self.send(
            Method::POST,
            &format!("cards/{id}/review"),
            &ReviewRequest { grade, reviewed_at },
        )
        .await
    }

    pub async fn delete_card(&self, id: RecordId) -> Result<(), RemoteError> {
        self.delete(&format!("cards/{id}")).await
    }

    // Study sessions

    pub async fn record_session(
        &self,
        input: &NewStudySession,
    ) -> Result<StudySession, RemoteError> {
        self.send(Method::POST, "sessions", input).await
    }

    pub async fn list_sessions(&self, deck_id: RecordId) -> Result<Vec<StudySession>, RemoteError> {
        self.get(&format!("decks/{deck_id}/sessions")).await
    }

    pub async fn recent_sessions(&self, limit: usize) -> Result<Vec<StudySession>, RemoteError> {
        let mut url = self.url("sessions")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.request(Method::GET, url, None).await
    }

    // Themes

    pub async fn list_themes(&self) -> Result<Vec<Theme>, RemoteError> {
        self.get("themes").await
    }

    pub async fn active_theme(&self) -> Result<Theme, RemoteError> {
        self.get("themes/active").await
    }

    pub async fn create_theme(&self, input: &NewTheme) -> Result<Theme, RemoteError> {
        self.send(Method::POST, "themes", input).await
    }

    pub async fn update_theme(
        &self,
        id: RecordId,
        patch: &ThemePatch,
    ) -> Result<Theme, RemoteError> {
        self.send(Method::PATCH, &format!("themes/{id}"), patch)
            .await
    }

    pub async fn activate_theme(&self, id: RecordId) -> Result<Theme, RemoteError> {
        self.send(
            Method::POST,
            &format!("themes/{id}/activate"),
            &serde_json::Value::Null,
        )
        .await
    }

    pub async fn delete_theme(&self, id: RecordId) -> Result<(), RemoteError> {
        self.delete(&format!("themes/{id}")).await
    }

    // Named state blobs

    /// `Ok(None)` when the server has no value for `key` yet
    pub async fn get_state<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RemoteError> {
        match self.get(&format!("state/{key}")).await {
            Ok(value) => Ok(Some(value)),
            Err(RemoteError::Status(code)) if code == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put_state<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RemoteError> {
        let body = serde_json::to_value(value).map_err(|e| RemoteError::Decode(e.to_string()))?;
        self.execute(Method::PUT, self.url(&format!("state/{key}"))?, Some(body))
            .await?;
        Ok(())
    }
}
