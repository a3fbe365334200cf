//! Thin fetch wrapper over the backend API.
//!
//! Every method maps to one endpoint and returns the decoded payload or an
//! [`ApiError`]. Failures are terminal for that attempt: nothing here
//! retries, and callers must leave game state untouched on `Err`.

use gloo::net::http::{Request, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sunadoku_core::{Difficulty, GameId, Grid};
use sunadoku_protocol as protocol;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("could not reach the server: {0}")]
    Transport(String),
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Backend(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<gloo::net::Error> for ApiError {
    fn from(err: gloo::net::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client for the session backend. Cloned freely into `send_future` blocks.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    /// `base_url` is prepended to every endpoint path; empty means same
    /// origin.
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    pub async fn create_game(&self, difficulty: Difficulty) -> ApiResult<protocol::GameCreated> {
        let request = protocol::CreateGameRequest { difficulty };
        self.post(protocol::routes::NEW_GAME, &request).await
    }

    pub async fn fetch_game(&self, id: GameId) -> ApiResult<protocol::GameSnapshot> {
        let fetched: protocol::GameFetched = self.get(&protocol::routes::game(id)).await?;
        Ok(fetched.game)
    }

    pub async fn recent_incomplete(&self) -> ApiResult<protocol::RecentIncomplete> {
        self.get(protocol::routes::RECENT_INCOMPLETE).await
    }

    pub async fn list_games(&self) -> ApiResult<Vec<protocol::GameSummary>> {
        let list: protocol::GameList = self.get(protocol::routes::GAMES).await?;
        Ok(list.games)
    }

    pub async fn save_game(
        &self,
        id: GameId,
        request: &protocol::SaveGameRequest,
    ) -> ApiResult<protocol::GameSaved> {
        let url = self.url(&protocol::routes::game(id));
        let response = Request::put(&url).json(request)?.send().await?;
        Self::decode(response).await
    }

    pub async fn validate(&self, board: &Grid) -> ApiResult<protocol::ValidateResponse> {
        let request = protocol::ValidateRequest { board };
        self.post(protocol::routes::VALIDATE, &request).await
    }

    pub async fn user_info(&self) -> ApiResult<protocol::UserInfo> {
        self.get(protocol::routes::USER_INFO).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = Request::get(&self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        let response = Request::post(&self.url(path)).json(body)?.send().await?;
        Self::decode(response).await
    }

    /// The backend reports failures in the body's `{success, error}` fields,
    /// including on 4xx/5xx, so the body is decoded before the status code is
    /// consulted: first the status pair, then the payload from the same body.
    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();
        let body = response.text().await?;

        let parsed = match serde_json::from_str::<protocol::ResponseStatus>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !(200..300).contains(&status) => return Err(ApiError::Status(status)),
            Err(err) => return Err(ApiError::Decode(err.to_string())),
        };
        if !parsed.success {
            return Err(ApiError::Backend(parsed.into_error_message()));
        }

        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}
