//! Wire types for the Sudoku backend's JSON-over-HTTP API.
//!
//! Field names match the backend exactly (`game_id`, `board_state`,
//! `time_spent`, ...). Every response body carries a `success` flag and an
//! optional `error` string next to its payload fields; clients decode
//! [`ResponseStatus`] first and the payload type from the same body only when
//! `success` is set.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sunadoku_core::{Coord, Difficulty, GameId, Grid, SessionSnapshot};

/// Endpoint paths, relative to the API base URL.
pub mod routes {
    use sunadoku_core::GameId;

    pub const NEW_GAME: &str = "/api/new-game";
    pub const GAMES: &str = "/api/games";
    pub const VALIDATE: &str = "/api/validate";
    pub const RECENT_INCOMPLETE: &str = "/api/recent-incomplete-game";
    pub const USER_INFO: &str = "/api/user-info";

    pub fn game(id: GameId) -> String {
        format!("/api/game/{id}")
    }
}

/// The `{success, error?}` pair every backend response carries next to its
/// payload fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseStatus {
    /// The backend's error message, with a fallback for responses that fail
    /// without saying why.
    pub fn into_error_message(self) -> String {
        self.error
            .unwrap_or_else(|| "malformed backend response".to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateGameRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameCreated {
    pub game_id: GameId,
    pub puzzle: Grid,
    pub difficulty: Difficulty,
}

/// One stored session, as returned by the fetch and auto-resume endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct GameSnapshot {
    pub id: GameId,
    pub board_state: Grid,
    pub original_puzzle: Grid,
    pub difficulty: Difficulty,
    pub is_complete: bool,
    #[serde(default)]
    pub time_spent: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

impl GameSnapshot {
    pub fn into_session(self) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.id,
            difficulty: self.difficulty,
            board: self.board_state,
            givens: self.original_puzzle,
            elapsed_secs: self.time_spent,
            complete: self.is_complete,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFetched {
    pub game: GameSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentIncomplete {
    pub has_incomplete_game: bool,
    #[serde(default)]
    pub game: Option<GameSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveGameRequest {
    pub board_state: Grid,
    pub time_spent: u32,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameSaved {
    #[serde(default)]
    pub message: Option<String>,
}

/// Listing entry; grids are omitted by the backend to keep the list light.
#[derive(Debug, Clone, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
    pub difficulty: Difficulty,
    pub is_complete: bool,
    #[serde(default)]
    pub time_spent: u32,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameList {
    pub games: Vec<GameSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateRequest<'a> {
    pub board: &'a Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CellRef {
    pub row: Coord,
    pub col: Coord,
}

/// Validation verdict. `is_complete` is the sole authority for finishing a
/// session; `conflicts` is display-only and not retained anywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateResponse {
    pub is_valid: bool,
    pub is_complete: bool,
    #[serde(default)]
    pub conflicts: Vec<CellRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub user_handle: String,
}
