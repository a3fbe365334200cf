use chrono::NaiveDateTime;
use clap::Args;
use gloo::events::EventListener;
use gloo::timers::callback::{Interval, Timeout};
use sunadoku_core::{Coord2, Difficulty, Digit, GRID_SIZE, GameId, GameState};
use sunadoku_protocol as protocol;
use wasm_bindgen::JsCast;
use yew::prelude::*;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::utils::{Modal, format_time, format_timestamp};

/// How long conflict highlights and toasts stay on screen.
const HIGHLIGHT_MILLIS: u32 = 3_000;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Screen {
    DifficultySelect,
    Board,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "toast-info",
            Self::Success => "toast-success",
            Self::Warning => "toast-warning",
            Self::Error => "toast-error",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Notice {
    level: NoticeLevel,
    text: String,
}

/// Serializes auto-saves: at most one request in flight, and a board change
/// that lands mid-flight is coalesced into one follow-up save sent with the
/// board as it is *then*. A stale response therefore never represents the
/// newest board, and never needs to.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct SaveGate {
    in_flight: bool,
    dirty: bool,
}

impl SaveGate {
    /// Returns whether a save should be sent right now.
    fn request(&mut self) -> bool {
        if self.in_flight {
            self.dirty = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Marks the in-flight save finished. Returns whether a follow-up save
    /// must be sent to persist changes made while it was in flight.
    fn finish(&mut self) -> bool {
        self.in_flight = false;
        if self.dirty {
            self.dirty = false;
            self.in_flight = true;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Msg {
    SelectCell(Coord2),
    ClearSelection,
    EnterDigit(Digit),
    Tick,
    ChooseDifficulty(Difficulty),
    ShowDifficultySelect,
    LoadGame(GameId),
    SaveRequested,
    ValidateRequested,
    HintRequested,
    DismissNotice,
    DismissCompletion,
    ClearConflicts,
    ResumeChecked(ApiResult<protocol::RecentIncomplete>),
    GameCreated(ApiResult<protocol::GameCreated>),
    GameLoaded(ApiResult<protocol::GameSnapshot>),
    GamesListed(ApiResult<Vec<protocol::GameSummary>>),
    SaveFinished(ApiResult<protocol::GameSaved>),
    Validated(ApiResult<protocol::ValidateResponse>),
    UserLoaded(ApiResult<protocol::UserInfo>),
}

#[derive(Properties, Clone, PartialEq)]
struct CellProps {
    row: u8,
    col: u8,
    digit: Digit,
    #[prop_or_default]
    given: bool,
    #[prop_or_default]
    selected: bool,
    #[prop_or_default]
    conflict: bool,
    callback: Callback<Coord2>,
}

#[function_component(CellView)]
fn cell_component(props: &CellProps) -> Html {
    let CellProps {
        row,
        col,
        digit,
        given,
        selected,
        conflict,
        callback,
    } = props.clone();

    let mut class = classes!("cell");
    if given {
        class.push("given");
    }
    if selected {
        class.push("selected");
    }
    if conflict {
        class.push("conflict");
    }
    // Heavier borders between 3x3 boxes.
    if col % 3 == 2 && col != GRID_SIZE - 1 {
        class.push("box-edge-right");
    }
    if row % 3 == 2 && row != GRID_SIZE - 1 {
        class.push("box-edge-bottom");
    }

    let onclick = Callback::from(move |_: MouseEvent| {
        log::trace!("({}, {}) clicked", row, col);
        callback.emit((row, col));
    });

    html! {
        <td {class} {onclick}>
            { if digit == 0 { String::new() } else { digit.to_string() } }
        </td>
    }
}

#[derive(Args, Properties, Debug, Clone, PartialEq, Default)]
pub(crate) struct GameProps {
    /// Base URL of the session backend (defaults to same origin)
    #[arg(long)]
    #[prop_or_default]
    pub api: Option<String>,

    /// Do not auto-resume the most recent incomplete game on startup
    #[arg(long)]
    #[prop_or_default]
    pub no_resume: bool,
}

pub(crate) struct GameView {
    state: GameState,
    api: ApiClient,
    screen: Screen,
    saved_games: Vec<protocol::GameSummary>,
    user_handle: Option<String>,
    notice: Option<Notice>,
    conflicts: Vec<protocol::CellRef>,
    show_completion: bool,
    save_gate: SaveGate,
    announce_next_save: bool,
    _timer_interval: Option<Interval>,
    _notice_timeout: Option<Timeout>,
    _conflict_timeout: Option<Timeout>,
    _kbd_listener: EventListener,
}

impl GameView {
    fn create_timer(ctx: &Context<Self>) -> Interval {
        let link = ctx.link().clone();
        Interval::new(1_000, move || link.send_message(Msg::Tick))
    }

    fn create_kbd_listener(ctx: &Context<Self>) -> EventListener {
        let link = ctx.link().clone();
        EventListener::new(&gloo::utils::document(), "keydown", move |event| {
            let Some(event) = event.dyn_ref::<web_sys::KeyboardEvent>() else {
                return;
            };
            let key = event.key();
            let msg = match key.as_str() {
                "Escape" => Some(Msg::ClearSelection),
                "0" | "Backspace" | "Delete" => Some(Msg::EnterDigit(0)),
                _ => key.parse::<Digit>().ok().filter(|digit| (1..=9).contains(digit)).map(Msg::EnterDigit),
            };
            if let Some(msg) = msg {
                link.send_message(msg);
            }
        })
    }

    fn show_notice(&mut self, ctx: &Context<Self>, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        log::debug!("notice: {}", text);
        self.notice = Some(Notice { level, text });
        let link = ctx.link().clone();
        self._notice_timeout = Some(Timeout::new(HIGHLIGHT_MILLIS, move || {
            link.send_message(Msg::DismissNotice);
        }));
    }

    fn show_api_error(&mut self, ctx: &Context<Self>, err: &ApiError) {
        log::error!("api call failed: {}", err);
        self.show_notice(ctx, NoticeLevel::Error, err.to_string());
    }

    fn refresh_saved_games(&self, ctx: &Context<Self>) {
        let api = self.api.clone();
        ctx.link()
            .send_future(async move { Msg::GamesListed(api.list_games().await) });
    }

    fn start_timer_if_playing(&mut self, ctx: &Context<Self>) {
        self._timer_interval = self
            .state
            .phase()
            .is_playing()
            .then(|| Self::create_timer(ctx));
    }

    /// Requests an auto or explicit save of the current board. Goes through
    /// the [`SaveGate`] so concurrent edits end up in a later save rather
    /// than racing this one.
    fn schedule_save(&mut self, ctx: &Context<Self>) {
        if self.state.game_id().is_none() {
            return;
        }
        if self.save_gate.request() {
            self.send_save(ctx);
        }
    }

    /// Snapshots the board *at send time*; responses never feed back into the
    /// grids, so an out-of-order completion can only affect the remote
    /// record, not local state.
    fn send_save(&mut self, ctx: &Context<Self>) {
        let Some(id) = self.state.game_id() else {
            return;
        };
        let request = protocol::SaveGameRequest {
            board_state: self.state.board().clone(),
            time_spent: self.state.elapsed_secs(),
            is_complete: self.state.is_complete(),
        };
        self.state.begin_saving();
        let api = self.api.clone();
        ctx.link()
            .send_future(async move { Msg::SaveFinished(api.save_game(id, &request).await) });
    }

    fn apply_loaded_snapshot(&mut self, ctx: &Context<Self>, snapshot: protocol::GameSnapshot) {
        let updated_at = snapshot.updated_at;
        let session = snapshot.into_session();
        match self.state.load(session) {
            Ok(()) => {
                self.screen = Screen::Board;
                self.show_completion = false;
                self.save_gate = SaveGate::default();
                self.start_timer_if_playing(ctx);
                self.refresh_saved_games(ctx);
                self.show_notice(ctx, NoticeLevel::Info, resume_message(self.state.difficulty(), updated_at));
            }
            Err(err) => {
                // Prior state stays in effect; nothing was applied.
                log::warn!("rejecting malformed session payload: {}", err);
                self.show_notice(
                    ctx,
                    NoticeLevel::Error,
                    "The saved game could not be loaded.",
                );
            }
        }
    }

    fn run_hint(&mut self, ctx: &Context<Self>) {
        let Some(coords) = self.state.selected() else {
            self.show_notice(ctx, NoticeLevel::Info, "Select a cell first.");
            return;
        };

        // The selection invariant keeps givens unselectable, so this only
        // fails on a programming error; surface it loudly in the log.
        let candidates = match self.state.candidate_digits(coords) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::error!("hint precondition violated at {:?}: {}", coords, err);
                return;
            }
        };

        match candidates.as_slice() {
            [] => self.show_notice(
                ctx,
                NoticeLevel::Warning,
                "No digit fits here without changes elsewhere.",
            ),
            [only] => self.show_notice(
                ctx,
                NoticeLevel::Info,
                format!("Hint: the only digit that fits is {only}."),
            ),
            digits => {
                let listed = digits
                    .iter()
                    .map(|digit| digit.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.show_notice(ctx, NoticeLevel::Info, format!("Hint: {listed} all fit."));
            }
        }
    }

    fn apply_verdict(&mut self, ctx: &Context<Self>, verdict: protocol::ValidateResponse) {
        if verdict.is_complete {
            // The backend is the sole authority on completion; a full board
            // that violates the rules never reaches this branch.
            self.state.apply_validation(true);
            self._timer_interval = None;
            self.show_completion = true;
            self.schedule_save(ctx);
            self.refresh_saved_games(ctx);
        } else if verdict.is_valid {
            self.show_notice(ctx, NoticeLevel::Success, "No conflicts so far.");
        } else {
            self.conflicts = verdict.conflicts;
            let link = ctx.link().clone();
            self._conflict_timeout = Some(Timeout::new(HIGHLIGHT_MILLIS, move || {
                link.send_message(Msg::ClearConflicts);
            }));
            self.show_notice(ctx, NoticeLevel::Warning, "There are conflicts on the board.");
        }
    }

    fn is_conflict(&self, coords: Coord2) -> bool {
        self.conflicts
            .iter()
            .any(|cell| (cell.row, cell.col) == coords)
    }

    fn view_board(&self, ctx: &Context<Self>) -> Html {
        let select = ctx.link().callback(Msg::SelectCell);

        html! {
            <table class="board">
                {
                    for (0..GRID_SIZE).map(|row| html! {
                        <tr>
                            {
                                for (0..GRID_SIZE).map(|col| {
                                    let pos = (row, col);
                                    html! {
                                        <CellView
                                            {row}
                                            {col}
                                            digit={self.state.digit_at(pos)}
                                            given={self.state.is_given(pos)}
                                            selected={self.state.selected() == Some(pos)}
                                            conflict={self.is_conflict(pos)}
                                            callback={select.clone()}
                                        />
                                    }
                                })
                            }
                        </tr>
                    })
                }
            </table>
        }
    }

    fn view_number_pad(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="number-pad">
                {
                    for (1..=GRID_SIZE).map(|digit| {
                        let onclick = ctx.link().callback(move |_| Msg::EnterDigit(digit));
                        html! { <button {onclick}>{digit}</button> }
                    })
                }
                <button class="erase" onclick={ctx.link().callback(|_| Msg::EnterDigit(0))}>
                    {"Clear"}
                </button>
            </div>
        }
    }

    fn view_controls(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="controls">
                <button onclick={ctx.link().callback(|_| Msg::ShowDifficultySelect)}>{"New Game"}</button>
                <button onclick={ctx.link().callback(|_| Msg::SaveRequested)}>{"Save"}</button>
                <button onclick={ctx.link().callback(|_| Msg::ValidateRequested)}>{"Validate"}</button>
                <button onclick={ctx.link().callback(|_| Msg::HintRequested)}>{"Hint"}</button>
            </div>
        }
    }

    fn view_saved_games(&self, ctx: &Context<Self>) -> Html {
        if self.saved_games.is_empty() {
            return html! { <aside class="saved-games"><p>{"No saved games"}</p></aside> };
        }

        html! {
            <aside class="saved-games">
                <h2>{"Saved games"}</h2>
                <ul>
                    {
                        for self.saved_games.iter().map(|game| {
                            let current = self.state.game_id() == Some(game.id);
                            let id = game.id;
                            let onclick = (!current)
                                .then(|| ctx.link().callback(move |_: MouseEvent| Msg::LoadGame(id)));
                            html! {
                                <li class={classes!("saved-game", current.then_some("current"))} {onclick}>
                                    <span class="difficulty">
                                        { game.difficulty.label() }
                                        { if current { " (current)" } else { "" } }
                                    </span>
                                    <span class="time">{ format_time(game.time_spent) }</span>
                                    {
                                        game.updated_at.map_or_else(Html::default, |at| html! {
                                            <span class="date">{ format_timestamp(at) }</span>
                                        })
                                    }
                                    { if game.is_complete { html! { <span class="done">{"✓"}</span> } } else { Html::default() } }
                                </li>
                            }
                        })
                    }
                </ul>
            </aside>
        }
    }

    fn view_difficulty_select(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="difficulty-select">
                <h2>{"Pick a difficulty"}</h2>
                {
                    for Difficulty::ALL.iter().map(|&difficulty| {
                        let onclick = ctx.link().callback(move |_| Msg::ChooseDifficulty(difficulty));
                        html! { <button {onclick}>{ difficulty.label() }</button> }
                    })
                }
            </div>
        }
    }

    fn view_notice(&self, ctx: &Context<Self>) -> Html {
        match &self.notice {
            Some(notice) => {
                let onclick = ctx.link().callback(|_| Msg::DismissNotice);
                html! {
                    <div class={classes!("toast", notice.level.css_class())} {onclick}>
                        { &notice.text }
                    </div>
                }
            }
            None => Html::default(),
        }
    }

    fn view_completion_modal(&self, ctx: &Context<Self>) -> Html {
        if !self.show_completion {
            return Html::default();
        }

        let play_again = ctx.link().callback(|_| Msg::ShowDifficultySelect);
        let close = ctx.link().callback(|_| Msg::DismissCompletion);

        html! {
            <Modal>
                <dialog class="completion" open={true}>
                    <h2>{"Puzzle solved!"}</h2>
                    <p>{ format!("{} in {}", self.state.difficulty(), format_time(self.state.elapsed_secs())) }</p>
                    <footer>
                        <button onclick={play_again}>{"Play again"}</button>
                        <button onclick={close}>{"Close"}</button>
                    </footer>
                </dialog>
            </Modal>
        }
    }
}

impl Component for GameView {
    type Message = Msg;
    type Properties = GameProps;

    fn create(ctx: &Context<Self>) -> Self {
        let props = ctx.props();
        let api = ApiClient::new(props.api.clone().unwrap_or_default());

        {
            let api = api.clone();
            ctx.link()
                .send_future(async move { Msg::UserLoaded(api.user_info().await) });
        }

        if props.no_resume {
            let api = api.clone();
            ctx.link()
                .send_future(async move { Msg::GamesListed(api.list_games().await) });
        } else {
            // Check for an interrupted game before offering a fresh one.
            let api = api.clone();
            ctx.link()
                .send_future(async move { Msg::ResumeChecked(api.recent_incomplete().await) });
        }

        Self {
            state: GameState::new(),
            api,
            screen: Screen::DifficultySelect,
            saved_games: Vec::new(),
            user_handle: None,
            notice: None,
            conflicts: Vec::new(),
            show_completion: false,
            save_gate: SaveGate::default(),
            announce_next_save: false,
            _timer_interval: None,
            _notice_timeout: None,
            _conflict_timeout: None,
            _kbd_listener: Self::create_kbd_listener(ctx),
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::SelectCell(coords) => match self.state.select_cell(coords) {
                Ok(outcome) => outcome.has_update(),
                Err(err) => {
                    log::warn!("select {:?} rejected: {}", coords, err);
                    false
                }
            },
            Msg::ClearSelection => self.state.clear_selection(),
            Msg::EnterDigit(digit) => match self.state.enter_digit(digit) {
                Ok(outcome) => {
                    if outcome.has_update() {
                        // Auto-save after each accepted move.
                        self.schedule_save(ctx);
                    }
                    outcome.has_update()
                }
                Err(err) => {
                    log::warn!("digit {} rejected: {}", digit, err);
                    false
                }
            },
            Msg::Tick => {
                self.state.tick();
                self.state.phase().is_playing()
            }
            Msg::ChooseDifficulty(difficulty) => {
                self.state.reset(difficulty);
                let api = self.api.clone();
                ctx.link()
                    .send_future(async move { Msg::GameCreated(api.create_game(difficulty).await) });
                true
            }
            Msg::ShowDifficultySelect => {
                self.screen = Screen::DifficultySelect;
                self.show_completion = false;
                self._timer_interval = None;
                true
            }
            Msg::LoadGame(id) => {
                let api = self.api.clone();
                ctx.link()
                    .send_future(async move { Msg::GameLoaded(api.fetch_game(id).await) });
                false
            }
            Msg::SaveRequested => {
                self.announce_next_save = true;
                self.schedule_save(ctx);
                false
            }
            Msg::ValidateRequested => {
                let api = self.api.clone();
                let board = self.state.board().clone();
                ctx.link()
                    .send_future(async move { Msg::Validated(api.validate(&board).await) });
                false
            }
            Msg::HintRequested => {
                self.run_hint(ctx);
                true
            }
            Msg::DismissNotice => {
                self._notice_timeout = None;
                self.notice.take().is_some()
            }
            Msg::DismissCompletion => {
                self.show_completion = false;
                true
            }
            Msg::ClearConflicts => {
                self._conflict_timeout = None;
                let had_any = !self.conflicts.is_empty();
                self.conflicts.clear();
                had_any
            }
            Msg::ResumeChecked(Ok(recent)) => {
                match (recent.has_incomplete_game, recent.game) {
                    (true, Some(snapshot)) => self.apply_loaded_snapshot(ctx, snapshot),
                    _ => self.refresh_saved_games(ctx),
                }
                true
            }
            Msg::ResumeChecked(Err(err)) => {
                // Fall back to a fresh start; resume is best-effort.
                log::warn!("auto-resume check failed: {}", err);
                self.refresh_saved_games(ctx);
                true
            }
            Msg::GameCreated(Ok(created)) => {
                self.state
                    .start(created.game_id, created.difficulty, created.puzzle);
                self.screen = Screen::Board;
                self.show_completion = false;
                self.conflicts.clear();
                self.save_gate = SaveGate::default();
                self.start_timer_if_playing(ctx);
                self.refresh_saved_games(ctx);
                true
            }
            Msg::GameCreated(Err(err)) => {
                self.show_api_error(ctx, &err);
                true
            }
            Msg::GameLoaded(Ok(snapshot)) => {
                self.apply_loaded_snapshot(ctx, snapshot);
                true
            }
            Msg::GameLoaded(Err(err)) => {
                self.show_api_error(ctx, &err);
                true
            }
            Msg::GamesListed(Ok(games)) => {
                // Shown in backend order, most recently touched first.
                self.saved_games = games;
                true
            }
            Msg::GamesListed(Err(err)) => {
                log::warn!("could not list saved games: {}", err);
                false
            }
            Msg::SaveFinished(result) => {
                self.state.finish_saving();
                match result {
                    Ok(_) => {
                        if self.announce_next_save {
                            self.announce_next_save = false;
                            self.show_notice(ctx, NoticeLevel::Success, "Game saved.");
                            self.refresh_saved_games(ctx);
                        }
                    }
                    Err(err) => {
                        self.announce_next_save = false;
                        self.show_api_error(ctx, &err);
                    }
                }
                if self.save_gate.finish() {
                    // Board changed while the save was in flight; persist the
                    // newest state now.
                    self.send_save(ctx);
                }
                true
            }
            Msg::Validated(Ok(verdict)) => {
                self.apply_verdict(ctx, verdict);
                true
            }
            Msg::Validated(Err(err)) => {
                self.show_api_error(ctx, &err);
                true
            }
            Msg::UserLoaded(Ok(user)) => {
                self.user_handle = Some(user.user_handle);
                true
            }
            Msg::UserLoaded(Err(err)) => {
                // The handle is decorative; play anonymously.
                log::debug!("user info not available: {}", err);
                false
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let playing = matches!(self.screen, Screen::Board);

        html! {
            <div class="sunadoku">
                <nav>
                    <aside>{ self.state.difficulty().label() }</aside>
                    {
                        self.user_handle.as_deref().map_or_else(Html::default, |handle| html! {
                            <span class="user-handle">{ handle }</span>
                        })
                    }
                    <aside class="timer">{ format_time(self.state.elapsed_secs()) }</aside>
                </nav>
                {
                    if playing {
                        html! {
                            <main>
                                { self.view_board(ctx) }
                                { self.view_number_pad(ctx) }
                                { self.view_controls(ctx) }
                                { self.view_saved_games(ctx) }
                            </main>
                        }
                    } else {
                        html! {
                            <main>
                                { self.view_difficulty_select(ctx) }
                                { self.view_saved_games(ctx) }
                            </main>
                        }
                    }
                }
                { self.view_notice(ctx) }
                { self.view_completion_modal(ctx) }
            </div>
        }
    }
}

fn resume_message(difficulty: Difficulty, updated_at: Option<NaiveDateTime>) -> String {
    match updated_at {
        Some(at) => format!(
            "Resumed your {} puzzle from {}.",
            difficulty.label(),
            format_timestamp(at)
        ),
        None => format!("Resumed your {} puzzle.", difficulty.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_gate_sends_first_request_immediately() {
        let mut gate = SaveGate::default();

        assert!(gate.request());
        assert!(!gate.finish());
    }

    #[test]
    fn save_gate_coalesces_requests_made_in_flight() {
        let mut gate = SaveGate::default();

        assert!(gate.request());
        // Two more edits land while the save is in flight.
        assert!(!gate.request());
        assert!(!gate.request());
        // One follow-up save covers both, sent with the latest board.
        assert!(gate.finish());
        assert!(!gate.finish());
    }

    #[test]
    fn save_gate_is_idle_after_a_clean_finish() {
        let mut gate = SaveGate::default();

        assert!(gate.request());
        assert!(!gate.finish());
        assert!(gate.request());
    }

    #[test]
    fn resume_message_mentions_the_last_update() {
        let at = NaiveDateTime::parse_from_str("2026-08-01T09:30:00", "%Y-%m-%dT%H:%M:%S").unwrap();

        let message = resume_message(Difficulty::Medium, Some(at));

        assert!(message.contains("Medium"));
        assert!(message.contains("2026-08-01 09:30"));
    }
}
