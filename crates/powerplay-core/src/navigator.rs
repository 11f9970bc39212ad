//! Navigator — the page state machine.
//!
//! Owns the playlist and the view, and records every forward transition in
//! a `History`. Backward movement arrives as popped states (from the
//! host's back signal or from [`Navigator::back`]) and is handled purely
//! from the popped state plus the page that was showing.
//!
//! Pages: home → papers → (chapters →) player.
//!
//! Invariants:
//! - the playlist is non-empty only while the player page is showing;
//!   leaving the player stops the surface and resets the playlist
//! - a catalog load applies only if it is still the newest one issued and
//!   no navigation happened since it started

use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::effects::{load_catalog, Clock, Fetcher, NoopPlayer, PlayerSurface, SystemClock};
use crate::error::{Error, Result};
use crate::history::{History, MemoryHistory};
use crate::models::{Catalog, NavState, Page};
use crate::playlist::Playlist;
use crate::view::{self, NowPlaying, PlaylistView, View};

/// Transient messages for the user, drained by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    LoadFailed { subject: String },
    PressBackAgain,
    ExitRequested,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::LoadFailed { .. } => "Error: Subject file not found or invalid.",
            Notice::PressBackAgain => "Press back again to exit the app",
            Notice::ExitRequested => "Exiting",
        }
    }
}

/// What a popped state did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "page", rename_all = "snake_case")]
pub enum PopOutcome {
    /// The page now showing.
    Shown(Page),
    /// The pop only left fullscreen; the page is unchanged.
    FullscreenExited,
    /// First back on home: prompt shown.
    ExitPrompt,
    /// Second back on home inside the window: the host should close.
    Exit,
    /// Locked, or nothing to move to.
    Ignored,
}

/// An outstanding catalog load. Hand it back to [`Navigator::complete_load`]
/// with the fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: u64,
    pub subject: String,
    pub paper: String,
    pub chapter: Option<String>,
    /// Rebuilding a popped player entry rather than opening a new one.
    restore: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub subject: Option<String>,
    pub paper: Option<String>,
    pub chapter: Option<String>,
}

pub struct Navigator<H: History = MemoryHistory> {
    config: AppConfig,
    fetcher: Arc<dyn Fetcher>,
    history: H,
    player: Arc<dyn PlayerSurface>,
    clock: Arc<dyn Clock>,
    unlocked: bool,
    /// Last state pushed or popped to.
    state: Option<NavState>,
    context: Context,
    playlist: Playlist,
    view: View,
    last_exit_request: Option<u64>,
    next_ticket: u64,
    pending: Option<u64>,
    notices: Vec<Notice>,
}

impl<H: History> Navigator<H> {
    pub fn new(config: AppConfig, fetcher: Arc<dyn Fetcher>, history: H) -> Self {
        Self {
            config,
            fetcher,
            history,
            player: Arc::new(NoopPlayer),
            clock: Arc::new(SystemClock),
            unlocked: false,
            state: None,
            context: Context::default(),
            playlist: Playlist::new(),
            view: View::default(),
            last_exit_request: None,
            next_ticket: 0,
            pending: None,
            notices: Vec::new(),
        }
    }

    pub fn with_player(mut self, player: Arc<dyn PlayerSurface>) -> Self {
        self.player = player;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.playlist = playlist;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Seed the history before unlocking, e.g. with the host's entry on
    /// a reload.
    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn into_history(self) -> H {
        self.history
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn page(&self) -> Option<Page> {
        self.view.page
    }

    pub fn state(&self) -> Option<&NavState> {
        self.state.as_ref()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn playlist_view(&self) -> PlaylistView {
        view::render_playlist(&self.playlist)
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -----------------------------------------------------------------------
    // Gate and cold start
    // -----------------------------------------------------------------------

    /// Check the passphrase; on success enter the app via [`Navigator::start`].
    pub fn unlock(&mut self, input: &str) -> Result<PopOutcome> {
        if input.trim() != self.config.passphrase {
            log::info!("powerplay: gate rejected passphrase");
            return Err(Error::WrongPassphrase);
        }
        if self.unlocked {
            return Ok(PopOutcome::Ignored);
        }
        self.unlocked = true;
        Ok(self.start())
    }

    /// Reconcile with whatever the history already holds.
    ///
    /// Fresh history: record home by replacing, not pushing. Existing
    /// entry (reload, deep link): dispatch it as a pop so the page is
    /// rebuilt the same way back navigation would.
    fn start(&mut self) -> PopOutcome {
        match self.history.current() {
            None => {
                let home = NavState::home();
                self.history.replace(home.clone());
                self.state = Some(home);
                self.show_home();
                PopOutcome::Shown(Page::Home)
            }
            Some(existing) => {
                log::debug!("powerplay: restoring {} from history", existing.page.as_str());
                self.pop(Some(existing))
            }
        }
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.unlocked { Ok(()) } else { Err(Error::Locked) }
    }

    // -----------------------------------------------------------------------
    // Forward transitions
    // -----------------------------------------------------------------------

    pub fn go_home(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        self.cancel_pending();
        self.leave_player();
        self.player.stop();
        self.show_home();
        self.push(NavState::home());
        Ok(())
    }

    pub fn open_subject(&mut self, subject: &str) -> Result<()> {
        self.ensure_unlocked()?;
        self.cancel_pending();
        self.leave_player();
        self.show_papers(subject);
        self.push(NavState::papers(subject));
        Ok(())
    }

    /// Open a paper: its chapter grid, or straight into the player when
    /// the subject has no chapter level.
    pub fn open_paper(&mut self, paper: &str) -> Result<()> {
        match self.begin_open_paper(paper)? {
            Some(request) => self.run_load(request),
            None => Ok(()),
        }
    }

    pub fn open_chapter(&mut self, chapter: &str) -> Result<()> {
        let request = self.begin_open_chapter(chapter)?;
        self.run_load(request)
    }

    /// First half of [`Navigator::open_paper`] for hosts that fetch off-thread.
    /// Returns the load to perform, or `None` if the chapter grid was shown.
    pub fn begin_open_paper(&mut self, paper: &str) -> Result<Option<LoadRequest>> {
        self.ensure_unlocked()?;
        let subject = self.context.subject.clone().ok_or(Error::MissingContext("subject"))?;
        let structure = self.config.structure(&subject);
        if structure.chapters == 0 {
            return Ok(Some(self.begin_load(&subject, paper, None, false)));
        }
        self.cancel_pending();
        self.leave_player();
        self.show_chapters(&subject, paper);
        self.push(NavState::chapters(&subject, paper));
        Ok(None)
    }

    /// First half of [`Navigator::open_chapter`].
    pub fn begin_open_chapter(&mut self, chapter: &str) -> Result<LoadRequest> {
        self.ensure_unlocked()?;
        let subject = self.context.subject.clone().ok_or(Error::MissingContext("subject"))?;
        let paper = self.context.paper.clone().ok_or(Error::MissingContext("paper"))?;
        Ok(self.begin_load(&subject, &paper, Some(chapter), false))
    }

    fn begin_load(&mut self, subject: &str, paper: &str, chapter: Option<&str>, restore: bool) -> LoadRequest {
        self.next_ticket += 1;
        self.pending = Some(self.next_ticket);
        self.view.loading = true;
        LoadRequest {
            ticket: self.next_ticket,
            subject: subject.into(),
            paper: paper.into(),
            chapter: chapter.map(String::from),
            restore,
        }
    }

    fn run_load(&mut self, request: LoadRequest) -> Result<()> {
        let result = load_catalog(self.fetcher.as_ref(), &request.subject);
        self.complete_load(request, result).map(|_| ())
    }

    /// Apply a finished load. Returns `Ok(false)` if the request was
    /// superseded and its result dropped.
    ///
    /// A failed forward load queues `Notice::LoadFailed` and walks the
    /// history back one entry; a failed restore leaves an empty player.
    pub fn complete_load(&mut self, request: LoadRequest, result: Result<Catalog>) -> Result<bool> {
        if self.pending != Some(request.ticket) {
            log::debug!(
                "powerplay: dropping stale load #{} for {} {}",
                request.ticket,
                request.subject,
                request.paper
            );
            return Ok(false);
        }
        self.cancel_pending();

        let catalog = match result {
            Ok(catalog) => catalog,
            Err(e) => {
                log::warn!("powerplay: {}", e);
                self.notices.push(Notice::LoadFailed { subject: request.subject.clone() });
                if !request.restore {
                    let outcome = self.back();
                    log::debug!("powerplay: load failure backed out: {:?}", outcome);
                    return Err(e);
                }
                self.playlist.reset();
                self.show_player(&request.paper, request.chapter.as_deref());
                return Ok(true);
            }
        };

        if !request.restore {
            self.leave_player();
        }
        self.playlist.load(&catalog, &request.paper, request.chapter.as_deref());
        self.context = Context {
            subject: Some(request.subject.clone()),
            paper: Some(request.paper.clone()),
            chapter: request.chapter.clone(),
        };
        self.show_player(&request.paper, request.chapter.as_deref());
        if !request.restore {
            self.push(NavState::player(&request.subject, &request.paper, request.chapter.as_deref()));
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Backward transitions
    // -----------------------------------------------------------------------

    /// Programmatic back (UI back button, swipe). Stops playback first, then
    /// walks the history back and handles the popped state. From the first
    /// entry this lands on home, which feeds the double-back-to-exit logic.
    pub fn back(&mut self) -> PopOutcome {
        if !self.unlocked {
            return PopOutcome::Ignored;
        }
        if self.view.page == Some(Page::Player) && !self.player.is_fullscreen() {
            self.player.stop();
        }
        let popped = match self.history.back() {
            Some(state) => state,
            None => {
                if self.history.current().map(|s| s.page) != Some(Page::Home) {
                    self.history.replace(NavState::home());
                }
                NavState::home()
            }
        };
        self.pop(Some(popped))
    }

    pub fn forward(&mut self) -> PopOutcome {
        if !self.unlocked {
            return PopOutcome::Ignored;
        }
        match self.history.forward() {
            Some(state) => self.pop(Some(state)),
            None => PopOutcome::Ignored,
        }
    }

    /// Handle a popped history state.
    ///
    /// `None` (or an entry that does not decode) recovers to home without
    /// touching the history.
    pub fn pop(&mut self, popped: Option<NavState>) -> PopOutcome {
        if !self.unlocked {
            return PopOutcome::Ignored;
        }
        // Host pops arrive with the host's cursor already moved.
        if let Some(state) = popped.as_ref().filter(|s| s.is_well_formed()) {
            self.history.seek(state);
        }
        if self.player.is_fullscreen() {
            self.player.exit_fullscreen();
            if let Some(current) = self.state.clone() {
                self.history.push(current);
            }
            log::debug!("powerplay: back consumed by fullscreen exit");
            return PopOutcome::FullscreenExited;
        }

        // Whatever was loading belonged to the page being left.
        self.cancel_pending();
        let previous = self.view.page;

        let state = match popped {
            Some(s) if s.is_well_formed() => Some(s),
            Some(s) => {
                log::warn!("powerplay: incomplete {} state in history", s.page.as_str());
                None
            }
            None => None,
        };
        let next_page = state.as_ref().map_or(Page::Home, |s| s.page);
        if previous == Some(Page::Player) && next_page != Page::Player {
            self.leave_player();
        }

        let Some(state) = state else {
            log::warn!("powerplay: unreadable history state, showing home");
            self.state = Some(NavState::home());
            self.show_home();
            return PopOutcome::Shown(Page::Home);
        };
        self.state = Some(state.clone());

        match state.page {
            Page::Player => {
                self.restore_player(&state);
                PopOutcome::Shown(Page::Player)
            }
            Page::Chapters => {
                let (subject, paper) = (state.subject.unwrap_or_default(), state.paper.unwrap_or_default());
                self.show_chapters(&subject, &paper);
                PopOutcome::Shown(Page::Chapters)
            }
            Page::Papers => {
                self.show_papers(&state.subject.unwrap_or_default());
                PopOutcome::Shown(Page::Papers)
            }
            Page::Home if previous == Some(Page::Home) => self.exit_request(),
            Page::Home => {
                self.show_home();
                PopOutcome::Shown(Page::Home)
            }
        }
    }

    fn restore_player(&mut self, state: &NavState) {
        match (state.subject.as_deref(), state.paper.as_deref()) {
            (Some(subject), Some(paper)) => {
                let request = self.begin_load(subject, paper, state.chapter.as_deref(), true);
                self.playlist.reset();
                self.view.page = Some(Page::Player);
                self.view.subtitle = view::player_subtitle(paper, state.chapter.as_deref());
                self.view.cards.clear();
                // Restore failures are reported through notices.
                let _ = self.run_load(request);
            }
            _ => {
                self.playlist.reset();
                self.context = Context::default();
                self.view.page = Some(Page::Player);
                self.view.subtitle.clear();
                self.view.cards.clear();
                self.view.now_playing = NowPlaying::idle();
            }
        }
    }

    fn exit_request(&mut self) -> PopOutcome {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_exit_request {
            if now.saturating_sub(last) < self.config.exit_window_ms {
                self.notices.push(Notice::ExitRequested);
                return PopOutcome::Exit;
            }
        }
        self.last_exit_request = Some(now);
        self.notices.push(Notice::PressBackAgain);
        PopOutcome::ExitPrompt
    }

    // -----------------------------------------------------------------------
    // Player controls
    // -----------------------------------------------------------------------

    /// Play row `i` of the visible playlist. Out-of-range rows are ignored.
    pub fn play(&mut self, i: usize) -> bool {
        if self.view.page != Some(Page::Player) {
            return false;
        }
        let Some(video) = self.playlist.select(i) else { return false };
        let now = NowPlaying::playing(video);
        self.show_now_playing(now);
        true
    }

    pub fn next(&mut self) -> bool {
        if self.view.page != Some(Page::Player) {
            return false;
        }
        let Some(video) = self.playlist.next() else { return false };
        let now = NowPlaying::playing(video);
        self.show_now_playing(now);
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.view.page != Some(Page::Player) {
            return false;
        }
        let Some(video) = self.playlist.previous() else { return false };
        let now = NowPlaying::playing(video);
        self.show_now_playing(now);
        true
    }

    pub fn search(&mut self, query: &str) {
        self.playlist.filter(query);
    }

    pub fn shuffle(&mut self) {
        self.playlist.shuffle();
    }

    pub fn clear_search(&mut self) {
        self.playlist.clear();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn push(&mut self, state: NavState) {
        self.history.push(state.clone());
        self.state = Some(state);
    }

    fn cancel_pending(&mut self) {
        self.pending = None;
        self.view.loading = false;
    }

    /// Stop and forget everything the player page held.
    fn leave_player(&mut self) {
        if self.view.page != Some(Page::Player) {
            return;
        }
        self.player.stop();
        self.playlist.reset();
        self.context = Context::default();
        self.view.now_playing = NowPlaying::idle();
        self.view.subtitle.clear();
    }

    fn show_now_playing(&mut self, now: NowPlaying) {
        if let Some(url) = &now.embed_url {
            self.player.load(url);
        }
        self.view.now_playing = now;
    }

    fn show_home(&mut self) {
        self.context = Context::default();
        self.view.page = Some(Page::Home);
        self.view.heading.clear();
        self.view.cards = self.config.subject_names().map(String::from).collect();
    }

    fn show_papers(&mut self, subject: &str) {
        let structure = self.config.structure(subject);
        self.context = Context { subject: Some(subject.into()), paper: None, chapter: None };
        self.view.page = Some(Page::Papers);
        self.view.heading = subject.into();
        self.view.cards = view::paper_cards(structure.papers);
    }

    fn show_chapters(&mut self, subject: &str, paper: &str) {
        let structure = self.config.structure(subject);
        self.context = Context { subject: Some(subject.into()), paper: Some(paper.into()), chapter: None };
        self.view.page = Some(Page::Chapters);
        self.view.heading = view::chapters_heading(subject, paper);
        self.view.cards = view::chapter_cards(structure.chapters);
    }

    fn show_player(&mut self, paper: &str, chapter: Option<&str>) {
        self.view.page = Some(Page::Player);
        self.view.subtitle = view::player_subtitle(paper, chapter);
        self.view.cards.clear();
        if !self.play(0) {
            self.player.stop();
            self.view.now_playing = NowPlaying::empty();
        }
    }
}
