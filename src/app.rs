//! The breed browser.
//!
//! Two screens: [`View::Listing`] shows one catalog page at a time and
//! [`View::Detail`] shows a breed, its reference image and a gallery preview.
//! Every piece of remote data comes from a [`Query`](crate::subscription::query::Query)
//! returned by [`App::subscriptions`]; `update` only records the latest state
//! of the queries the current screen displays.

mod view;

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use tracing::{debug, warn};

use crate::application::Application;
use crate::breeds::queries::{
    breed_images_key, breed_key, breeds_key, reference_image_key, seed_breed_page,
};
use crate::breeds::{
    Breed, BreedApi, BreedPage, DEFAULT_GALLERY_LIMIT, Image, ReferenceGate, ReferenceImage,
    breed_images_query, breed_query, breeds_query, reference_image_query,
};
use crate::command::{Action, Command};
use crate::subscription::Subscription;
use crate::subscription::query::{QueryClient, QueryKey, QueryResult, QueryState, StaleTime};
use crate::subscription::terminal::TerminalEvents;
use crate::subscription::time::Every;

/// How often unused cache entries are swept when not configured.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// What [`App::new`] needs.
#[derive(Debug, Clone)]
pub struct Flags {
    pub api: BreedApi,
    pub client: Arc<QueryClient>,
    /// Pictures requested for the gallery.
    pub gallery_limit: u32,
    pub gc_interval: Duration,
    /// Do not read terminal input. For driving the app without a terminal.
    pub headless: bool,
}

impl Flags {
    #[must_use]
    pub fn new(api: BreedApi, client: Arc<QueryClient>) -> Self {
        Self {
            api,
            client,
            gallery_limit: DEFAULT_GALLERY_LIMIT,
            gc_interval: DEFAULT_GC_INTERVAL,
            headless: false,
        }
    }
}

/// The screen being shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Listing,
    Detail { breed_id: String },
}

#[derive(Debug)]
pub enum Message {
    Terminal(Event),
    TerminalError(String),

    Breeds(QueryResult<BreedPage>),
    Breed(QueryResult<Option<Breed>>),
    ReferenceImage(QueryResult<ReferenceImage>),
    Gallery(QueryResult<Vec<Image>>),

    CursorUp,
    CursorDown,
    /// Open the breed under the cursor.
    Open,
    Select(String),
    Back,
    NextPage,
    PrevPage,
    GoToPage(u32),
    /// Invalidate what is on screen.
    Refresh,
    CollectGarbage,
    Quit,
}

/// Query states backing the detail screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub breed: QueryState<Option<Breed>>,
    pub reference: QueryState<ReferenceImage>,
    pub gallery: QueryState<Vec<Image>>,
}

impl Default for Detail {
    fn default() -> Self {
        Self {
            breed: QueryState::Loading,
            reference: QueryState::Idle,
            gallery: QueryState::Idle,
        }
    }
}

impl Detail {
    /// Whether the gallery can be fetched yet.
    #[must_use]
    pub fn gate(&self) -> ReferenceGate {
        ReferenceGate::new(&self.breed, &self.reference)
    }
}

pub struct App {
    api: BreedApi,
    client: Arc<QueryClient>,
    gallery_limit: u32,
    gc_interval: Duration,
    headless: bool,

    view: View,
    page: u32,
    cursor: usize,
    breeds: QueryState<BreedPage>,
    detail: Detail,
    terminal_error: Option<String>,
}

impl Application for App {
    type Message = Message;
    type Flags = Flags;

    fn new(flags: Flags) -> (Self, Command<Message>) {
        let mut app = Self {
            api: flags.api,
            client: flags.client,
            gallery_limit: flags.gallery_limit,
            gc_interval: flags.gc_interval,
            headless: flags.headless,
            view: View::Listing,
            page: 0,
            cursor: 0,
            breeds: QueryState::Loading,
            detail: Detail::default(),
            terminal_error: None,
        };
        app.breeds = app.cached(&breeds_key(0));
        (app, Command::none())
    }

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                match self.key_message(key) {
                    Some(msg) => self.update(msg),
                    None => Command::none(),
                }
            }
            Message::Terminal(_) => Command::none(),
            Message::TerminalError(e) => {
                warn!(error = %e, "terminal input failed");
                self.terminal_error = Some(e);
                Command::none()
            }

            Message::Breeds(result) => {
                if result.key == breeds_key(self.page) {
                    self.set_breeds(result.state);
                }
                Command::none()
            }
            Message::Breed(result) => {
                if self.shows(&result.key, breed_key) {
                    self.detail.breed = result.state;
                }
                Command::none()
            }
            Message::ReferenceImage(result) => {
                if self.shows(&result.key, reference_image_key) {
                    self.detail.reference = result.state;
                }
                Command::none()
            }
            Message::Gallery(result) => {
                let limit = self.gallery_limit;
                if self.shows(&result.key, |id| breed_images_key(id, limit)) {
                    self.detail.gallery = result.state;
                }
                Command::none()
            }

            Message::CursorUp => {
                self.cursor = self.cursor.saturating_sub(1);
                Command::none()
            }
            Message::CursorDown => {
                let len = self.breeds.data().map_or(0, |page| page.breeds.len());
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
                Command::none()
            }
            Message::Open => match self.selected_breed().map(|breed| breed.id.clone()) {
                Some(id) => self.update(Message::Select(id)),
                None => Command::none(),
            },
            Message::Select(breed_id) => {
                self.open(breed_id);
                Command::none()
            }
            Message::Back => {
                if self.view != View::Listing {
                    self.view = View::Listing;
                    self.detail = Detail::default();
                    self.refresh_listing();
                }
                Command::none()
            }
            Message::NextPage => {
                if self.last_page().is_some_and(|last| self.page < last) {
                    self.go_to_page(self.page + 1);
                }
                Command::none()
            }
            Message::PrevPage => {
                if self.page > 0 {
                    self.go_to_page(self.page - 1);
                }
                Command::none()
            }
            Message::GoToPage(page) => {
                if page != self.page && self.last_page().is_some_and(|last| page <= last) {
                    self.go_to_page(page);
                }
                Command::none()
            }
            Message::Refresh => self.refresh(),
            Message::CollectGarbage => {
                self.client.collect_garbage();
                Command::none()
            }
            Message::Quit => Command::effect(Action::Quit),
        }
    }

    fn view(&self, frame: &mut Frame<'_>) {
        self.draw(frame);
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        let mut subs = Vec::with_capacity(5);

        if !self.headless {
            subs.push(
                Subscription::new(TerminalEvents::new()).map(|result| match result {
                    Ok(event) => Message::Terminal(event),
                    Err(e) => Message::TerminalError(e.to_string()),
                }),
            );
        }
        subs.push(Subscription::new(Every::new(self.gc_interval)).map(|_| Message::CollectGarbage));

        match &self.view {
            View::Listing => {
                subs.push(
                    Subscription::new(breeds_query(&self.api, &self.client, self.page))
                        .map(Message::Breeds),
                );
            }
            View::Detail { breed_id } => {
                let breed = self.detail.breed.data().and_then(Option::as_ref);
                let gate = self.detail.gate();

                subs.push(
                    Subscription::new(breed_query(&self.api, &self.client, breed_id))
                        .map(Message::Breed),
                );
                subs.push(
                    Subscription::new(reference_image_query(
                        &self.api,
                        &self.client,
                        breed_id,
                        breed,
                    ))
                    .map(Message::ReferenceImage),
                );
                subs.push(
                    Subscription::new(breed_images_query(
                        &self.api,
                        &self.client,
                        breed_id,
                        self.gallery_limit,
                        &gate,
                    ))
                    .map(Message::Gallery),
                );
            }
        }

        subs
    }
}

impl App {
    #[must_use]
    pub const fn current_view(&self) -> &View {
        &self.view
    }

    /// Zero-based catalog page, kept across detail visits.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn breeds(&self) -> &QueryState<BreedPage> {
        &self.breeds
    }

    #[must_use]
    pub const fn detail(&self) -> &Detail {
        &self.detail
    }

    #[must_use]
    pub fn terminal_error(&self) -> Option<&str> {
        self.terminal_error.as_deref()
    }

    /// The breed under the cursor, if the page is loaded.
    #[must_use]
    pub fn selected_breed(&self) -> Option<&Breed> {
        self.breeds.data()?.breeds.get(self.cursor)
    }

    fn key_message(&self, key: KeyEvent) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return matches!(key.code, KeyCode::Char('c')).then_some(Message::Quit);
        }

        match (&self.view, key.code) {
            (_, KeyCode::Char('q')) => Some(Message::Quit),
            (_, KeyCode::Char('r')) => Some(Message::Refresh),

            (View::Listing, KeyCode::Up | KeyCode::Char('k')) => Some(Message::CursorUp),
            (View::Listing, KeyCode::Down | KeyCode::Char('j')) => Some(Message::CursorDown),
            (View::Listing, KeyCode::Enter) => Some(Message::Open),
            (View::Listing, KeyCode::Left | KeyCode::Char('h')) => Some(Message::PrevPage),
            (View::Listing, KeyCode::Right | KeyCode::Char('l')) => Some(Message::NextPage),
            (View::Listing, KeyCode::Char(c)) => c
                .to_digit(10)
                .map(|d| Message::GoToPage(if d == 0 { 9 } else { d - 1 })),

            (
                View::Detail { .. },
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Left | KeyCode::Char('b' | 'h'),
            ) => Some(Message::Back),

            _ => None,
        }
    }

    /// The cached state of `key`, as a query would first report it.
    fn cached<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        self.client.cached_state(key, self.client.config().stale_time)
    }

    /// Whether `key` belongs to the breed on screen.
    fn shows(&self, key: &QueryKey, key_for: impl Fn(&str) -> QueryKey) -> bool {
        match &self.view {
            View::Detail { breed_id } => *key == key_for(breed_id),
            View::Listing => false,
        }
    }

    /// Records a listing state, keeping the previous page visible while the
    /// next one loads.
    fn set_breeds(&mut self, state: QueryState<BreedPage>) {
        self.breeds = match (state, &self.breeds) {
            (QueryState::Loading | QueryState::Idle, QueryState::Success { data, .. }) => {
                QueryState::Success {
                    data: data.clone(),
                    is_stale: true,
                    is_fetching: true,
                }
            }
            (state, _) => state,
        };

        let len = self.breeds.data().map_or(0, |page| page.breeds.len());
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn last_page(&self) -> Option<u32> {
        self.breeds.data().map(|page| page.pagination.total_pages)
    }

    fn go_to_page(&mut self, page: u32) {
        debug!(from = self.page, to = page, "changing page");
        self.page = page;
        self.cursor = 0;
        self.refresh_listing();
    }

    fn refresh_listing(&mut self) {
        let cached = self.cached(&breeds_key(self.page));
        self.set_breeds(cached);
    }

    fn open(&mut self, breed_id: String) {
        debug!(%breed_id, "opening breed");
        // Seeded slots have no observers and may have been collected while
        // the page stayed on screen.
        let shown = self.breeds.data();
        if let Some(page) = shown.filter(|page| page.breeds.iter().any(|b| b.id == breed_id)) {
            seed_breed_page(&self.client, page);
        }
        self.detail = Detail {
            breed: self.cached(&breed_key(&breed_id)),
            reference: idle_if_missing(
                self.client
                    .cached_state(&reference_image_key(&breed_id), StaleTime::Never),
            ),
            gallery: idle_if_missing(
                self.cached(&breed_images_key(&breed_id, self.gallery_limit)),
            ),
        };
        self.view = View::Detail { breed_id };
    }

    fn refresh(&self) -> Command<Message> {
        match &self.view {
            View::Listing => self.client.invalidate(&breeds_key(self.page)),
            View::Detail { breed_id } => Command::batch([
                self.client.invalidate(&breed_key(breed_id)),
                self.client.invalidate(&reference_image_key(breed_id)),
                self.client.invalidate(&breed_images_key(breed_id, self.gallery_limit)),
            ]),
        }
    }
}

/// Dependent queries start disabled; nothing cached means nothing to show yet.
fn idle_if_missing<T>(state: QueryState<T>) -> QueryState<T> {
    match state {
        QueryState::Loading => QueryState::Idle,
        state => state,
    }
}
