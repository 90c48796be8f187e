//! # cat-breeds
//!
//! A terminal browser for TheCatAPI breed catalog, built on a small Elm
//! architecture runtime over [ratatui](https://ratatui.rs/) and a client-side
//! query cache in the spirit of TanStack Query.
//!
//! ## Layers
//!
//! - [`application`], [`command`], [`subscription`], [`runtime`]: the runtime.
//!   An [`Application`](application::Application) owns its model, handles
//!   messages in `update`, draws in `view` and declares its event sources in
//!   `subscriptions`.
//! - [`subscription::query`]: cached remote data. A
//!   [`QueryClient`](subscription::query::QueryClient) owns every fetched value;
//!   a [`Query`](subscription::query::Query) is a subscription that serves the
//!   cached value, revalidates it when stale and shares in-flight requests.
//! - [`api`]: the HTTP collaborator, behind the [`Transport`](api::Transport)
//!   trait.
//! - [`breeds`]: breed records, endpoint fetchers and the queries built on them.
//! - [`app`]: the listing and detail screens.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cat_breeds::api::{DEFAULT_BASE_URL, HttpTransport};
//! use cat_breeds::app::{App, Flags};
//! use cat_breeds::breeds::BreedApi;
//! use cat_breeds::runtime::Runtime;
//! use cat_breeds::subscription::query::QueryClient;
//!
//! # async fn run() -> color_eyre::Result<()> {
//! let api = BreedApi::new(HttpTransport::new(DEFAULT_BASE_URL, None)?);
//! let flags = Flags::new(api, Arc::new(QueryClient::new()));
//!
//! let mut terminal = ratatui::init();
//! let result = Runtime::<App>::new(flags, 30).run(&mut terminal).await;
//! ratatui::restore();
//! result
//! # }
//! ```

pub mod api;
pub mod app;
pub mod application;
pub mod breeds;
pub mod command;
pub mod config;
pub mod logging;
pub mod prelude;
pub mod runtime;
pub mod subscription;
