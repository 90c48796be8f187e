use ratatui::Frame;

use crate::{command::Command, subscription::Subscription};

/// A TUI program in the Elm architecture.
///
/// The runtime owns the value and is the only caller of these methods:
/// `new` once, then `update` for every message, `view` once per frame and
/// `subscriptions` after every update so that event sources can follow the
/// model.
///
/// ```
/// use cat_breeds::{application::Application, command::Command, subscription::Subscription};
/// use ratatui::Frame;
///
/// struct Pager {
///     page: u32,
/// }
///
/// enum Message {
///     Next,
/// }
///
/// impl Application for Pager {
///     type Message = Message;
///     type Flags = u32;
///
///     fn new(page: u32) -> (Self, Command<Message>) {
///         (Self { page }, Command::none())
///     }
///
///     fn update(&mut self, msg: Message) -> Command<Message> {
///         match msg {
///             Message::Next => self.page += 1,
///         }
///         Command::none()
///     }
///
///     fn view(&self, _frame: &mut Frame<'_>) {}
///
///     fn subscriptions(&self) -> Vec<Subscription<Message>> {
///         vec![]
///     }
/// }
/// ```
pub trait Application: Sized {
    type Message: Send + 'static;

    /// Data handed to [`Application::new`], e.g. injected clients.
    type Flags: Send;

    fn new(flags: Self::Flags) -> (Self, Command<Self::Message>);

    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Draws the current model. Must not change state.
    fn view(&self, frame: &mut Frame<'_>);

    /// Event sources the model currently needs. Re-evaluated after every
    /// update; see [`crate::subscription`] for how changes are applied.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>>;
}
