use futures::{
    FutureExt, Stream, StreamExt,
    stream::{self, BoxStream, select_all},
};

/// Something a command asks the runtime to do.
pub enum Action<Msg> {
    /// Deliver a message to [`Application::update`](crate::application::Application::update).
    Message(Msg),

    /// Stop the event loop and return from [`Runtime::run`](crate::runtime::Runtime::run).
    Quit,
}

impl<Msg> Action<Msg> {
    fn map<T>(self, f: impl FnOnce(Msg) -> T) -> Action<T> {
        match self {
            Self::Message(msg) => Action::Message(f(msg)),
            Self::Quit => Action::Quit,
        }
    }
}

/// A side effect returned from `new` or `update`.
///
/// A command is a lazily-run stream of [`Action`]s. The runtime spawns it on
/// the tokio runtime and feeds every produced message back into `update`, so
/// the model itself is never touched from another task.
///
/// ```
/// use cat_breeds::command::Command;
///
/// enum Message {
///     Loaded(usize),
/// }
///
/// let cmd = Command::perform(async { 7 }, Message::Loaded);
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) stream: Option<BoxStream<'static, Action<Msg>>>,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// A command with no effect.
    #[must_use]
    pub fn none() -> Self {
        Self { stream: None }
    }

    /// Runs `future` and maps its output into a message.
    pub fn perform<A>(
        future: impl Future<Output = A> + Send + 'static,
        f: impl FnOnce(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::future(future.map(f))
    }

    /// Runs a future that already yields a message.
    pub fn future(future: impl Future<Output = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(future.into_stream().map(Action::Message).boxed()),
        }
    }

    /// Emits a single action right away.
    pub fn effect(action: Action<Msg>) -> Self {
        Self {
            stream: Some(stream::once(async move { action }).boxed()),
        }
    }

    /// Re-enters `update` with `msg`.
    pub fn message(msg: Msg) -> Self {
        Self::effect(Action::Message(msg))
    }

    /// Runs every command concurrently. Message order across commands is not
    /// defined; `Command::none()` entries are dropped.
    pub fn batch(commands: impl IntoIterator<Item = Self>) -> Self {
        let streams: Vec<_> = commands.into_iter().filter_map(|cmd| cmd.stream).collect();

        if streams.is_empty() {
            Self::none()
        } else {
            Self {
                stream: Some(select_all(streams).boxed()),
            }
        }
    }

    /// Forwards every item of `stream` as a message.
    pub fn stream(stream: impl Stream<Item = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(stream.map(Action::Message).boxed()),
        }
    }

    /// Converts the messages of this command into another message type.
    pub fn map<T: Send + 'static>(self, f: impl Fn(Msg) -> T + Send + 'static) -> Command<T> {
        Command {
            stream: self
                .stream
                .map(|stream| stream.map(move |action| action.map(&f)).boxed()),
        }
    }

    /// Returns `true` when the command has nothing to run.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.stream.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect<Msg: Send + 'static>(cmd: Command<Msg>) -> (Vec<Msg>, bool) {
        let mut messages = vec![];
        let mut quit = false;
        if let Some(mut stream) = cmd.stream {
            while let Some(action) = stream.next().await {
                match action {
                    Action::Message(msg) => messages.push(msg),
                    Action::Quit => quit = true,
                }
            }
        }
        (messages, quit)
    }

    #[test]
    fn test_none_is_empty() {
        let cmd: Command<u32> = Command::none();
        assert!(cmd.is_none());
    }

    #[tokio::test]
    async fn test_perform_maps_output() {
        let cmd = Command::perform(async { 20 }, |page: u32| page + 1);
        let (messages, quit) = collect(cmd).await;
        assert_eq!(messages, vec![21]);
        assert!(!quit);
    }

    #[tokio::test]
    async fn test_batch_drops_none_and_keeps_quit() {
        let cmd = Command::batch(vec![
            Command::message("abys"),
            Command::none(),
            Command::effect(Action::Quit),
            Command::future(async { "beng" }),
        ]);

        let (mut messages, quit) = collect(cmd).await;
        messages.sort_unstable();
        assert_eq!(messages, vec!["abys", "beng"]);
        assert!(quit);
    }

    #[tokio::test]
    async fn test_batch_of_nothing_is_none() {
        let cmd: Command<()> = Command::batch(vec![Command::none(), Command::none()]);
        assert!(cmd.is_none());
    }

    #[tokio::test]
    async fn test_map_converts_messages_and_preserves_quit() {
        #[derive(Debug, PartialEq)]
        enum Outer {
            Page(u32),
        }

        let cmd = Command::batch(vec![
            Command::stream(futures::stream::iter(vec![1_u32, 2])),
            Command::effect(Action::Quit),
        ])
        .map(Outer::Page);

        let (mut messages, quit) = collect(cmd).await;
        messages.sort_by_key(|Outer::Page(p)| *p);
        assert_eq!(messages, vec![Outer::Page(1), Outer::Page(2)]);
        assert!(quit);
    }
}
