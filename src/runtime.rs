use std::time::Duration;

use color_eyre::eyre::Result;
use futures::StreamExt;
use ratatui::{Terminal, prelude::Backend};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

use crate::{
    application::Application,
    command::{Action, Command},
    subscription::SubscriptionManager,
};

/// Drives an [`Application`]: renders, dispatches messages and keeps the
/// subscriptions in sync with the model.
pub struct Runtime<A: Application> {
    app: A,
    frame_duration: Duration,
    tx: mpsc::UnboundedSender<Action<A::Message>>,
    rx: mpsc::UnboundedReceiver<Action<A::Message>>,
    subscriptions: SubscriptionManager<A::Message>,
    init: Option<Command<A::Message>>,
}

impl<A: Application> Runtime<A> {
    /// Creates the application from `flags`. Nothing runs until [`Runtime::run`].
    pub fn new(flags: A::Flags, frame_rate: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (app, init) = A::new(flags);
        let subscriptions = SubscriptionManager::new(tx.clone());

        Self {
            app,
            frame_duration: Duration::from_millis(1000 / u64::from(frame_rate.max(1))),
            tx,
            rx,
            subscriptions,
            init: Some(init),
        }
    }

    fn execute(&self, cmd: Command<A::Message>) {
        let Some(mut stream) = cmd.stream else {
            return;
        };
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(action) = stream.next().await {
                if tx.send(action).is_err() {
                    break;
                }
            }
        });
    }

    /// Applies every queued action. Returns `true` once a quit was requested.
    fn process_messages(&mut self, first: Option<Action<A::Message>>) -> bool {
        let mut dirty = false;
        let mut next = first.or_else(|| self.rx.try_recv().ok());
        while let Some(action) = next {
            match action {
                Action::Message(msg) => {
                    let cmd = self.app.update(msg);
                    self.execute(cmd);
                    dirty = true;
                }
                Action::Quit => return true,
            }
            next = self.rx.try_recv().ok();
        }

        if dirty {
            self.subscriptions.update(self.app.subscriptions());
        }
        false
    }

    /// Runs until the application emits [`Action::Quit`].
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> Result<()> {
        if let Some(init) = self.init.take() {
            self.execute(init);
        }
        self.subscriptions.update(self.app.subscriptions());

        let mut pending = None;
        loop {
            terminal.draw(|frame| self.app.view(frame))?;

            if self.process_messages(pending.take()) {
                debug!("quit requested");
                break;
            }

            // Wake early when a message arrives so quitting and input do not
            // wait for the next frame.
            tokio::select! {
                () = sleep(self.frame_duration) => {}
                action = self.rx.recv() => match action {
                    Some(action) => pending = Some(action),
                    None => break,
                },
            }
        }

        self.subscriptions.shutdown();
        Ok(())
    }
}
