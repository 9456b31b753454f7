//! Typing indicator debounce.
//!
//! The first keystroke publishes `true`; later keystrokes only push the
//! idle deadline back. When the deadline passes without a keystroke, or
//! the caller stops explicitly, `false` is published once.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to the debounce task
pub struct TypingDebouncer {
    tx: mpsc::UnboundedSender<bool>,
    task: JoinHandle<()>,
}

impl TypingDebouncer {
    /// Start the debounce task; `emit` is awaited for every published state
    pub fn spawn<F, Fut>(idle: Duration, emit: F) -> Self
    where
        F: Fn(bool) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<bool>();
        let task = tokio::spawn(async move {
            let mut typing = false;
            let mut deadline: Option<Instant> = None;

            loop {
                let current = deadline;
                let idle_expired = async move {
                    match current {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                };

                tokio::select! {
                    command = rx.recv() => match command {
                        Some(true) => {
                            deadline = Some(Instant::now() + idle);
                            if !typing {
                                typing = true;
                                emit(true).await;
                            }
                        }
                        Some(false) => {
                            deadline = None;
                            if typing {
                                typing = false;
                                emit(false).await;
                            }
                        }
                        None => break,
                    },
                    _ = idle_expired => {
                        deadline = None;
                        typing = false;
                        emit(false).await;
                    }
                }
            }
        });

        Self { tx, task }
    }

    pub fn set_typing(&self, typing: bool) {
        if self.tx.send(typing).is_err() {
            tracing::warn!("[Session] Typing debounce has stopped, state {} dropped", typing);
        }
    }

    /// Stop the task; nothing is published afterwards
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for TypingDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
