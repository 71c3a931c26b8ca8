//! Process-wide Ctrl-C handling.
//!
//! Tokio replaces the default SIGINT disposition the first time a listener
//! is registered, so there is exactly one listener for the whole run. While
//! the operator is being prompted a press is delivered as an event; at any
//! other time it ends the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Exit status used when Ctrl-C arrives outside an operator prompt
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What a single Ctrl-C press should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Handed to the waiting prompt
    Deliver,
    /// Nobody is prompting; stop the process
    Exit,
}

/// Routes Ctrl-C presses to the prompt currently waiting, if any
pub struct InterruptRouter {
    prompting: AtomicBool,
    presses: watch::Sender<u64>,
}

impl InterruptRouter {
    pub fn new() -> Arc<Self> {
        let (presses, _) = watch::channel(0);
        Arc::new(Self {
            prompting: AtomicBool::new(false),
            presses,
        })
    }

    /// Spawns the one Ctrl-C listener of the process. Must be called from
    /// inside a tokio runtime.
    pub fn install() -> Arc<Self> {
        let router = Self::new();
        let listener = router.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if listener.route() == Route::Exit {
                    ::log::warn!("Interrupted, exiting");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
        router
    }

    /// Decides what one press does and, for a prompt, delivers it
    pub fn route(&self) -> Route {
        if self.prompting.load(Ordering::SeqCst) {
            self.presses.send_modify(|count| *count += 1);
            Route::Deliver
        } else {
            Route::Exit
        }
    }

    /// Marks the caller as prompting until the returned guard is dropped.
    /// The receiver only sees presses made after this call.
    pub fn prompt(&self) -> PromptGuard<'_> {
        let presses = self.presses.subscribe();
        self.prompting.store(true, Ordering::SeqCst);
        PromptGuard {
            router: self,
            presses,
        }
    }
}

/// Live while an operator prompt waits for input
pub struct PromptGuard<'a> {
    router: &'a InterruptRouter,
    presses: watch::Receiver<u64>,
}

impl PromptGuard<'_> {
    /// Resolves on the next delivered press
    pub async fn interrupted(&mut self) {
        if self.presses.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for PromptGuard<'_> {
    fn drop(&mut self) {
        self.router.prompting.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_press_outside_prompt_exits() {
        let router = InterruptRouter::new();
        assert_eq!(router.route(), Route::Exit);

        let guard = router.prompt();
        drop(guard);
        assert_eq!(router.route(), Route::Exit);
    }

    #[tokio::test]
    async fn test_press_during_prompt_is_delivered() {
        let router = InterruptRouter::new();
        let mut guard = router.prompt();
        assert_eq!(router.route(), Route::Deliver);
        tokio::time::timeout(Duration::from_secs(1), guard.interrupted())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_earlier_presses_are_not_replayed() {
        let router = InterruptRouter::new();
        {
            let _first = router.prompt();
            assert_eq!(router.route(), Route::Deliver);
        }

        let mut second = router.prompt();
        let waited = tokio::time::timeout(Duration::from_millis(50), second.interrupted()).await;
        assert!(waited.is_err());
    }
}
