//! Prints fetch events to stdout as they arrive.

use mfetch_core::FetchEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawns the printer; it ends when every sender is dropped.
pub(crate) fn spawn_printer() -> (mpsc::Sender<FetchEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<FetchEvent>(64);
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", render(&event));
        }
    });
    (tx, handle)
}

pub(crate) fn render(event: &FetchEvent) -> String {
    match event {
        FetchEvent::AttemptStarted { name, attempt } => {
            format!("[Attempt {}] Downloading {}...", attempt, name)
        }
        FetchEvent::AttemptFailed {
            name,
            attempt,
            error,
        } => format!("Failed attempt {} for {}: {}", attempt, name, error),
        FetchEvent::Succeeded { name, bytes, .. } => {
            format!("Downloaded {} ({} bytes this attempt)", name, bytes)
        }
        FetchEvent::Exhausted { name, attempts } => {
            format!("Failed to download {} after {} attempts.", name, attempts)
        }
    }
}
