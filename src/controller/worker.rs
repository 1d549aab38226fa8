use std::sync::Mutex;
use std::sync::mpsc::{Receiver, SendError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use super::event::{EventSender, Inbound};
use super::machine::PlaybackController;

/// Owns the worker thread that drains the inbound queue into the controller.
pub struct ControllerHandle {
    tx: EventSender,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl ControllerHandle {
    /// Move `controller` onto its own thread. `tx` must feed `rx`.
    pub fn spawn(
        mut controller: PlaybackController,
        tx: EventSender,
        rx: Receiver<Inbound>,
    ) -> Self {
        let join = thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                let quit = matches!(event, Inbound::Shutdown);
                // Rejections are logged inside `handle`.
                let _ = controller.handle(event);
                if quit {
                    info!("controller shut down");
                    return;
                }
            }
            debug!("inbound queue closed");
            controller.shutdown();
        });

        Self {
            tx,
            join: Mutex::new(Some(join)),
        }
    }

    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    pub fn send(&self, event: Inbound) -> Result<(), SendError<Inbound>> {
        self.tx.send(event)
    }

    /// Block until the worker exits (after a `Shutdown` from any producer).
    pub fn wait(&self) {
        let handle = self.join.lock().ok().and_then(|mut j| j.take());
        if let Some(h) = handle {
            let _ = h.join();
        }
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Inbound::Shutdown);
        self.wait();
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
