use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::controller::{EventSender, Inbound};
use crate::error::{ControlError, Result};

use super::{FocusArbiter, FocusEvent, FocusState};

/// A competing claim on the audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Short exclusive use (a notification chime, a voice prompt).
    Transient,
    /// Others may keep playing quietly.
    Duck,
    /// Another player took over for good.
    Permanent,
}

#[derive(Debug, Default)]
struct Ledger {
    holding: bool,
    claim: Option<Claim>,
}

/// Process-local arbiter. Competitors go through the paired [`FocusPort`].
pub struct LocalFocus {
    ledger: Arc<Mutex<Ledger>>,
    events: EventSender,
}

/// Handle for whoever competes with the player for output.
#[derive(Clone)]
pub struct FocusPort {
    ledger: Arc<Mutex<Ledger>>,
    events: EventSender,
}

pub fn local_focus(events: EventSender) -> (LocalFocus, FocusPort) {
    let ledger = Arc::new(Mutex::new(Ledger::default()));
    (
        LocalFocus {
            ledger: ledger.clone(),
            events: events.clone(),
        },
        FocusPort { ledger, events },
    )
}

fn notify(events: &EventSender, event: FocusEvent) {
    let _ = events.send(Inbound::Focus(event));
}

impl FocusArbiter for LocalFocus {
    fn request(&mut self) -> Result<FocusState> {
        let Ok(mut ledger) = self.ledger.lock() else {
            return Err(ControlError::FocusDenied);
        };
        match ledger.claim {
            Some(Claim::Transient | Claim::Permanent) => {
                debug!(claim = ?ledger.claim, "focus request denied");
                Err(ControlError::FocusDenied)
            }
            Some(Claim::Duck) => {
                ledger.holding = true;
                notify(&self.events, FocusEvent::DuckRequested);
                Ok(FocusState::Granted)
            }
            None => {
                ledger.holding = true;
                Ok(FocusState::Granted)
            }
        }
    }

    fn release(&mut self) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.holding = false;
        }
    }
}

impl FocusPort {
    /// Take the output away from the holder in the given way.
    pub fn claim(&self, claim: Claim) {
        let Ok(mut ledger) = self.ledger.lock() else {
            return;
        };
        ledger.claim = Some(claim);
        if !ledger.holding {
            return;
        }
        let event = match claim {
            Claim::Transient => FocusEvent::TransientLoss,
            Claim::Duck => FocusEvent::DuckRequested,
            Claim::Permanent => {
                ledger.holding = false;
                FocusEvent::Lost
            }
        };
        notify(&self.events, event);
    }

    /// End the current claim. A holder that was displaced or ducked gets `Granted`.
    pub fn yield_back(&self) {
        let Ok(mut ledger) = self.ledger.lock() else {
            return;
        };
        if ledger.claim.take().is_some() && ledger.holding {
            notify(&self.events, FocusEvent::Granted);
        }
    }

    pub fn is_held(&self) -> bool {
        self.ledger.lock().map(|l| l.holding).unwrap_or(false)
    }
}
