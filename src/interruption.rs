//! Call and output-route interruption sources.
//!
//! Platform signals arrive as levels (the call is ringing, audio goes to the
//! speaker). The controller only wants edges, so [`InterruptionMonitor`]
//! remembers the last level and emits `Begin`/`End` on change.

use tracing::debug;

use crate::controller::{EventSender, Inbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// A telephony call is ringing or in progress.
    Call,
    /// Output fell back to a public speaker (headphones unplugged).
    NoisyRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Begin(Cause),
    End(Cause),
}

impl Interruption {
    pub fn cause(self) -> Cause {
        match self {
            Self::Begin(c) | Self::End(c) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallActivity {
    #[default]
    Idle,
    Ringing,
    OffHook,
}

impl CallActivity {
    fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputRoute {
    #[default]
    Private,
    Speaker,
}

pub struct InterruptionMonitor {
    events: EventSender,
    call: CallActivity,
    route: OutputRoute,
}

impl InterruptionMonitor {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            call: CallActivity::Idle,
            route: OutputRoute::Private,
        }
    }

    /// Ringing -> OffHook is not an edge; both count as an active call.
    pub fn observe_call(&mut self, activity: CallActivity) -> Option<Interruption> {
        let was = self.call.is_active();
        self.call = activity;
        let edge = match (was, activity.is_active()) {
            (false, true) => Interruption::Begin(Cause::Call),
            (true, false) => Interruption::End(Cause::Call),
            _ => return None,
        };
        self.emit(edge)
    }

    pub fn observe_route(&mut self, route: OutputRoute) -> Option<Interruption> {
        if route == self.route {
            return None;
        }
        self.route = route;
        let edge = match route {
            OutputRoute::Speaker => Interruption::Begin(Cause::NoisyRoute),
            OutputRoute::Private => Interruption::End(Cause::NoisyRoute),
        };
        self.emit(edge)
    }

    fn emit(&self, edge: Interruption) -> Option<Interruption> {
        debug!(?edge, "interruption edge");
        let _ = self.events.send(Inbound::Interruption(edge));
        Some(edge)
    }
}
