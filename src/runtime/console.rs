use std::io::BufRead;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::controller::{Command, EventSender, Inbound};
use crate::focus::{Claim, FocusPort};
use crate::interruption::{CallActivity, InterruptionMonitor, OutputRoute};

use super::startup::fresh_playlist;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Command(Command),
    Load { dir: PathBuf, index: usize },
    Call(CallActivity),
    Route(OutputRoute),
    Claim(Claim),
    /// End a competing focus claim.
    Yield,
    Quit,
}

pub fn parse_directive(line: &str) -> Result<Directive, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty line".to_string());
    };
    let arg = words.next();

    let directive = match (head, arg) {
        ("play", None) => Directive::Command(Command::Play),
        ("pause", None) => Directive::Command(Command::Pause),
        ("toggle", None) => Directive::Command(Command::Toggle),
        ("next", None) => Directive::Command(Command::Next),
        ("prev" | "previous", None) => Directive::Command(Command::Previous),
        ("stop", None) => Directive::Command(Command::Stop),
        ("seek", Some(ms)) => {
            let ms = ms.parse().map_err(|_| format!("bad position: {ms}"))?;
            Directive::Command(Command::Seek(ms))
        }
        ("load", Some(dir)) => {
            let index = match words.next() {
                Some(i) => i.parse().map_err(|_| format!("bad index: {i}"))?,
                None => 0,
            };
            Directive::Load {
                dir: PathBuf::from(dir),
                index,
            }
        }
        ("call", Some("ringing")) => Directive::Call(CallActivity::Ringing),
        ("call", Some("offhook")) => Directive::Call(CallActivity::OffHook),
        ("call", Some("idle")) => Directive::Call(CallActivity::Idle),
        ("route", Some("speaker")) => Directive::Route(OutputRoute::Speaker),
        ("route", Some("private")) => Directive::Route(OutputRoute::Private),
        ("focus", Some("transient")) => Directive::Claim(Claim::Transient),
        ("focus", Some("duck")) => Directive::Claim(Claim::Duck),
        ("focus", Some("lost")) => Directive::Claim(Claim::Permanent),
        ("focus", Some("yield")) => Directive::Yield,
        ("quit" | "q", None) => Directive::Quit,
        _ => return Err(format!("unknown directive: {}", line.trim())),
    };

    if words.next().is_some() {
        return Err(format!("trailing input: {}", line.trim()));
    }
    Ok(directive)
}

/// Line-oriented control surface on stdin.
///
/// Besides transport commands it stands in for the platform: call state,
/// output route and competing focus claims are all typed in here.
pub struct Console {
    events: EventSender,
    monitor: InterruptionMonitor,
    focus: FocusPort,
    settings: Settings,
}

impl Console {
    pub fn new(events: EventSender, focus: FocusPort, settings: Settings) -> Self {
        Self {
            monitor: InterruptionMonitor::new(events.clone()),
            events,
            focus,
            settings,
        }
    }

    /// Read directives until `quit` or end of input.
    ///
    /// Only `quit` shuts the controller down. Closed or unreadable stdin
    /// (a service, a background job) leaves it running under MPRIS control.
    pub fn run(mut self, input: impl BufRead) {
        for line in input.lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_directive(&line) {
                Ok(directive) => {
                    let quit = directive == Directive::Quit;
                    self.dispatch(directive);
                    if quit {
                        return;
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
        debug!("console input closed, controller keeps running");
    }

    pub fn dispatch(&mut self, directive: Directive) {
        match directive {
            Directive::Command(command) => {
                let _ = self.events.send(Inbound::Command(command));
            }
            Directive::Load { dir, index } => {
                if let Some(playlist) = fresh_playlist(&dir, &self.settings) {
                    let _ = self.events.send(Inbound::Load { playlist, index });
                }
            }
            Directive::Call(activity) => {
                self.monitor.observe_call(activity);
            }
            Directive::Route(route) => {
                self.monitor.observe_route(route);
            }
            Directive::Claim(claim) => self.focus.claim(claim),
            Directive::Yield => self.focus.yield_back(),
            Directive::Quit => {
                let _ = self.events.send(Inbound::Shutdown);
            }
        }
    }
}
