use std::io::Cursor;
use std::path::PathBuf;
use std::sync::mpsc;

use tempfile::tempdir;

use super::console::{Console, Directive, parse_directive};
use super::startup::fresh_playlist;
use crate::config::Settings;
use crate::controller::{Command, Inbound};
use crate::focus::{Claim, FocusArbiter, FocusEvent, local_focus};
use crate::interruption::{CallActivity, Cause, Interruption, OutputRoute};

#[test]
fn transport_directives_parse() {
    let cases = [
        ("play", Command::Play),
        ("pause", Command::Pause),
        ("toggle", Command::Toggle),
        ("next", Command::Next),
        ("prev", Command::Previous),
        ("stop", Command::Stop),
        ("  seek 1500 ", Command::Seek(1500)),
    ];
    for (line, command) in cases {
        assert_eq!(parse_directive(line), Ok(Directive::Command(command)), "{line}");
    }
}

#[test]
fn platform_directives_parse() {
    assert_eq!(
        parse_directive("load /music 2"),
        Ok(Directive::Load {
            dir: PathBuf::from("/music"),
            index: 2
        })
    );
    assert_eq!(
        parse_directive("load /music"),
        Ok(Directive::Load {
            dir: PathBuf::from("/music"),
            index: 0
        })
    );
    assert_eq!(
        parse_directive("call offhook"),
        Ok(Directive::Call(CallActivity::OffHook))
    );
    assert_eq!(
        parse_directive("route speaker"),
        Ok(Directive::Route(OutputRoute::Speaker))
    );
    assert_eq!(
        parse_directive("focus lost"),
        Ok(Directive::Claim(Claim::Permanent))
    );
    assert_eq!(parse_directive("focus yield"), Ok(Directive::Yield));
    assert_eq!(parse_directive("quit"), Ok(Directive::Quit));
}

#[test]
fn malformed_directives_are_rejected() {
    for line in ["", "dance", "seek", "seek soon", "load", "load /m x", "play now", "call maybe"] {
        assert!(parse_directive(line).is_err(), "{line:?} should not parse");
    }
}

#[test]
fn console_turns_levels_into_edges_and_quits_on_request() {
    let (tx, rx) = mpsc::channel();
    let (_focus, port) = local_focus(tx.clone());
    let console = Console::new(tx, port, Settings::default());

    let input = "play\ncall ringing\ncall offhook\nbogus\n\ncall idle\nquit\nnext\n";
    console.run(Cursor::new(input));

    let received: Vec<_> = rx.try_iter().collect();
    assert!(matches!(received[0], Inbound::Command(Command::Play)));
    assert!(matches!(
        received[1],
        Inbound::Interruption(Interruption::Begin(Cause::Call))
    ));
    assert!(matches!(
        received[2],
        Inbound::Interruption(Interruption::End(Cause::Call))
    ));
    assert!(matches!(received[3], Inbound::Shutdown));
    assert_eq!(received.len(), 4);
}

#[test]
fn closed_input_leaves_the_controller_running() {
    let (tx, rx) = mpsc::channel();
    let (_focus, port) = local_focus(tx.clone());
    let console = Console::new(tx, port, Settings::default());

    console.run(Cursor::new("pause\n"));

    let received: Vec<_> = rx.try_iter().collect();
    assert_eq!(received.len(), 1);
    assert!(matches!(received[0], Inbound::Command(Command::Pause)));
}

#[test]
fn console_drives_focus_claims() {
    let (tx, rx) = mpsc::channel();
    let (mut focus, port) = local_focus(tx.clone());
    focus.request().unwrap();
    let mut console = Console::new(tx, port, Settings::default());

    console.dispatch(Directive::Claim(Claim::Transient));
    console.dispatch(Directive::Yield);

    let events: Vec<_> = rx
        .try_iter()
        .filter_map(|e| match e {
            Inbound::Focus(f) => Some(f),
            _ => None,
        })
        .collect();
    assert_eq!(events, vec![FocusEvent::TransientLoss, FocusEvent::Granted]);
}

#[test]
fn loading_an_empty_directory_sends_nothing() {
    let dir = tempdir().unwrap();
    let (tx, rx) = mpsc::channel();
    let (_focus, port) = local_focus(tx.clone());
    let mut console = Console::new(tx, port, Settings::default());

    console.dispatch(Directive::Load {
        dir: dir.path().to_path_buf(),
        index: 0,
    });
    assert!(rx.try_recv().is_err());
    assert!(fresh_playlist(dir.path(), &Settings::default()).is_none());
}
