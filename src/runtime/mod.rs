use std::env;
use std::io;
use std::path::PathBuf;
use std::thread;

use tracing::{info, warn};

use crate::controller::{self, ControllerHandle, ControllerOptions, PlaybackController};
use crate::engine::RodioEngine;
use crate::focus::local_focus;
use crate::persistence::{NullStore, PlaylistStore, TomlStore};
use crate::session::{Fanout, LogPublisher, spawn_mpris};

use console::Console;

mod console;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, warning) = settings::load_settings();
    settings::init_logging(&settings.logging.filter);
    if let Some(msg) = warning {
        warn!("{msg}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "podplay starting");

    let (tx, rx) = controller::channel();

    let engine = RodioEngine::spawn(tx.clone(), &settings.audio);
    let (focus, focus_port) = local_focus(tx.clone());

    let store: Box<dyn PlaylistStore> = match settings.state_path() {
        Some(path) => {
            info!(path = %path.display(), "session file");
            Box::new(TomlStore::new(path))
        }
        None => {
            warn!("no state directory, the session will not be saved");
            Box::new(NullStore)
        }
    };

    let mut publisher = Fanout::default();
    publisher.push(Box::new(LogPublisher::default()));
    if settings.session.mpris {
        publisher.push(Box::new(spawn_mpris(&settings.session.identity, tx.clone())));
    }

    let controller = PlaybackController::new(
        Box::new(engine),
        Box::new(focus),
        Box::new(publisher),
        store,
        ControllerOptions::from(&settings.playback),
    );

    let cli_dir = env::args_os().nth(1).map(PathBuf::from);
    let initial = startup::initial_load(cli_dir.as_deref(), &controller, &settings);

    let handle = ControllerHandle::spawn(controller, tx.clone(), rx);
    if let Some(load) = initial {
        handle.send(load)?;
    }

    let console = Console::new(tx, focus_port, settings.clone());
    thread::spawn(move || console.run(io::stdin().lock()));

    // Runs until the console's `quit` or MPRIS `Quit`.
    handle.wait();
    info!("podplay stopped");
    Ok(())
}

#[cfg(test)]
mod tests;
