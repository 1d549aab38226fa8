mod config;
mod controller;
mod engine;
mod error;
mod focus;
mod interruption;
mod library;
mod persistence;
mod playlist;
mod runtime;
mod session;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
