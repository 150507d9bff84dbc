//! Atomix entry point
//!
//! Rendering and input belong to the host application. This binary sets up
//! logging, checks every built-in level and reports what it found.

use atomix::consts::{FIRST_LEVEL, LAST_LEVEL};
use atomix::persistence::MemoryStore;
use atomix::{Level, Profile, Session};

fn main() {
    atomix::platform::init_logging();
    log::info!("Atomix starting...");

    let mut failures = 0;
    for number in FIRST_LEVEL..=LAST_LEVEL {
        match Level::load(number) {
            Ok(level) => {
                let size = level.grid.size();
                log::info!(
                    "{:2} {:<15} {:<15} {:>2} atoms  {:>3}x{:<3} px  {:>3}s  target {}x{}",
                    level.number,
                    level.name,
                    level.description,
                    level.grid.atom_count(),
                    size.x,
                    size.y,
                    level.duration,
                    level.solution.width(),
                    level.solution.height()
                );
            }
            Err(e) => {
                failures += 1;
                log::error!("{}", e);
            }
        }
    }

    let mut session = Session::new(Profile::load(MemoryStore::new()));
    match session.start(FIRST_LEVEL) {
        Ok(()) => log::info!(
            "Session ready: {:?}, {} events queued",
            session.status(),
            session.drain_events().len()
        ),
        Err(e) => {
            failures += 1;
            log::error!("Session failed to start: {}", e);
        }
    }

    if failures > 0 {
        log::error!("{} problem(s) found", failures);
        std::process::exit(1);
    }
    log::info!("All {} levels OK", LAST_LEVEL);
}
