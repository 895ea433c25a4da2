// Shared fixtures: a mock cloud wired into a session whose console output is captured.
#![allow(dead_code)]

use rackops_orchestrator::{Console, PollIntervals, Session};
use rackops_providers::mock::MockCloud;
use rackops_providers::Cloud;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct Harness {
    pub mock: Arc<MockCloud>,
    pub session: Session,
    output: Arc<Mutex<String>>,
}

impl Harness {
    pub fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }
}

/// Session over `mock` with zero-length poll sleeps.
pub fn harness(mock: MockCloud) -> Harness {
    let mock = Arc::new(mock);
    let (console, output) = Console::capture();
    let session = Session::new(
        Cloud::from_provider(mock.clone()),
        PollIntervals::immediate(),
        console,
    );
    Harness {
        mock,
        session,
        output,
    }
}

/// A small site tree: `about.txt` and `css/site.css`.
pub fn site_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "about.txt", "about us\n");
    write_file(dir.path(), "css/site.css", "body { margin: 0 }\n");
    dir
}

pub fn write_file(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}
