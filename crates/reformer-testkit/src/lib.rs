//! Shared fixtures for Reformer tests.
//!
//! Fixtures are raw text so each crate deserializes them with its own
//! types.

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

/// Policy snapshot: first year 2017, two default years, ten parameters
/// covering scalar, MARS-indexed, kids-indexed, wage-indexed, boolean,
/// hidden, and data-source-restricted cases.
pub const POLICY_SNAPSHOT_JSON: &str = include_str!("../fixtures/policy_snapshot.json");

/// Year-keyed reform file with a separate assumptions document.
pub const REFORM_FILE_JSON: &str = include_str!("../fixtures/reform_file.json");
pub const ASSUMPTIONS_FILE_JSON: &str = include_str!("../fixtures/assumptions_file.json");

/// Flat form submission, including meta keys and a stray unknown field.
pub const FORM_FIELDS_JSON: &str = include_str!("../fixtures/form_fields.json");

/// Simulation results for three years, current engine key names.
pub const RESULTS_JSON: &str = include_str!("../fixtures/results.json");

/// Simulation results using pre-0.13 engine key names.
pub const LEGACY_RESULTS_JSON: &str = include_str!("../fixtures/legacy_results.json");

/// Parse a fixture into a generic JSON value.
pub fn fixture_value(text: &str) -> serde_json::Value {
    serde_json::from_str(text).expect("fixture must be valid JSON")
}

/// A temporary directory that removes itself when dropped.
pub struct FixtureDir {
    dir: TempDir,
}

impl FixtureDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Write `contents` to `name` inside the directory and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create fixture file");
        file.write_all(contents.as_bytes())
            .expect("write fixture file");
        path
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

impl Default for FixtureDir {
    fn default() -> Self {
        Self::new()
    }
}
