#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Fixed clock for every test invocation.
pub const TODAY: &str = "2025-06-01";

const OPEN_CONFIG: &str = "[auth]\nrequire_login = false\n";

pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    /// Workspace with the login gate switched off.
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let env = Self::bare()?;
        env.write_config(OPEN_CONFIG)?;
        Ok(env)
    }

    /// Workspace with default config, so protected commands need a session.
    pub fn bare() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".dayplan.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_slot(&self, slot: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(self.data_dir().join(format!("{slot}.json")))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn outbox(&self) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
        let path = self.data_dir().join("outbox.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)?;
        let mut mails = Vec::new();
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            mails.push(serde_json::from_str(line)?);
        }
        Ok(mails)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dayplan").expect("dayplan binary");
        cmd.current_dir(self.path())
            .env_remove("DAYPLAN_CONFIG")
            .env_remove("DAYPLAN_PASSWORD")
            .env_remove("RUST_LOG")
            .env("DAYPLAN_DATA_DIR", self.data_dir())
            .env("DAYPLAN_TODAY", TODAY);
        cmd
    }

    /// Run with `--json` and return the parsed success envelope.
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        Ok(serde_json::from_slice(&output)?)
    }

    /// Run with `--json`, expect exit `code`, and return the error envelope.
    pub fn json_failure(
        &self,
        args: &[&str],
        code: i32,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        Ok(serde_json::from_slice(&output)?)
    }
}
