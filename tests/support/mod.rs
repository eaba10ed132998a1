//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use solver_deps::error::Result;
use solver_deps::pipeline::Invocation;
use solver_deps::runner::{CommandRunner, StepOutput};

/// Records every invocation and imitates the filesystem effects of the
/// real tools: `git clone` creates the checkout, `cmake -B` the build tree.
pub struct RecordingRunner {
    pub invocations: Vec<Invocation>,
    fail_when: Box<dyn Fn(usize, &Invocation) -> Option<i32>>,
}

impl RecordingRunner {
    pub fn succeeding() -> Self {
        Self {
            invocations: Vec::new(),
            fail_when: Box::new(|_, _| None),
        }
    }

    /// Fail with `code` for every invocation matching `pred`.
    pub fn failing_when<F>(code: i32, pred: F) -> Self
    where
        F: Fn(&Invocation) -> bool + 'static,
    {
        Self {
            invocations: Vec::new(),
            fail_when: Box::new(move |_, inv| pred(inv).then_some(code)),
        }
    }

    /// Fail with `code` on the `index`-th invocation (0-based).
    pub fn failing_at(index: usize, code: i32) -> Self {
        Self {
            invocations: Vec::new(),
            fail_when: Box::new(move |i, _| (i == index).then_some(code)),
        }
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations.iter().map(|i| i.command_line()).collect()
    }

    /// Invocations other than `git`
    pub fn build_invocations(&self) -> Vec<&Invocation> {
        self.invocations.iter().filter(|i| i.program != "git").collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<StepOutput> {
        let index = self.invocations.len();
        self.invocations.push(invocation.clone());

        if let Some(code) = (self.fail_when)(index, invocation) {
            return Ok(StepOutput::failed(Some(code)));
        }

        match (invocation.program.as_str(), invocation.args.first().map(String::as_str)) {
            ("git", Some("clone")) => {
                let target = invocation.working_dir.join(&invocation.args[2]);
                fs::create_dir(&target)?;
                fs::write(target.join("Makefile"), &invocation.args[1])?;
            }
            ("cmake", _) => {
                fs::create_dir_all(invocation.working_dir.join("build"))?;
            }
            _ => {}
        }
        Ok(StepOutput::succeeded())
    }
}

/// A directory of shell scripts standing in for git, make and cmake.
///
/// Every call is appended to `log` as `<tool> <args> @ <cwd>`.
/// `FAKE_FAIL_CLONE=<dir>` makes that clone exit 128;
/// `FAKE_FAIL_MAKE_IN=<dir name>` makes make exit 2 in that directory;
/// `FAKE_HANG_MAKE_PID=<file>` makes make write its PID there and hang.
pub struct FakeToolchain {
    pub bin_dir: PathBuf,
    pub log: PathBuf,
}

const FAKE_GIT: &str = r#"#!/bin/sh
echo "git $* @ $(pwd)" >> "$FAKE_TOOL_LOG"
if [ "$1" = "--version" ]; then echo "git version 2.43.0"; exit 0; fi
if [ -n "$FAKE_FAIL_CLONE" ] && [ "$3" = "$FAKE_FAIL_CLONE" ]; then
  echo "fatal: unable to access '$2'" >&2
  exit 128
fi
mkdir "$3" || exit 128
echo "$2" > "$3/ORIGIN"
"#;

const FAKE_MAKE: &str = r#"#!/bin/sh
echo "make $* @ $(pwd)" >> "$FAKE_TOOL_LOG"
if [ -n "$FAKE_HANG_MAKE_PID" ]; then
  echo $$ > "$FAKE_HANG_MAKE_PID.tmp"
  mv "$FAKE_HANG_MAKE_PID.tmp" "$FAKE_HANG_MAKE_PID"
  exec sleep 1000
fi
if [ -n "$FAKE_FAIL_MAKE_IN" ] && [ "$(basename "$(pwd)")" = "$FAKE_FAIL_MAKE_IN" ]; then
  exit 2
fi
exit 0
"#;

const FAKE_CMAKE: &str = r#"#!/bin/sh
echo "cmake $* @ $(pwd)" >> "$FAKE_TOOL_LOG"
if [ "$1" = "-S" ]; then mkdir -p "$4"; fi
exit 0
"#;

/// Utilities the fake tools call; linked into the fake bin dir so PATH never
/// has to include a directory that may hold the real git, make or cmake.
const SHELL_UTILITIES: [&str; 5] = ["sh", "mkdir", "basename", "mv", "sleep"];

fn link_utility(bin_dir: &Path, name: &str) {
    let real = ["/usr/bin", "/bin"]
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .find(|path| path.exists())
        .unwrap_or_else(|| panic!("{} not found in /usr/bin or /bin", name));
    std::os::unix::fs::symlink(real, bin_dir.join(name)).expect("link shell utility");
}

impl FakeToolchain {
    pub fn create(root: &Path) -> Self {
        let bin_dir = root.join("fakebin");
        fs::create_dir_all(&bin_dir).expect("create fake bin dir");

        for name in SHELL_UTILITIES {
            link_utility(&bin_dir, name);
        }

        for (name, body) in [("git", FAKE_GIT), ("make", FAKE_MAKE), ("cmake", FAKE_CMAKE)] {
            let path = bin_dir.join(name);
            fs::write(&path, body).expect("write fake tool");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("chmod fake tool");
        }

        Self {
            bin_dir,
            log: root.join("tools.log"),
        }
    }

    /// PATH containing only the fake tools and the utilities they need
    pub fn path_env(&self) -> String {
        self.bin_dir.display().to_string()
    }

    /// Make `tool` unavailable, as if it were not installed.
    pub fn remove(&self, tool: &str) {
        fs::remove_file(self.bin_dir.join(tool)).expect("remove fake tool");
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
