//! Operator-facing progress lines on stderr.

use std::fmt::Display;

#[derive(Debug, Clone, Copy)]
pub struct Ui {
    quiet: bool,
}

impl Ui {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn info(&self, msg: impl Display) {
        if !self.quiet {
            eprintln!("[INFO] {msg}");
        }
    }

    pub fn ok(&self, msg: impl Display) {
        if !self.quiet {
            eprintln!("[OK] {msg}");
        }
    }

    pub fn warn(&self, msg: impl Display) {
        eprintln!("[WARN] {msg}");
    }

    pub fn fail(&self, msg: impl Display) {
        eprintln!("[FAIL] {msg}");
    }
}
