//! Write confirmation

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Interactive yes/no prompt
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Asks on stdin, defaulting to "no"
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Fixed answer, for non-interactive runs and tests
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0
    }
}

/// Decides whether fixed data may be written.
///
/// Asks at most once per module and remembers the answer. `skip` (the "yes"
/// flag) allows every write without asking.
pub struct WriteGate {
    confirm: Box<dyn Confirm>,
    skip: bool,
    answers: BTreeMap<String, bool>,
}

impl WriteGate {
    pub fn new(confirm: Box<dyn Confirm>, skip: bool) -> Self {
        Self {
            confirm,
            skip,
            answers: BTreeMap::new(),
        }
    }

    /// Gate that never asks and always allows
    pub fn always() -> Self {
        Self::new(Box::new(AutoConfirm(true)), true)
    }

    pub fn allow(&mut self, module: &str) -> bool {
        if self.skip {
            return true;
        }
        if let Some(answer) = self.answers.get(module) {
            return *answer;
        }
        let answer = self
            .confirm
            .confirm(&format!("Write fixes for {} back to disk?", module));
        self.answers.insert(module.to_string(), answer);
        answer
    }

    /// Whether writes for `module` were refused
    pub fn declined(&self, module: &str) -> bool {
        !self.skip && self.answers.get(module) == Some(&false)
    }
}
