//! Operator interaction used by the interactive strategy and the organize loop.

use std::io::{self, BufRead, Write};

/// Line-oriented conversation with the person running the tool.
pub trait Prompter: Send + Sync {
    /// Shows a line of text.
    fn say(&self, text: &str);

    /// Shows `question` and blocks for one line of input, trimmed.
    /// `None` when input is closed.
    fn ask(&self, question: &str) -> Option<String>;
}

/// Prompts on stdout, reads answers from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn say(&self, text: &str) {
        println!("{text}");
    }

    fn ask(&self, question: &str) -> Option<String> {
        print!("{question}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

/// Replays canned answers and records everything shown.
#[cfg(test)]
pub(crate) struct ScriptedPrompter {
    answers: std::sync::Mutex<std::collections::VecDeque<String>>,
    output: std::sync::Mutex<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub(crate) fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: std::sync::Mutex::new(answers.into_iter().map(Into::into).collect()),
            output: std::sync::Mutex::new(String::new()),
        }
    }

    pub(crate) fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn say(&self, text: &str) {
        let mut out = self.output.lock().unwrap();
        out.push_str(text);
        out.push('\n');
    }

    fn ask(&self, question: &str) -> Option<String> {
        self.output.lock().unwrap().push_str(question);
        self.answers.lock().unwrap().pop_front()
    }
}
