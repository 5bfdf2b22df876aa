use std::io::{self, BufRead, Write};

use crate::error::RunError;

/// Interactive questions asked while resolving options
pub trait Prompt {
    /// Print something for the user to read before answering
    fn show(&mut self, text: &str);

    /// Ask a question and return the trimmed answer
    fn ask(&mut self, question: &str) -> Result<String, RunError>;
}

/// Prompts on stdout and reads answers from stdin
pub struct Terminal;

impl Prompt for Terminal {
    fn show(&mut self, text: &str) {
        println!("{text}");
    }

    fn ask(&mut self, question: &str) -> Result<String, RunError> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Err(RunError::Prompt(io::Error::new(io::ErrorKind::UnexpectedEof, "no more input")));
        }
        Ok(answer.trim().to_string())
    }
}
