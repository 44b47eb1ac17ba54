use std::io::{BufRead, Write};

use anyhow::{Context, Result};

pub(crate) struct Prompt<'a> {
    input: &'a mut dyn BufRead,
    output: &'a mut dyn Write,
}

impl<'a> Prompt<'a> {
    pub(crate) fn new(input: &'a mut dyn BufRead, output: &'a mut dyn Write) -> Self {
        Self { input, output }
    }

    /// Reads one trimmed line, or `None` at end of input.
    pub(crate) fn prompt_line(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}: ").context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush prompt")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read prompt input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Reads unseal keys one per line until a blank line or end of input.
    pub(crate) fn prompt_unseal_keys(&mut self) -> Result<Vec<String>> {
        writeln!(
            self.output,
            "Enter unseal keys (one per line). Submit empty line to finish:"
        )
        .context("Failed to write prompt")?;
        let mut keys = Vec::new();
        while let Some(key) = self.prompt_line(&format!("Key {}", keys.len() + 1))? {
            if key.is_empty() {
                break;
            }
            keys.push(key);
        }
        Ok(keys)
    }
}
