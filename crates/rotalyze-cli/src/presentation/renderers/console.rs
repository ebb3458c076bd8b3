use anyhow::Result;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

use super::traits::Renderer;
use crate::types::OutputFormat;

pub struct ConsoleRenderer {
    format: OutputFormat,
}

impl ConsoleRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Renderer for ConsoleRenderer {
    fn render<T>(&self, view: &T) -> Result<()>
    where
        T: Serialize + Display,
    {
        let mut out = std::io::stdout().lock();
        match self.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(view)?)?,
            OutputFormat::Plain => write!(out, "{}", view)?,
        }
        out.flush()?;
        Ok(())
    }
}
