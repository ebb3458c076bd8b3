use serde::Serialize;
use std::fmt;

use crate::presentation::Palette;

#[derive(Debug, Clone, Serialize)]
pub struct ModuleStatus {
    pub module: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of `check-config`: resolved modules and what the file configures.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummaryView {
    pub path: String,
    pub found: bool,
    pub resources: Vec<String>,
    pub normalizers: Vec<String>,
    pub modules: Vec<ModuleStatus>,
    #[serde(skip)]
    pub palette: Palette,
}

impl fmt::Display for ConfigSummaryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.found {
            self.path.clone()
        } else {
            format!("{} (not found, defaults)", self.path)
        };
        writeln!(f, "{} {}", self.palette.heading("Config"), source)?;

        if !self.resources.is_empty() {
            writeln!(f, "Resources: {}", self.resources.join(", "))?;
        }
        if !self.normalizers.is_empty() {
            writeln!(f, "Normalizers: {}", self.normalizers.join(", "))?;
        }

        writeln!(f)?;
        let width = self.modules.iter().map(|m| m.module.len()).max().unwrap_or(0);
        for status in &self.modules {
            let state = if status.active { "active" } else { "disabled" };
            match &status.reason {
                Some(reason) => writeln!(
                    f,
                    "  {:<width$}  {} {}",
                    status.module,
                    state,
                    self.palette.dim(&format!("({reason})")),
                    width = width
                )?,
                None => writeln!(f, "  {:<width$}  {}", status.module, state, width = width)?,
            }
        }
        Ok(())
    }
}
