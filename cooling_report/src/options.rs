use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::ModelOptions;
use crate::ReportError;

pub const DEFAULT_FOOTER: &str = "TESTO 174H Termistor NTC - Série 85327157";
pub const DEFAULT_LOGO: &str = "assets/testo-be-sure-logo-claim.webp";

/// Presentation settings. Every field has a default, so a JSON override file
/// only needs the keys it changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportOptions {
    pub footer_text: String,
    pub logo_path: Option<PathBuf>,
    pub ticks_per_minute: u32,
    /// Seconds shown on every tabulated timestamp.
    pub pinned_second: u32,
    pub chart_width_px: u32,
    pub chart_height_px: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            footer_text: DEFAULT_FOOTER.to_string(),
            logo_path: Some(PathBuf::from(DEFAULT_LOGO)),
            ticks_per_minute: ModelOptions::default().ticks_per_minute,
            pinned_second: 30,
            chart_width_px: 1380,
            chart_height_px: 810,
        }
    }
}

impl ReportOptions {
    pub fn model(&self) -> ModelOptions {
        ModelOptions {
            ticks_per_minute: self.ticks_per_minute,
        }
    }

    pub fn chart_size(&self) -> (u32, u32) {
        (self.chart_width_px, self.chart_height_px)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if !(1..=600).contains(&self.ticks_per_minute) {
            return Err(ReportError::InvalidOption(format!(
                "ticks_per_minute must be between 1 and 600, got {}",
                self.ticks_per_minute
            )));
        }
        if self.pinned_second > 59 {
            return Err(ReportError::InvalidOption(format!(
                "pinned_second must be between 0 and 59, got {}",
                self.pinned_second
            )));
        }
        let (width, height) = self.chart_size();
        if !(200..=4000).contains(&width) || !(150..=4000).contains(&height) {
            return Err(ReportError::InvalidOption(format!(
                "chart size {width}x{height} px is outside 200x150..4000x4000"
            )));
        }
        Ok(())
    }
}
