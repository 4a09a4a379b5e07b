use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Parameters of one long-text question, as written by the content editor.
///
/// Every field is optional on the wire; missing values fall back to the
/// defaults below so the core never sees a partially filled object.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WidgetParams {
    #[serde(rename = "text", default = "default_prompt_text")]
    pub prompt_text: String,

    #[serde(default)]
    #[validate(nested)]
    pub input: InputParams,

    #[serde(default)]
    pub submit_save: SubmitSaveParams,

    #[serde(default)]
    pub rubric: RubricParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InputParams {
    #[serde(rename = "placeholderText", default = "default_placeholder")]
    pub placeholder: String,

    /// Height of the editor in text lines
    #[serde(rename = "rows", default = "default_visible_lines")]
    #[validate(range(min = 1, message = "input.rows must be at least 1"))]
    pub visible_lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSaveParams {
    #[serde(default)]
    pub show_submit: bool,

    #[serde(rename = "submitText", default = "default_submit_text")]
    pub submit_confirmation_text: String,

    /// Negative disables autosave, zero saves on blur only, positive also
    /// debounces edits by that many seconds.
    #[serde(rename = "autoSave", default)]
    pub auto_save_delay_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricParams {
    #[serde(default)]
    pub visible_to_user: bool,

    #[serde(default)]
    pub criteria: Vec<RubricCriterion>,

    #[serde(default = "default_rubric_label")]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricCriterion {
    #[serde(rename = "weight", default)]
    pub weight_label: String,

    #[serde(default)]
    pub text: String,
}

/// How edits and blurs turn into saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSaveMode {
    Disabled,
    BlurOnly,
    Debounced(Duration),
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("invalid question parameters: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("question parameters failed validation: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

fn default_prompt_text() -> String {
    "To be or not to be?".to_string()
}

fn default_placeholder() -> String {
    "Enter your answer here.".to_string()
}

fn default_visible_lines() -> u32 {
    5
}

fn default_submit_text() -> String {
    "Your answer has been submitted.".to_string()
}

fn default_rubric_label() -> String {
    "Rubric".to_string()
}

impl Default for WidgetParams {
    fn default() -> Self {
        Self {
            prompt_text: default_prompt_text(),
            input: InputParams::default(),
            submit_save: SubmitSaveParams::default(),
            rubric: RubricParams::default(),
        }
    }
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            visible_lines: default_visible_lines(),
        }
    }
}

impl Default for SubmitSaveParams {
    fn default() -> Self {
        Self {
            show_submit: false,
            submit_confirmation_text: default_submit_text(),
            auto_save_delay_seconds: 0,
        }
    }
}

impl Default for RubricParams {
    fn default() -> Self {
        Self {
            visible_to_user: false,
            criteria: Vec::new(),
            label: default_rubric_label(),
        }
    }
}

impl WidgetParams {
    /// Decode and validate a JSON parameter object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ParamsError> {
        let params: WidgetParams = serde_json::from_value(value)?;
        params.validate()?;
        Ok(params)
    }

    pub fn auto_save_mode(&self) -> AutoSaveMode {
        match self.submit_save.auto_save_delay_seconds {
            secs if secs < 0 => AutoSaveMode::Disabled,
            0 => AutoSaveMode::BlurOnly,
            secs => AutoSaveMode::Debounced(Duration::from_secs(secs as u64)),
        }
    }

    /// The rubric, if it should be shown to the learner at all.
    pub fn visible_rubric(&self) -> Option<&RubricParams> {
        if self.rubric.visible_to_user && !self.rubric.criteria.is_empty() {
            Some(&self.rubric)
        } else {
            None
        }
    }
}
