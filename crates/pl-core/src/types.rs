use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ParleyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Choice,
    Number,
    String,
    Direction,
    Player,
    Keypress,
}

impl InputKind {
    pub fn from_name(name: &str) -> Result<Self, ParleyError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "choice" => Ok(Self::Choice),
            "number" => Ok(Self::Number),
            "string" | "text" => Ok(Self::String),
            "direction" => Ok(Self::Direction),
            "player" => Ok(Self::Player),
            "keypress" => Ok(Self::Keypress),
            other => Err(ParleyError::new(
                "SCRIPT_INPUT_TYPE",
                format!("Unknown input type \"{}\".", other),
            )),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Choice => "choice",
            Self::Number => "number",
            Self::String => "string",
            Self::Direction => "direction",
            Self::Player => "player",
            Self::Keypress => "keypress",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a suspended script is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequest {
    pub kind: InputKind,
    pub target_var: Option<String>,
    pub max_len: Option<usize>,
    /// Valid single-character answers for [`InputKind::Choice`], lowercase.
    pub choices: Option<String>,
}

impl InputRequest {
    pub fn keypress() -> Self {
        Self {
            kind: InputKind::Keypress,
            target_var: None,
            max_len: None,
            choices: None,
        }
    }
}
