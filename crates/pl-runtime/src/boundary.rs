use log::debug;
use pl_core::{InputKind, InputRequest, ParleyError, ScriptValue};

use crate::{Script, ScriptState};

/// Party slots addressable by a `player` input.
pub const PARTY_SIZE: i64 = 8;

impl Script {
    /// Validates `raw` against the pending request, stores it in the requested
    /// variable and resumes after the input node. Invalid input keeps the script
    /// suspended.
    pub fn submit_input(&mut self, raw: &str) -> Result<(), ParleyError> {
        let Some(request) = self.pending_input.clone() else {
            return Err(ParleyError::new(
                "SCRIPT_NO_PENDING_INPUT",
                "No pending input is available.",
            ));
        };

        let value = validate_input(&request, raw)?;
        if let Some(target) = &request.target_var {
            debug!("script input {} = {:?}", target, value);
            self.variables.insert(target.clone(), value);
        }
        self.pending_input = None;
        self.state = ScriptState::Normal;
        Ok(())
    }
}

fn invalid(request: &InputRequest, raw: &str, detail: &str) -> ParleyError {
    ParleyError::new(
        "SCRIPT_INPUT_INVALID",
        format!(
            "\"{}\" is not a valid {} answer: {}.",
            raw, request.kind, detail
        ),
    )
}

fn validate_input(request: &InputRequest, raw: &str) -> Result<ScriptValue, ParleyError> {
    let trimmed = raw.trim();
    match request.kind {
        InputKind::Keypress => Ok(trimmed
            .chars()
            .next()
            .map(|c| ScriptValue::Str(c.to_string()))
            .unwrap_or_default()),
        InputKind::Choice => {
            let Some(choice) = trimmed.chars().next().map(|c| c.to_ascii_lowercase()) else {
                return Err(invalid(request, raw, "empty"));
            };
            if let Some(choices) = &request.choices {
                if !choices.contains(choice) {
                    return Err(invalid(
                        request,
                        raw,
                        &format!("expected one of \"{}\"", choices),
                    ));
                }
            }
            Ok(ScriptValue::Str(choice.to_string()))
        }
        InputKind::Number => trimmed
            .parse::<i64>()
            .map(ScriptValue::Int)
            .map_err(|_| invalid(request, raw, "not a number")),
        InputKind::Player => match trimmed.parse::<i64>() {
            Ok(index) if (1..=PARTY_SIZE).contains(&index) => Ok(ScriptValue::Int(index)),
            _ => Err(invalid(
                request,
                raw,
                &format!("expected 1 to {}", PARTY_SIZE),
            )),
        },
        InputKind::Direction => {
            let letter = match trimmed.to_ascii_lowercase().as_str() {
                "n" | "north" => "n",
                "e" | "east" => "e",
                "s" | "south" => "s",
                "w" | "west" => "w",
                _ => return Err(invalid(request, raw, "expected a compass direction")),
            };
            Ok(ScriptValue::Str(letter.to_string()))
        }
        InputKind::String => {
            let text: String = match request.max_len {
                Some(max_len) => trimmed.chars().take(max_len).collect(),
                None => trimmed.to_string(),
            };
            Ok(ScriptValue::Str(text))
        }
    }
}
