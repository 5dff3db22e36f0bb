use std::io::{BufRead, Write};

use pl_core::{InputKind, InputRequest, ParleyError};
use pl_runtime::{EffectOutcome, HostEffect, Script, ScriptOutput};

use crate::{map_cli_io, map_cli_json, prompt_input_from};

/// Runs `script` to its end, printing host effects as `EFFECT_JSON:` lines.
pub(crate) fn run_script_with_io(
    script: &mut Script,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ParleyError> {
    let mut effects = Vec::new();
    loop {
        let output = {
            let mut host = |effect: &HostEffect| -> Result<EffectOutcome, ParleyError> {
                effects.push(effect.clone());
                Ok(EffectOutcome::Done)
            };
            script.next_output(&mut host)?
        };
        for effect in effects.drain(..) {
            writeln!(
                writer,
                "EFFECT_JSON:{}",
                serde_json::to_string(&effect).map_err(map_cli_json)?
            )
            .map_err(map_cli_io)?;
        }

        match output {
            ScriptOutput::Text { text } => writeln!(writer, "{}", text).map_err(map_cli_io)?,
            ScriptOutput::Wait { millis } => {
                writeln!(writer, "(wait {}ms)", millis).map_err(map_cli_io)?
            }
            ScriptOutput::Input { request } => loop {
                let Some(raw) = prompt_input_from(&input_prompt(&request), reader, writer)? else {
                    writeln!(writer, "RESULT:EOF").map_err(map_cli_io)?;
                    return Ok(0);
                };
                match script.submit_input(&raw) {
                    Ok(()) => break,
                    Err(error) if error.code == "SCRIPT_INPUT_INVALID" => {
                        writeln!(writer, "{}", error.message).map_err(map_cli_io)?
                    }
                    Err(error) => return Err(error),
                }
            },
            ScriptOutput::Stopped => {
                writeln!(writer, "RESULT:STOPPED").map_err(map_cli_io)?;
                return Ok(0);
            }
            ScriptOutput::End => {
                writeln!(writer, "RESULT:END").map_err(map_cli_io)?;
                return Ok(0);
            }
        }
    }
}

fn input_prompt(request: &InputRequest) -> String {
    match (&request.kind, &request.choices) {
        (InputKind::Choice, Some(choices)) => format!("[{}] > ", choices),
        (InputKind::Keypress, _) => "(press enter) ".to_string(),
        (kind, _) => format!("({}) > ", kind),
    }
}
