use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use clap::Parser;
use pl_api::{create_script_from_xml, default_loaders, load_dialogue, CreateScriptFromXmlOptions};
use pl_core::{ParleyError, ScriptValue, SeededRandom};
use pl_dialogue::Dialogue;
use pl_runtime::DEFAULT_RANDOM_SEED;

mod cli_args;
mod error_map;
mod script_runner;
mod source_loader;
mod talk;
mod tui;

pub(crate) use cli_args::{Cli, Mode, ScriptArgs, TalkArgs};
pub(crate) use error_map::{
    emit_error, map_cli_io, map_cli_json, map_cli_source_path, map_cli_source_read,
    map_cli_source_scan, map_tui_io,
};
pub(crate) use script_runner::run_script_with_io;
pub(crate) use source_loader::{
    load_dialogue_source, load_script_file, read_scripts_xml_from_dir, resolve_scripts_dir,
};
pub(crate) use talk::{run_talk_with_io, TalkSession};
pub(crate) use tui::{run_talk_line_mode, run_talk_terminal};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, ParleyError> {
    match cli.command {
        Mode::Talk(args) => {
            let line_mode = args.line_mode;
            let (dialogue, mut rng) = prepare_talk(args)?;
            if line_mode {
                run_talk_line_mode(&dialogue, &mut rng)
            } else {
                run_talk_terminal(&dialogue, &mut rng)
            }
        }
        Mode::Script(args) => {
            let stdin = io::stdin();
            let mut reader = stdin.lock();
            let mut writer = io::stdout();
            run_script(args, &mut reader, &mut writer)
        }
    }
}

fn prepare_talk(args: TalkArgs) -> Result<(Dialogue, SeededRandom), ParleyError> {
    let source = load_dialogue_source(&args.dialogue, args.source_type.as_deref())?;
    let dialogue = load_dialogue(&default_loaders(), &source.source_type, &source.text)?;
    let rng = SeededRandom::new(args.seed.unwrap_or(DEFAULT_RANDOM_SEED));
    Ok((dialogue, rng))
}

fn run_script(
    args: ScriptArgs,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ParleyError> {
    let scripts_xml = match (&args.file, &args.scripts_dir) {
        (Some(file), _) => load_script_file(file)?,
        (None, Some(scripts_dir)) => {
            let scripts_dir = resolve_scripts_dir(scripts_dir)?;
            read_scripts_xml_from_dir(&scripts_dir)?
        }
        (None, None) => {
            return Err(ParleyError::new(
                "CLI_SOURCE_MISSING",
                "pass --file or --scripts-dir",
            ))
        }
    };
    let sub_node = args.sub_node.as_deref().map(parse_sub_node).transpose()?;
    let mut script = create_script_from_xml(CreateScriptFromXmlOptions {
        scripts_xml,
        script_id: args.script_id,
        sub_node,
        start_label: None,
        random_seed: args.seed,
        step_limit: args.step_limit,
    })?;
    for raw in &args.vars {
        let (name, value) = parse_var(raw)?;
        script.set_var(name, ScriptValue::from_text(value));
    }
    script.start(&args.label)?;
    run_script_with_io(&mut script, reader, writer)
}

/// `NAME:ID` as given to `--sub-node`.
pub(crate) fn parse_sub_node(raw: &str) -> Result<(String, String), ParleyError> {
    match raw.split_once(':') {
        Some((name, id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
            Ok((name.trim().to_string(), id.trim().to_string()))
        }
        _ => Err(ParleyError::new(
            "CLI_SUB_NODE_INVALID",
            format!("--sub-node expects NAME:ID, got \"{}\"", raw),
        )),
    }
}

/// `NAME=VALUE` as given to `--var`.
pub(crate) fn parse_var(raw: &str) -> Result<(&str, &str), ParleyError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => Err(ParleyError::new(
            "CLI_VAR_INVALID",
            format!("--var expects NAME=VALUE, got \"{}\"", raw),
        )),
    }
}

/// `None` once the reader is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, ParleyError> {
    write!(writer, "{}", prefix).map_err(map_cli_io)?;
    writer.flush().map_err(map_cli_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_cli_io)? == 0 {
        writeln!(writer).map_err(map_cli_io)?;
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}


#[cfg(test)]
mod tests;
