use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "pl-cli")]
#[command(about = "NPC conversation and script runner")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Talk(TalkArgs),
    Script(ScriptArgs),
}

#[derive(Debug, Args)]
pub(crate) struct TalkArgs {
    #[arg(long = "dialogue")]
    pub(crate) dialogue: String,
    /// Defaults from the file extension.
    #[arg(long = "source-type")]
    pub(crate) source_type: Option<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    /// Plain prompts even on a terminal.
    #[arg(long = "line-mode")]
    pub(crate) line_mode: bool,
}

#[derive(Debug, Args)]
pub(crate) struct ScriptArgs {
    #[arg(long = "file", conflicts_with = "scripts_dir")]
    pub(crate) file: Option<String>,
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: Option<String>,
    #[arg(long = "script-id")]
    pub(crate) script_id: String,
    /// `NAME:ID`, e.g. `vendor:iolo`.
    #[arg(long = "sub-node")]
    pub(crate) sub_node: Option<String>,
    #[arg(long = "label")]
    pub(crate) label: String,
    /// `NAME=VALUE`, repeatable.
    #[arg(long = "var")]
    pub(crate) vars: Vec<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    #[arg(long = "step-limit")]
    pub(crate) step_limit: Option<usize>,
}
