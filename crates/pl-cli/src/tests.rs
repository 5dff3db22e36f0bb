use super::*;
use clap::Parser;
use crate::cli_test_support::*;
use pl_core::RandomSource;
use pl_dialogue::{Command, Dialogue, Question, Response, ResponsePart};
use std::io::Cursor;

struct FixedDraw(u32);

impl RandomSource for FixedDraw {
    fn next_u32(&mut self) -> u32 {
        self.0
    }
}

fn parts(text: &str, command: Command) -> Response {
    Response::from_parts(vec![
        ResponsePart::Text(text.to_string()),
        ResponsePart::Command(command),
    ])
}

fn iolo() -> Dialogue {
    let mut dialogue = Dialogue::new("Iolo");
    dialogue.set_pronoun("He");
    dialogue.set_prompt("Your interest?");
    dialogue.set_intro(Response::new("A bard with a crossbow."));
    dialogue.set_long_intro(Response::new("A bard with a fine yew crossbow."));
    dialogue.set_default_answer(Response::new("That I cannot help thee with."));
    dialogue.set_question(Some(Question::new(
        "Art thou well?",
        Response::new("Good."),
        parts("Pity.", Command::End),
    )));
    dialogue.add_keyword("job", parts("I make bows.", Command::Ask));
    dialogue.add_keyword("song", parts("Listen.", Command::StartMusicLb));
    dialogue
}

fn talk_transcript(dialogue: &Dialogue, draw: u32, input: &str) -> String {
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut writer = Vec::new();
    let code = run_talk_with_io(dialogue, &mut FixedDraw(draw), &mut reader, &mut writer)
        .expect("talk should run");
    assert_eq!(code, 0);
    String::from_utf8(writer).expect("utf8 output")
}

fn script_transcript(script: &mut pl_runtime::Script, input: &str) -> String {
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut writer = Vec::new();
    let code = run_script_with_io(script, &mut reader, &mut writer).expect("script should run");
    assert_eq!(code, 0);
    String::from_utf8(writer).expect("utf8 output")
}

#[test]
fn talk_answers_keywords_and_defaults_then_says_bye() {
    let output = talk_transcript(&iolo(), 255, "name\nlook\nbye\n");
    assert!(output.starts_with("You meet Iolo.\nA bard with a crossbow.\n"));
    assert!(output.contains("Your interest? That I cannot help thee with."));
    assert!(output.contains("A bard with a fine yew crossbow."));
    assert!(output.contains("Iolo says: Bye."));
    assert!(output.ends_with("RESULT:DONE\n"));
}

#[test]
fn ask_command_poses_the_question_after_the_response() {
    let output = talk_transcript(&iolo(), 255, "job\nmaybe\nno\n");
    let job = output.find("I make bows.").expect("job reply");
    let question = output.find("Art thou well?").expect("question");
    assert!(job < question);
    assert!(output.contains("Yes or no?"));
    assert!(output.contains("Pity."));
    assert!(output.ends_with("RESULT:DONE\n"));
}

#[test]
fn other_commands_are_shown_inline() {
    let output = talk_transcript(&iolo(), 255, "song\n");
    assert!(output.contains("Listen.\n[STARTMUSIC_LB]\n"));
}

#[test]
fn end_of_input_finishes_the_conversation() {
    let output = talk_transcript(&iolo(), 255, "job\n");
    assert!(output.contains("(y/n) > "));
    assert!(output.ends_with("RESULT:DONE\n"));
}

#[test]
fn turn_away_probability_can_end_or_attack() {
    let mut dialogue = iolo();
    dialogue.set_turn_away_prob(200);
    let output = talk_transcript(&dialogue, 0, "name\nname\n");
    assert!(output.contains("He attacks!"));
    assert!(output.ends_with("RESULT:ATTACK\n"));
    assert_eq!(output.matches("That I cannot help thee with.").count(), 1);

    dialogue.set_turn_away_prob(10);
    let output = talk_transcript(&dialogue, 0, "name\n");
    assert!(output.contains("He turns away!"));
    assert!(output.ends_with("RESULT:DONE\n"));
}

#[test]
fn attack_command_in_a_response_is_terminal() {
    let mut dialogue = iolo();
    dialogue.add_keyword("thief", parts("Die!", Command::Attack));
    let output = talk_transcript(&dialogue, 255, "thief\nname\n");
    assert!(output.contains("Die!\n"));
    assert!(!output.contains("That I cannot help thee with."));
    assert!(output.ends_with("RESULT:ATTACK\n"));
}

#[test]
fn script_runner_prints_text_effects_and_prompts() {
    let source = r#"<script id="shop">
      <buy>
        Want some gold?
        <input type="choice" name="answer" options="YN"/>
        <if test="$answer == y"><add type="gold" amount="5"/>Here.<else>Suit thyself.</else></if>
      </buy>
    </script>"#;
    let mut script = create_script_from_xml(CreateScriptFromXmlOptions {
        scripts_xml: std::collections::BTreeMap::from([(
            "shop.xml".to_string(),
            source.to_string(),
        )]),
        script_id: "shop".to_string(),
        start_label: Some("buy".to_string()),
        ..CreateScriptFromXmlOptions::default()
    })
    .expect("script should build");

    let output = script_transcript(&mut script, "q\ny\n");
    assert!(output.starts_with("Want some gold?\n[yn] > "));
    assert_eq!(output.matches("[yn] > ").count(), 2);
    assert!(output.contains(
        r#"EFFECT_JSON:{"kind":"add","item":"gold","subtype":null,"amount":5}"#
    ));
    assert!(output.contains("Here.\n"));
    assert!(output.ends_with("RESULT:END\n"));
}

#[test]
fn script_runner_reports_stop_and_eof() {
    let source = r#"<script id="halt"><first>One<stop/>Two</first><ask><input type="number" name="n"/></ask></script>"#;
    let scripts_xml =
        std::collections::BTreeMap::from([("halt.xml".to_string(), source.to_string())]);
    let options = |label: &str| CreateScriptFromXmlOptions {
        scripts_xml: scripts_xml.clone(),
        script_id: "halt".to_string(),
        start_label: Some(label.to_string()),
        ..CreateScriptFromXmlOptions::default()
    };

    let mut script = create_script_from_xml(options("first")).expect("script");
    let output = script_transcript(&mut script, "");
    assert_eq!(output, "One\nRESULT:STOPPED\n");

    let mut script = create_script_from_xml(options("ask")).expect("script");
    let output = script_transcript(&mut script, "");
    assert!(output.ends_with("RESULT:EOF\n"));
}

#[test]
fn sub_node_and_var_arguments_are_parsed() {
    assert_eq!(
        parse_sub_node("vendor:iolo").expect("sub node"),
        ("vendor".to_string(), "iolo".to_string())
    );
    for raw in ["vendor", ":iolo", "vendor:"] {
        let error = parse_sub_node(raw).expect_err("malformed sub node");
        assert_eq!(error.code, "CLI_SUB_NODE_INVALID");
    }

    assert_eq!(parse_var("gold=100").expect("var"), ("gold", "100"));
    assert_eq!(parse_var("motto=a=b").expect("var"), ("motto", "a=b"));
    let error = parse_var("gold").expect_err("missing value");
    assert_eq!(error.code, "CLI_VAR_INVALID");
}

#[test]
fn run_script_reads_a_scripts_dir_with_vars() {
    let root = temp_path("scripts-run");
    write_file(
        &root.join("shop.xml"),
        r#"<script id="shop"><greet>Welcome to {name}, thou hast {$gold} gold.</greet></script>"#,
    );
    write_file(
        &root.join("data/vendors.xml"),
        r#"<vendors><vendor id="iolo" name="Iolo's Bows"/></vendors>"#,
    );
    let cli = Cli::try_parse_from([
        "pl-cli",
        "script",
        "--scripts-dir",
        root.to_string_lossy().as_ref(),
        "--script-id",
        "shop",
        "--sub-node",
        "vendor:iolo",
        "--label",
        "greet",
        "--var",
        "gold=42",
    ])
    .expect("args should parse");
    let Mode::Script(args) = cli.command else {
        panic!("expected script mode");
    };

    let mut reader = Cursor::new(Vec::<u8>::new());
    let mut writer = Vec::new();
    let code = run_script(args, &mut reader, &mut writer).expect("script should run");
    assert_eq!(code, 0);
    let output = String::from_utf8(writer).expect("utf8 output");
    assert_eq!(
        output,
        "Welcome to Iolo's Bows, thou hast 42 gold.\nRESULT:END\n"
    );
}

#[test]
fn run_script_requires_a_source() {
    let cli = Cli::try_parse_from(["pl-cli", "script", "--script-id", "x", "--label", "y"])
        .expect("args should parse");
    let Mode::Script(args) = cli.command else {
        panic!("expected script mode");
    };
    let mut writer = Vec::<u8>::new();
    let error = run_script(args, &mut Cursor::new(Vec::<u8>::new()), &mut writer)
        .expect_err("no source");
    assert_eq!(error.code, "CLI_SOURCE_MISSING");
}

#[test]
fn run_talk_loads_dialogue_files() {
    let path = temp_path("talk").join("guard.xml");
    write_file(
        &path,
        r#"<dialogue name="Guard" prompt="What?"><intro>A stern guard.</intro><keyword name="bye|">Farewell.<end/></keyword></dialogue>"#,
    );
    let cli = Cli::try_parse_from([
        "pl-cli",
        "talk",
        "--dialogue",
        path.to_string_lossy().as_ref(),
        "--seed",
        "3",
    ])
    .expect("args should parse");
    let Mode::Talk(args) = cli.command else {
        panic!("expected talk mode");
    };

    assert!(!args.line_mode);
    let (dialogue, mut rng) = prepare_talk(args).expect("dialogue should load");
    let mut writer = Vec::new();
    let mut reader = Cursor::new(b"\n".to_vec());
    let code = run_talk_with_io(&dialogue, &mut rng, &mut reader, &mut writer)
        .expect("talk should run");
    assert_eq!(code, 0);
    let output = String::from_utf8(writer).expect("utf8 output");
    assert_eq!(
        output,
        "You meet Guard.\nA stern guard.\nWhat? Farewell.\nRESULT:DONE\n"
    );
}

#[test]
fn run_cli_from_args_maps_errors_to_exit_codes() {
    assert_eq!(run_cli_from_args(["pl-cli", "dance"]), 2);
    let missing = temp_path("missing").join("nobody.json");
    assert_eq!(
        run_cli_from_args([
            "pl-cli",
            "talk",
            "--dialogue",
            missing.to_string_lossy().as_ref(),
        ]),
        1
    );
}
