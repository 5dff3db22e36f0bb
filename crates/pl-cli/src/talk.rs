use std::io::{BufRead, Write};

use log::warn;
use pl_core::{ParleyError, RandomSource};
use pl_dialogue::{
    Command, Conversation, ConversationState, Dialogue, InputRequired, Response, ResponsePart,
};

use crate::{map_cli_io, prompt_input_from};

const DEFAULT_PROMPT: &str = "Your interest?";
const BYE_KEYWORD: &str = "bye";
/// Shows the long introduction unless the dialogue defines its own `look`.
const LOOK_KEYWORD: &str = "look";

/// Deferred until the whole response has been shown.
#[derive(Debug, Default)]
struct Followup {
    ask: bool,
    terminal: Option<ConversationState>,
}

/// Drives one conversation: looks up keywords, renders responses and runs their
/// command tokens. Every call returns the lines to show the player.
pub(crate) struct TalkSession<'a> {
    dialogue: &'a Dialogue,
    rng: &'a mut dyn RandomSource,
    conversation: Conversation,
}

impl<'a> TalkSession<'a> {
    pub(crate) fn new(dialogue: &'a Dialogue, rng: &'a mut dyn RandomSource) -> Self {
        Self {
            dialogue,
            rng,
            conversation: Conversation::new(),
        }
    }

    pub(crate) fn dialogue(&self) -> &Dialogue {
        self.dialogue
    }

    pub(crate) fn state(&self) -> ConversationState {
        self.conversation.state()
    }

    pub(crate) fn input_required(&self) -> InputRequired {
        self.conversation.input_required()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.conversation.is_done()
    }

    pub(crate) fn outcome(&self) -> &'static str {
        match self.conversation.state() {
            ConversationState::Attack => "ATTACK",
            _ => "DONE",
        }
    }

    pub(crate) fn prompt(&self) -> String {
        match self.conversation.state() {
            ConversationState::AskYesNo => "(y/n) > ".to_string(),
            _ if self.dialogue.prompt().is_empty() => format!("{} ", DEFAULT_PROMPT),
            _ => format!("{} ", self.dialogue.prompt()),
        }
    }

    pub(crate) fn begin(&mut self) -> Vec<String> {
        let dialogue = self.dialogue;
        let mut lines = vec![format!("You meet {}.", dialogue.name())];
        self.respond(dialogue.intro(), &mut lines);
        if self.conversation.state() == ConversationState::Intro {
            self.conversation.set_state(ConversationState::Talk);
        }
        lines
    }

    pub(crate) fn submit(&mut self, raw: &str) -> Vec<String> {
        let mut lines = Vec::new();
        if self.is_done() {
            return lines;
        }
        self.conversation.set_player_input(raw);
        let input = self.conversation.player_input().trim().to_string();

        if self.conversation.state() == ConversationState::AskYesNo {
            self.answer_question(&input, &mut lines);
        } else {
            self.talk(&input, &mut lines);
            if self.conversation.state() == ConversationState::Talk {
                self.react(&mut lines);
            }
        }
        lines
    }

    /// The player walked away.
    pub(crate) fn hang_up(&mut self) {
        if !self.is_done() {
            self.conversation.finish();
        }
    }

    fn talk(&mut self, input: &str, lines: &mut Vec<String>) {
        let dialogue = self.dialogue;
        if let Some(keyword) = dialogue.keyword(input) {
            self.respond(keyword.response(), lines);
        } else if input.is_empty() || input.eq_ignore_ascii_case(BYE_KEYWORD) {
            lines.push(format!("{} says: Bye.", dialogue.name()));
            self.conversation.finish();
        } else if input.eq_ignore_ascii_case(LOOK_KEYWORD) {
            self.respond(dialogue.long_intro(), lines);
        } else {
            self.respond(dialogue.default_answer(), lines);
        }
    }

    fn answer_question(&mut self, input: &str, lines: &mut Vec<String>) {
        let dialogue = self.dialogue;
        let Some(question) = dialogue.question() else {
            self.conversation.set_state(ConversationState::Talk);
            return;
        };
        match question.answer(input) {
            Some(response) => {
                self.conversation.set_state(ConversationState::Talk);
                self.respond(response, lines);
            }
            None => lines.push("Yes or no?".to_string()),
        }
    }

    /// The talker may lose interest or turn hostile after each exchange.
    fn react(&mut self, lines: &mut Vec<String>) {
        let who = if self.dialogue.pronoun().is_empty() {
            self.dialogue.name()
        } else {
            self.dialogue.pronoun()
        };
        match self.dialogue.get_action(&mut *self.rng) {
            Command::End => {
                lines.push(format!("{} turns away!", who));
                self.conversation.finish();
            }
            Command::Attack => {
                lines.push(format!("{} attacks!", who));
                self.conversation.set_state(ConversationState::Attack);
            }
            _ => {}
        }
    }

    fn respond(&mut self, response: &Response, lines: &mut Vec<String>) {
        let mut followup = Followup::default();
        for part in response.parts() {
            match part {
                ResponsePart::Text(text) => self.conversation.push_reply(&text),
                ResponsePart::Command(command) => {
                    self.flush_reply(lines);
                    match command {
                        Command::None => {}
                        Command::Ask => followup.ask = true,
                        Command::End => {
                            followup.terminal.get_or_insert(ConversationState::Done);
                        }
                        Command::Attack => followup.terminal = Some(ConversationState::Attack),
                        other => lines.push(format!("[{}]", other.name())),
                    }
                }
            }
        }

        if let Some(terminal) = followup.terminal {
            self.flush_reply(lines);
            self.conversation.set_state(terminal);
            return;
        }
        if followup.ask {
            match self.dialogue.question() {
                Some(question) => {
                    self.conversation.push_reply(&question.text);
                    self.conversation.set_state(ConversationState::AskYesNo);
                }
                None => warn!("{}: <ASK> without a question", self.dialogue.name()),
            }
        }
        self.flush_reply(lines);
    }

    fn flush_reply(&mut self, lines: &mut Vec<String>) {
        lines.extend(self.conversation.drain_reply());
    }
}

pub(crate) fn run_talk_with_io(
    dialogue: &Dialogue,
    rng: &mut dyn RandomSource,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ParleyError> {
    let mut session = TalkSession::new(dialogue, rng);
    write_lines(writer, session.begin())?;
    while !session.is_done() {
        let Some(raw) = prompt_input_from(&session.prompt(), reader, writer)? else {
            session.hang_up();
            break;
        };
        write_lines(writer, session.submit(&raw))?;
    }
    writeln!(writer, "RESULT:{}", session.outcome()).map_err(map_cli_io)?;
    Ok(0)
}

fn write_lines(writer: &mut dyn Write, lines: Vec<String>) -> Result<(), ParleyError> {
    for line in lines {
        writeln!(writer, "{}", line).map_err(map_cli_io)?;
    }
    Ok(())
}
