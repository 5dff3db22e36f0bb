use indexmap::IndexMap;
use log::debug;
use pl_core::RandomSource;

use crate::keyword::{normalize_keyword, Keyword};
use crate::{Command, Response};

/// Exclusive upper bound of the `get_action` draw.
pub const ACTION_DRAW_RANGE: u32 = 0x100;
/// Below this margin between probability and draw the talker leaves instead of attacking.
pub const ATTACK_MARGIN: u32 = 0x40;

#[derive(Debug, Clone)]
pub struct Question {
    pub text: String,
    pub yes: Response,
    pub no: Response,
}

impl Question {
    pub fn new(text: impl Into<String>, yes: Response, no: Response) -> Self {
        Self {
            text: text.into(),
            yes,
            no,
        }
    }

    /// `y...` picks the yes branch, `n...` the no branch, anything else neither.
    pub fn answer(&self, input: &str) -> Option<&Response> {
        match input.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => Some(&self.yes),
            Some('n') => Some(&self.no),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dialogue {
    name: String,
    pronoun: String,
    prompt: String,
    intro: Response,
    long_intro: Response,
    default_answer: Response,
    keywords: IndexMap<String, Keyword>,
    question: Option<Question>,
    /// Out of 256. Read as the chance the talker turns on the player at all, and
    /// once that fires, as the attack-versus-leave threshold.
    turn_away_prob: u32,
}

impl Dialogue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn pronoun(&self) -> &str {
        &self.pronoun
    }

    pub fn set_pronoun(&mut self, pronoun: impl Into<String>) {
        self.pronoun = pronoun.into();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn intro(&self) -> &Response {
        &self.intro
    }

    pub fn set_intro(&mut self, intro: Response) {
        self.intro = intro;
    }

    pub fn long_intro(&self) -> &Response {
        &self.long_intro
    }

    pub fn set_long_intro(&mut self, long_intro: Response) {
        self.long_intro = long_intro;
    }

    pub fn default_answer(&self) -> &Response {
        &self.default_answer
    }

    pub fn set_default_answer(&mut self, default_answer: Response) {
        self.default_answer = default_answer;
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn set_question(&mut self, question: Option<Question>) {
        self.question = question;
    }

    pub fn turn_away_prob(&self) -> u32 {
        self.turn_away_prob
    }

    pub fn set_turn_away_prob(&mut self, prob: u32) {
        self.turn_away_prob = prob;
    }

    /// Replaces any entry with the same normalized key; the replaced entry's
    /// response reference is dropped before the new one is stored.
    pub fn add_keyword(&mut self, keyword: &str, response: Response) {
        let entry = Keyword::new(keyword, response);
        let key = entry.keyword().to_string();
        if let Some(previous) = self.keywords.shift_remove(&key) {
            drop(previous);
        }
        self.keywords.insert(key, entry);
    }

    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        self.keywords
            .shift_remove(&normalize_keyword(keyword))
            .is_some()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.values()
    }

    /// Exact normalized match first, then the first registered keyword whose
    /// prefix test accepts the raw input. The empty keyword answers only empty input.
    pub fn keyword(&self, input: &str) -> Option<&Keyword> {
        let key = normalize_keyword(input);
        if input.is_empty() == key.is_empty() {
            if let Some(exact) = self.keywords.get(&key) {
                return Some(exact);
            }
        }
        let found = self
            .keywords
            .values()
            .find(|keyword| keyword.matches(input));
        if found.is_none() {
            debug!("{}: no keyword for \"{}\"", self.name, input);
        }
        found
    }

    /// `None` (stays), `End` (turns away) or `Attack`.
    pub fn get_action(&self, rng: &mut dyn RandomSource) -> Command {
        let draw = rng.next_bounded(ACTION_DRAW_RANGE);
        if draw >= self.turn_away_prob {
            return Command::None;
        }
        if self.turn_away_prob - draw < ATTACK_MARGIN {
            Command::End
        } else {
            Command::Attack
        }
    }
}
