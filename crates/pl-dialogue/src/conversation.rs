use std::collections::VecDeque;
use std::fmt;

use log::debug;
use pl_core::ParleyError;
use pl_runtime::Script;

/// Longest free-text answer (talk topics, prices).
pub const BUFFER_LEN: usize = 16;
/// Quantities and beggar gifts.
pub const QUANTITY_LEN: usize = 2;
/// Yes/no style answers.
pub const ANSWER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationState {
    Intro,
    Talk,
    Ask,
    AskYesNo,
    VendorQuestion,
    BuyItem,
    SellItem,
    BuyQuantity,
    SellQuantity,
    BuyPrice,
    Confirmation,
    ContinueQuestion,
    Topic,
    Player,
    FullHeal,
    AdvanceLevels,
    GiveBeggar,
    Attack,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRequired {
    Nothing,
    Character,
    Text { max_len: usize },
}

impl ConversationState {
    pub const ALL: [ConversationState; 19] = [
        Self::Intro,
        Self::Talk,
        Self::Ask,
        Self::AskYesNo,
        Self::VendorQuestion,
        Self::BuyItem,
        Self::SellItem,
        Self::BuyQuantity,
        Self::SellQuantity,
        Self::BuyPrice,
        Self::Confirmation,
        Self::ContinueQuestion,
        Self::Topic,
        Self::Player,
        Self::FullHeal,
        Self::AdvanceLevels,
        Self::GiveBeggar,
        Self::Attack,
        Self::Done,
    ];

    pub fn code(self) -> i32 {
        Self::ALL
            .iter()
            .position(|state| *state == self)
            .map(|index| index as i32)
            .unwrap_or_default()
    }

    pub fn input_required(self) -> InputRequired {
        match self {
            Self::Intro | Self::Attack | Self::Done | Self::FullHeal | Self::AdvanceLevels => {
                InputRequired::Nothing
            }
            Self::VendorQuestion
            | Self::BuyItem
            | Self::SellItem
            | Self::Confirmation
            | Self::ContinueQuestion
            | Self::Player => InputRequired::Character,
            Self::BuyQuantity | Self::SellQuantity | Self::GiveBeggar => InputRequired::Text {
                max_len: QUANTITY_LEN,
            },
            Self::Talk | Self::BuyPrice | Self::Topic => InputRequired::Text {
                max_len: BUFFER_LEN,
            },
            Self::Ask | Self::AskYesNo => InputRequired::Text {
                max_len: ANSWER_LEN,
            },
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Attack)
    }
}

impl TryFrom<i32> for ConversationState {
    type Error = ParleyError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| {
                ParleyError::new(
                    "CONVERSATION_STATE_INVALID",
                    format!("Conversation state code {} is not declared.", code),
                )
            })
    }
}

/// Per-interaction state. Transitions are chosen by the host dispatcher.
pub struct Conversation {
    state: ConversationState,
    player_input: String,
    reply: VecDeque<String>,
    script: Option<Script>,
    pub quant: i64,
    pub player: i64,
    pub price: i64,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            state: ConversationState::Intro,
            player_input: String::new(),
            reply: VecDeque::new(),
            script: None,
            quant: 0,
            player: 0,
            price: 0,
        }
    }

    pub fn with_script(script: Script) -> Self {
        let mut conversation = Self::new();
        conversation.script = Some(script);
        conversation
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn set_state(&mut self, state: ConversationState) {
        if state != self.state {
            debug!("conversation {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        if state.is_terminal() {
            self.release();
        }
    }

    pub fn input_required(&self) -> InputRequired {
        self.state.input_required()
    }

    pub fn player_input(&self) -> &str {
        &self.player_input
    }

    /// Stores player input clipped to the current state's limit.
    pub fn set_player_input(&mut self, input: &str) {
        self.player_input = match self.input_required() {
            InputRequired::Nothing => String::new(),
            InputRequired::Character => input.chars().take(1).collect(),
            InputRequired::Text { max_len } => input.chars().take(max_len).collect(),
        };
    }

    pub fn push_reply(&mut self, text: &str) {
        self.reply.extend(text.split('\n').map(str::to_string));
    }

    pub fn pop_reply(&mut self) -> Option<String> {
        self.reply.pop_front()
    }

    pub fn drain_reply(&mut self) -> Vec<String> {
        self.reply.drain(..).collect()
    }

    pub fn has_reply(&self) -> bool {
        !self.reply.is_empty()
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn script_mut(&mut self) -> Option<&mut Script> {
        self.script.as_mut()
    }

    pub fn attach_script(&mut self, script: Script) {
        self.script = Some(script);
    }

    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn finish(&mut self) {
        self.set_state(ConversationState::Done);
    }

    fn release(&mut self) {
        self.reply.clear();
        self.player_input.clear();
        if let Some(mut script) = self.script.take() {
            script.unload();
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("state", &self.state)
            .field("player_input", &self.player_input)
            .field("reply", &self.reply)
            .field("script", &self.script.as_ref().map(Script::state))
            .field("quant", &self.quant)
            .field("player", &self.player)
            .field("price", &self.price)
            .finish()
    }
}
