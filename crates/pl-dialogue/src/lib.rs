mod conversation;
mod dialogue;
mod keyword;
mod loader;
mod response;

pub use conversation::{
    Conversation, ConversationState, InputRequired, ANSWER_LEN, BUFFER_LEN, QUANTITY_LEN,
};
pub use dialogue::{Dialogue, Question, ACTION_DRAW_RANGE, ATTACK_MARGIN};
pub use keyword::{normalize_keyword, Keyword, KEYWORD_MATCH_LEN};
pub use loader::{DialogueLoader, DialogueLoaders};
pub use response::{
    Command, DynamicResponse, Response, ResponseGenerator, ResponsePart, WeakResponse,
};
