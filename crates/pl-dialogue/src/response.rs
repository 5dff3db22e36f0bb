use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use log::warn;
use pl_core::ParleyError;
use serde::{Deserialize, Serialize};

/// Host-side triggers that can be interleaved with text in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "ASK")]
    Ask,
    #[serde(rename = "END")]
    End,
    #[serde(rename = "ATTACK")]
    Attack,
    #[serde(rename = "BRAGGED")]
    Bragged,
    #[serde(rename = "HUMBLE")]
    Humble,
    #[serde(rename = "ADVANCELEVELS")]
    AdvanceLevels,
    #[serde(rename = "HEALCONFIRM")]
    HealConfirm,
    #[serde(rename = "STARTMUSIC_LB")]
    StartMusicLb,
    #[serde(rename = "STARTMUSIC_HW")]
    StartMusicHw,
    #[serde(rename = "STOPMUSIC")]
    StopMusic,
    #[serde(rename = "HAWKWIND")]
    Hawkwind,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::None,
        Command::Ask,
        Command::End,
        Command::Attack,
        Command::Bragged,
        Command::Humble,
        Command::AdvanceLevels,
        Command::HealConfirm,
        Command::StartMusicLb,
        Command::StartMusicHw,
        Command::StopMusic,
        Command::Hawkwind,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Ask => "ASK",
            Self::End => "END",
            Self::Attack => "ATTACK",
            Self::Bragged => "BRAGGED",
            Self::Humble => "HUMBLE",
            Self::AdvanceLevels => "ADVANCELEVELS",
            Self::HealConfirm => "HEALCONFIRM",
            Self::StartMusicLb => "STARTMUSIC_LB",
            Self::StartMusicHw => "STARTMUSIC_HW",
            Self::StopMusic => "STOPMUSIC",
            Self::Hawkwind => "HAWKWIND",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ParleyError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|command| command.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ParleyError::new(
                    "DIALOGUE_COMMAND_UNKNOWN",
                    format!("Unknown response command \"{}\".", wanted),
                )
            })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PartRepr", into = "PartRepr")]
pub enum ResponsePart {
    Text(String),
    Command(Command),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PartRepr {
    Text(String),
    Command { command: Command },
}

impl From<PartRepr> for ResponsePart {
    fn from(value: PartRepr) -> Self {
        match value {
            PartRepr::Text(text) => Self::Text(text),
            PartRepr::Command { command } => Self::Command(command),
        }
    }
}

impl From<ResponsePart> for PartRepr {
    fn from(value: ResponsePart) -> Self {
        match value {
            ResponsePart::Text(text) => Self::Text(text),
            ResponsePart::Command(command) => Self::Command { command },
        }
    }
}

impl ResponsePart {
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Displayable text; command tokens contribute nothing.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Command(_) => "",
        }
    }
}

impl From<&str> for ResponsePart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ResponsePart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Command> for ResponsePart {
    fn from(value: Command) -> Self {
        Self::Command(value)
    }
}

pub type ResponseGenerator = Rc<dyn Fn(&DynamicResponse) -> Response>;

/// Regenerates its parts from live state on every access.
pub struct DynamicResponse {
    param: String,
    generator: ResponseGenerator,
    current: RefCell<Option<Response>>,
}

impl DynamicResponse {
    pub fn param(&self) -> &str {
        &self.param
    }

    /// The instance produced by the most recent access, if any.
    pub fn current(&self) -> Option<Response> {
        self.current.borrow().clone()
    }

    fn regenerate(&self) -> Vec<ResponsePart> {
        // Drop the previous instance before asking for a new one.
        let previous = self.current.borrow_mut().take();
        drop(previous);

        let fresh = (self.generator)(self);
        let parts = fresh.parts();
        *self.current.borrow_mut() = Some(fresh);
        parts
    }
}

enum ResponseBody {
    Fixed(Vec<ResponsePart>),
    Dynamic(DynamicResponse),
}

/// Shared, reference-counted reply. Cloning adds a holder.
#[derive(Clone)]
pub struct Response {
    body: Rc<RefCell<ResponseBody>>,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self::from_parts(vec![ResponsePart::Text(text.into())])
    }

    pub fn empty() -> Self {
        Self::from_parts(Vec::new())
    }

    pub fn from_parts(parts: Vec<ResponsePart>) -> Self {
        Self {
            body: Rc::new(RefCell::new(ResponseBody::Fixed(parts))),
        }
    }

    pub fn dynamic<F>(param: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&DynamicResponse) -> Response + 'static,
    {
        Self {
            body: Rc::new(RefCell::new(ResponseBody::Dynamic(DynamicResponse {
                param: param.into(),
                generator: Rc::new(generator),
                current: RefCell::new(None),
            }))),
        }
    }

    pub fn add(&self, part: impl Into<ResponsePart>) -> &Self {
        match &mut *self.body.borrow_mut() {
            ResponseBody::Fixed(parts) => parts.push(part.into()),
            ResponseBody::Dynamic(dynamic) => {
                warn!(
                    "ignoring part appended to dynamic response \"{}\"",
                    dynamic.param
                );
            }
        }
        self
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(&*self.body.borrow(), ResponseBody::Dynamic(_))
    }

    pub fn parts(&self) -> Vec<ResponsePart> {
        match &*self.body.borrow() {
            ResponseBody::Fixed(parts) => parts.clone(),
            ResponseBody::Dynamic(dynamic) => dynamic.regenerate(),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.parts()
            .into_iter()
            .filter_map(|part| match part {
                ResponsePart::Command(command) => Some(command),
                ResponsePart::Text(_) => None,
            })
            .collect()
    }

    /// Concatenated text of all parts, in order.
    pub fn text(&self) -> String {
        self.parts().iter().map(ResponsePart::text).collect()
    }

    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.body)
    }

    pub fn ptr_eq(&self, other: &Response) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }

    pub fn downgrade(&self) -> WeakResponse {
        WeakResponse {
            body: Rc::downgrade(&self.body),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.body.borrow() {
            ResponseBody::Fixed(parts) => f.debug_tuple("Response").field(parts).finish(),
            ResponseBody::Dynamic(dynamic) => f
                .debug_struct("DynamicResponse")
                .field("param", &dynamic.param)
                .finish(),
        }
    }
}

impl From<&str> for Response {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Non-owning handle used to observe when the last holder lets go.
#[derive(Clone)]
pub struct WeakResponse {
    body: Weak<RefCell<ResponseBody>>,
}

impl WeakResponse {
    pub fn upgrade(&self) -> Option<Response> {
        self.body.upgrade().map(|body| Response { body })
    }

    pub fn is_released(&self) -> bool {
        self.body.strong_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn parts_flatten_in_order() {
        let response = Response::new("A");
        response.add("B").add("C");
        assert_eq!(response.text(), "ABC");
        assert_eq!(response.to_string(), "ABC");
    }

    #[test]
    fn commands_interleave_with_text_in_encounter_order() {
        let response = Response::new("I must go.");
        response
            .add(Command::StopMusic)
            .add(" Farewell.")
            .add(Command::End);

        assert_eq!(
            response.parts(),
            vec![
                ResponsePart::from("I must go."),
                ResponsePart::Command(Command::StopMusic),
                ResponsePart::from(" Farewell."),
                ResponsePart::Command(Command::End),
            ]
        );
        assert_eq!(response.commands(), vec![Command::StopMusic, Command::End]);
        assert_eq!(response.text(), "I must go. Farewell.");
    }

    #[test]
    fn commands_compare_by_value() {
        let first = ResponsePart::Command(Command::Ask);
        let second = ResponsePart::from(Command::from_name("ask").expect("ask is known"));
        assert_eq!(first, second);
        assert_eq!(
            Command::from_name("bogus")
                .expect_err("unknown name should fail")
                .code,
            "DIALOGUE_COMMAND_UNKNOWN"
        );
    }

    #[test]
    fn dynamic_response_regenerates_on_every_access() {
        let seen = Rc::new(Cell::new(false));
        let calls = Rc::new(Cell::new(0usize));
        let response = {
            let seen = Rc::clone(&seen);
            let calls = Rc::clone(&calls);
            Response::dynamic("intro", move |dynamic| {
                calls.set(calls.get() + 1);
                if seen.get() {
                    Response::new(format!("Welcome back ({}).", dynamic.param()))
                } else {
                    Response::new("Greetings, stranger.")
                }
            })
        };

        assert_eq!(response.text(), "Greetings, stranger.");
        assert_eq!(calls.get(), 1);
        seen.set(true);
        assert_eq!(response.text(), "Welcome back (intro).");
        assert_eq!(calls.get(), 2);
        response.parts();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn dynamic_response_releases_previous_instance() {
        let response = Response::dynamic("x", |_| Response::new("fresh"));
        response.parts();
        let first = match &*response.body.borrow() {
            ResponseBody::Dynamic(dynamic) => dynamic.current().expect("generated"),
            ResponseBody::Fixed(_) => unreachable!("response is dynamic"),
        };
        let first_weak = first.downgrade();
        drop(first);
        assert!(!first_weak.is_released());

        response.parts();
        assert!(first_weak.is_released());
    }

    #[test]
    fn add_on_dynamic_response_is_ignored() {
        let response = Response::dynamic("x", |_| Response::new("only"));
        response.add("extra");
        assert!(response.is_dynamic());
        assert_eq!(response.text(), "only");
    }

    #[test]
    fn shared_response_lives_until_last_holder_drops() {
        let shared = Response::new("Fare thee well.");
        let weak = shared.downgrade();
        let alias = shared.clone();
        assert_eq!(shared.holders(), 2);
        assert!(alias.ptr_eq(&shared));

        drop(shared);
        assert!(!weak.is_released());
        drop(alias);
        assert!(weak.is_released());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn parts_serialize_as_text_or_command_objects() {
        let parts = vec![
            ResponsePart::from("Hail"),
            ResponsePart::Command(Command::StartMusicLb),
        ];
        let json = serde_json::to_string(&parts).expect("parts should serialize");
        assert_eq!(json, r#"["Hail",{"command":"STARTMUSIC_LB"}]"#);
        let back: Vec<ResponsePart> = serde_json::from_str(&json).expect("parts should parse");
        assert_eq!(back, parts);
    }
}
