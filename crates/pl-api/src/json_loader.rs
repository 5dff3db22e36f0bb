use pl_core::ParleyError;
use pl_dialogue::{Dialogue, Question, Response, ResponsePart};
use serde::Deserialize;

pub const JSON_SOURCE_TYPE: &str = "application/json";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseDoc {
    Text(String),
    Parts(Vec<ResponsePart>),
}

impl ResponseDoc {
    fn into_response(self) -> Response {
        match self {
            Self::Text(text) => Response::new(text),
            Self::Parts(parts) => Response::from_parts(parts),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct QuestionDoc {
    text: String,
    yes: ResponseDoc,
    no: ResponseDoc,
}

/// Every keyword listed shares one response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct KeywordDoc {
    keywords: Vec<String>,
    response: ResponseDoc,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DialogueDoc {
    name: String,
    #[serde(default)]
    pronoun: String,
    #[serde(default)]
    prompt: String,
    intro: Option<ResponseDoc>,
    long_intro: Option<ResponseDoc>,
    default_answer: Option<ResponseDoc>,
    #[serde(default)]
    turn_away_prob: u32,
    question: Option<QuestionDoc>,
    #[serde(default)]
    keywords: Vec<KeywordDoc>,
}

pub fn load_json_dialogue(source: &str) -> Result<Dialogue, ParleyError> {
    let doc: DialogueDoc = serde_json::from_str(source).map_err(|error| {
        ParleyError::new(
            "LOADER_JSON_INVALID",
            format!("Dialogue JSON is invalid: {}", error),
        )
    })?;

    let mut dialogue = Dialogue::new(doc.name);
    dialogue.set_pronoun(doc.pronoun);
    dialogue.set_prompt(doc.prompt);
    dialogue.set_turn_away_prob(doc.turn_away_prob);
    if let Some(intro) = doc.intro {
        dialogue.set_intro(intro.into_response());
    }
    if let Some(long_intro) = doc.long_intro {
        dialogue.set_long_intro(long_intro.into_response());
    }
    if let Some(default_answer) = doc.default_answer {
        dialogue.set_default_answer(default_answer.into_response());
    }
    dialogue.set_question(doc.question.map(|question| {
        Question::new(
            question.text,
            question.yes.into_response(),
            question.no.into_response(),
        )
    }));
    for entry in doc.keywords {
        let response = entry.response.into_response();
        for keyword in &entry.keywords {
            dialogue.add_keyword(keyword, response.clone());
        }
    }
    Ok(dialogue)
}
