use pl_core::{NodeId, NodeKind, ParleyError, ScriptTree};
use pl_dialogue::{Command, Dialogue, Question, Response, ResponsePart};
use pl_parser::{parse_xml_tree, XmlTree};

pub const XML_SOURCE_TYPE: &str = "application/xml";

/// Separates aliases in `<keyword name="bye|">`.
pub const KEYWORD_ALIAS_SEPARATOR: char = '|';

/// ```xml
/// <dialogue name="Iolo" pronoun="He" prompt="Your interest?" turnaway="0">
///   <intro>A bard with a crossbow.</intro>
///   <keyword name="job">I make bows.<ask/></keyword>
///   <keyword name="bye|"><end/>Farewell.</keyword>
/// </dialogue>
/// ```
pub fn load_xml_dialogue(source: &str) -> Result<Dialogue, ParleyError> {
    let tree = parse_xml_tree("dialogue.xml", source)?;
    let root = tree.root();
    if tree.label(root) != "dialogue" {
        return Err(invalid(
            &tree,
            root,
            format!("root element must be <dialogue>, not <{}>", tree.label(root)),
        ));
    }

    let name = tree
        .attribute(root, "name")
        .ok_or_else(|| invalid(&tree, root, "missing name attribute".to_string()))?;
    let mut dialogue = Dialogue::new(name);
    dialogue.set_pronoun(tree.attribute(root, "pronoun").unwrap_or_default());
    dialogue.set_prompt(tree.attribute(root, "prompt").unwrap_or_default());
    if let Some(raw) = tree.attribute(root, "turnaway") {
        let prob = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(&tree, root, format!("turnaway \"{}\" is not a number", raw)))?;
        dialogue.set_turn_away_prob(prob);
    }

    for child in tree.child_elements(root) {
        match tree.label(child) {
            "intro" => dialogue.set_intro(response_from(&tree, child)?),
            "longintro" => dialogue.set_long_intro(response_from(&tree, child)?),
            "default" => dialogue.set_default_answer(response_from(&tree, child)?),
            "question" => dialogue.set_question(Some(question_from(&tree, child)?)),
            "keyword" => {
                let names = tree
                    .attribute(child, "name")
                    .ok_or_else(|| invalid(&tree, child, "missing name attribute".to_string()))?;
                let response = response_from(&tree, child)?;
                for keyword in names.split(KEYWORD_ALIAS_SEPARATOR) {
                    dialogue.add_keyword(keyword, response.clone());
                }
            }
            other => {
                log::warn!("dialogue {}: ignoring <{}>", dialogue.name(), other);
            }
        }
    }
    Ok(dialogue)
}

fn question_from(tree: &XmlTree, node: NodeId) -> Result<Question, ParleyError> {
    let text = tree
        .attribute(node, "text")
        .ok_or_else(|| invalid(tree, node, "missing text attribute".to_string()))?;
    let branch = |label: &str| -> Result<Response, ParleyError> {
        match tree.find_child(node, label) {
            Some(found) => response_from(tree, found),
            None => Err(invalid(tree, node, format!("missing <{}> branch", label))),
        }
    };
    Ok(Question::new(text, branch("yes")?, branch("no")?))
}

/// Text children become text parts (each line trimmed); empty elements name commands.
fn response_from(tree: &XmlTree, node: NodeId) -> Result<Response, ParleyError> {
    let mut parts = Vec::new();
    for child in tree.children(node) {
        match tree.kind(child) {
            NodeKind::Text => {
                let text = tree
                    .text(child)
                    .unwrap_or_default()
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.is_empty() {
                    parts.push(ResponsePart::Text(text));
                }
            }
            NodeKind::Element => {
                let command = Command::from_name(tree.label(child))
                    .map_err(|error| invalid(tree, child, error.message))?;
                parts.push(ResponsePart::Command(command));
            }
        }
    }
    Ok(Response::from_parts(parts))
}

fn invalid(tree: &XmlTree, node: NodeId, detail: String) -> ParleyError {
    ParleyError::new(
        "LOADER_XML_INVALID",
        format!("{}: {}", tree.describe(node), detail),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUARD: &str = r#"<dialogue name="Guard" pronoun="He" prompt="What?" turnaway="200">
      <intro>A stern guard.</intro>
      <longintro>
        A stern guard
        in plate armour.
      </longintro>
      <default>Move along.</default>
      <question text="Art thou a thief?">
        <yes>Then die!<attack/></yes>
        <no>Good.</no>
      </question>
      <keyword name="job">I guard the gate.<ask/>Why?</keyword>
      <keyword name="bye|"><end/>Farewell.</keyword>
      <portrait file="guard.png"/>
    </dialogue>"#;

    #[test]
    fn xml_document_builds_dialogue() {
        let dialogue = load_xml_dialogue(GUARD).expect("dialogue should load");
        assert_eq!(dialogue.name(), "Guard");
        assert_eq!(dialogue.prompt(), "What?");
        assert_eq!(dialogue.turn_away_prob(), 200);
        assert_eq!(
            dialogue.long_intro().text(),
            "A stern guard\nin plate armour."
        );

        let job = dialogue.keyword("job").expect("job");
        assert_eq!(
            job.response().parts(),
            vec![
                ResponsePart::Text("I guard the gate.".to_string()),
                ResponsePart::Command(Command::Ask),
                ResponsePart::Text("Why?".to_string()),
            ]
        );

        let question = dialogue.question().expect("question");
        assert_eq!(question.text, "Art thou a thief?");
        assert_eq!(question.yes.commands(), vec![Command::Attack]);
    }

    #[test]
    fn keyword_aliases_share_one_response() {
        let dialogue = load_xml_dialogue(GUARD).expect("dialogue should load");
        let bye = dialogue.keyword("bye").expect("bye");
        let empty = dialogue.keyword("").expect("empty");
        assert!(bye.response().ptr_eq(empty.response()));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let cases = [
            (r#"<talker name="x"/>"#, "LOADER_XML_INVALID"),
            (r#"<dialogue/>"#, "LOADER_XML_INVALID"),
            (
                r#"<dialogue name="x" turnaway="often"/>"#,
                "LOADER_XML_INVALID",
            ),
            (
                r#"<dialogue name="x"><keyword name="job"><dance/></keyword></dialogue>"#,
                "LOADER_XML_INVALID",
            ),
            (
                r#"<dialogue name="x"><question text="?"><yes>y</yes></question></dialogue>"#,
                "LOADER_XML_INVALID",
            ),
            ("<dialogue", "XML_PARSE_ERROR"),
        ];
        for (source, code) in cases {
            let error = load_xml_dialogue(source).expect_err("document should fail");
            assert_eq!(error.code, code, "source {}", source);
        }
    }
}
