mod json_loader;
mod xml_loader;

use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use pl_core::ParleyError;
use pl_dialogue::{Conversation, Dialogue, DialogueLoaders};
use pl_parser::parse_xml_library;
use pl_runtime::{Script, ScriptOptions};

pub use json_loader::{load_json_dialogue, JSON_SOURCE_TYPE};
pub use xml_loader::{load_xml_dialogue, KEYWORD_ALIAS_SEPARATOR, XML_SOURCE_TYPE};

#[derive(Debug, Clone, Default)]
pub struct CreateScriptFromXmlOptions {
    pub scripts_xml: BTreeMap<String, String>,
    pub script_id: String,
    /// `(element name, id)` narrowing the base context, e.g. a vendor record.
    pub sub_node: Option<(String, String)>,
    pub start_label: Option<String>,
    pub random_seed: Option<u32>,
    pub step_limit: Option<usize>,
}

/// Registry with the JSON and XML dialogue loaders.
pub fn default_loaders() -> DialogueLoaders {
    let mut loaders = DialogueLoaders::new();
    loaders.register(JSON_SOURCE_TYPE, Box::new(load_json_dialogue));
    loaders.register(XML_SOURCE_TYPE, Box::new(load_xml_dialogue));
    loaders
}

pub fn source_type_for_path(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .as_deref()
    {
        Some("json") => Some(JSON_SOURCE_TYPE),
        Some("xml") => Some(XML_SOURCE_TYPE),
        _ => None,
    }
}

/// Like [`DialogueLoaders::load`], but an unregistered source type is an error.
pub fn load_dialogue(
    loaders: &DialogueLoaders,
    source_type: &str,
    source: &str,
) -> Result<Dialogue, ParleyError> {
    loaders.load(source_type, source)?.ok_or_else(|| {
        ParleyError::new(
            "LOADER_SOURCE_TYPE_UNKNOWN",
            format!(
                "No dialogue loader for \"{}\" (known: {}).",
                source_type,
                loaders.source_types().collect::<Vec<_>>().join(", ")
            ),
        )
    })
}

pub fn create_script_from_xml(options: CreateScriptFromXmlOptions) -> Result<Script, ParleyError> {
    let tree = parse_xml_library(&options.scripts_xml)?;
    let mut script = Script::with_options(ScriptOptions {
        random_seed: options.random_seed,
        step_limit: options.step_limit,
    });
    let sub_node = options
        .sub_node
        .as_ref()
        .map(|(name, id)| (name.as_str(), id.as_str()));
    script.load(Rc::new(tree), &options.script_id, sub_node)?;
    if let Some(label) = &options.start_label {
        script.start(label)?;
    }
    Ok(script)
}

pub fn create_conversation_from_xml(
    options: CreateScriptFromXmlOptions,
) -> Result<Conversation, ParleyError> {
    Ok(Conversation::with_script(create_script_from_xml(options)?))
}
