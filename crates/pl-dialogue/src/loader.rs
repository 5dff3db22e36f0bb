use std::collections::BTreeMap;

use pl_core::ParleyError;

use crate::Dialogue;

pub trait DialogueLoader {
    fn load(&self, source: &str) -> Result<Dialogue, ParleyError>;
}

impl<F> DialogueLoader for F
where
    F: Fn(&str) -> Result<Dialogue, ParleyError>,
{
    fn load(&self, source: &str) -> Result<Dialogue, ParleyError> {
        self(source)
    }
}

/// Loaders keyed by a MIME-like source type such as `application/json`.
#[derive(Default)]
pub struct DialogueLoaders {
    loaders: BTreeMap<String, Box<dyn DialogueLoader>>,
}

impl DialogueLoaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source_type: &str, loader: Box<dyn DialogueLoader>) {
        self.loaders.insert(normalize_source_type(source_type), loader);
    }

    pub fn get(&self, source_type: &str) -> Option<&dyn DialogueLoader> {
        self.loaders
            .get(&normalize_source_type(source_type))
            .map(|loader| loader.as_ref())
    }

    pub fn source_types(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// `Ok(None)` when nothing is registered for `source_type`.
    pub fn load(&self, source_type: &str, source: &str) -> Result<Option<Dialogue>, ParleyError> {
        match self.get(source_type) {
            Some(loader) => loader.load(source).map(Some),
            None => Ok(None),
        }
    }
}

fn normalize_source_type(source_type: &str) -> String {
    source_type.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_text(source: &str) -> Result<Dialogue, ParleyError> {
        let name = source.lines().next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ParleyError::new(
                "LOADER_SOURCE_INVALID",
                "missing name line",
            ));
        }
        Ok(Dialogue::new(name))
    }

    #[test]
    fn loaders_are_selected_by_source_type() {
        let mut loaders = DialogueLoaders::new();
        loaders.register("Text/Plain", Box::new(plain_text));

        let dialogue = loaders
            .load("text/plain", "Dupre\n")
            .expect("load should pass")
            .expect("loader should be registered");
        assert_eq!(dialogue.name(), "Dupre");
        assert_eq!(
            loaders.source_types().collect::<Vec<_>>(),
            vec!["text/plain"]
        );
    }

    #[test]
    fn missing_loader_is_not_found_rather_than_an_error() {
        let loaders = DialogueLoaders::new();
        assert!(loaders.get("application/json").is_none());
        assert!(loaders
            .load("application/json", "{}")
            .expect("missing loader is not an error")
            .is_none());
    }

    #[test]
    fn loader_errors_propagate() {
        let mut loaders = DialogueLoaders::new();
        loaders.register("text/plain", Box::new(plain_text));
        let error = loaders
            .load("text/plain", "")
            .expect_err("empty source should fail");
        assert_eq!(error.code, "LOADER_SOURCE_INVALID");
    }
}
