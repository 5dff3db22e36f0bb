use pl_core::{NodeId, ParleyError};

use crate::script::not_loaded;
use crate::Script;

impl Script {
    /// Narrows name resolution to the first `<name>` below the current context
    /// (matching `id` when given).
    pub fn push_context(&mut self, name: &str, id: Option<&str>) -> Result<NodeId, ParleyError> {
        let tree = self.tree()?;
        let current = self.current_context().ok_or_else(not_loaded)?;
        let found = tree
            .find_descendant(current, name, id.map(|id| ("id", id)))
            .ok_or_else(|| {
                ParleyError::new(
                    "SCRIPT_CONTEXT_NOT_FOUND",
                    format!(
                        "No <{}{}> below {}.",
                        name,
                        id.map(|id| format!(" id=\"{}\"", id)).unwrap_or_default(),
                        tree.describe(current)
                    ),
                )
            })?;
        self.context.push(found);
        Ok(found)
    }

    /// The base context set by `load` cannot be popped.
    pub fn pop_context(&mut self) -> Result<NodeId, ParleyError> {
        if self.context.len() <= 1 {
            return Err(ParleyError::new(
                "SCRIPT_CONTEXT_UNDERFLOW",
                "Context stack is already at its base.",
            ));
        }
        self.context.pop().ok_or_else(not_loaded)
    }

    pub fn current_context(&self) -> Option<NodeId> {
        self.context.last().copied()
    }

    pub fn context_depth(&self) -> usize {
        self.context.len()
    }

    /// Innermost to outermost: an attribute of the context node, then the text of
    /// a child element with that label.
    pub(crate) fn resolve_noun(&self, noun: &str) -> Result<String, ParleyError> {
        let tree = self.tree()?;
        for scope in self.context.iter().rev() {
            if let Some(value) = tree.attribute(*scope, noun) {
                return Ok(value.to_string());
            }
            if let Some(child) = tree.find_child(*scope, noun) {
                return Ok(tree.content(child).trim().to_string());
            }
        }
        Err(ParleyError::new(
            "SCRIPT_NOUN_NOT_FOUND",
            format!("\"{}\" is not defined in the current context.", noun),
        ))
    }
}
