use pl_core::{ParleyError, ScriptValue};

use crate::expr::{self, ExprValue, Operands};
use crate::Script;

impl Script {
    /// Expands every `{...}` block in `text`, innermost first.
    pub fn translate(&mut self, text: &str) -> Result<String, ParleyError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let close = matching_brace(rest, open).ok_or_else(|| {
                ParleyError::new(
                    "SCRIPT_TRANSLATE",
                    format!("Unbalanced \"{{\" in \"{}\".", text),
                )
            })?;
            let inner = self.translate(&rest[open + 1..close])?;
            let resolved = self.resolve_block(inner.trim())?;
            out.push_str(&resolved);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    pub fn evaluate(&self, expr: &str) -> Result<ExprValue, ParleyError> {
        expr::evaluate(expr, self)
    }

    fn resolve_block(&mut self, block: &str) -> Result<String, ParleyError> {
        if let Some(name) = block.strip_prefix('$') {
            return Ok(self.var(name.trim()).to_text());
        }
        if let Some((function, argument)) = split_function(block) {
            return match function {
                "math" => Ok(self.evaluate(argument)?.to_string()),
                "compare" => Ok(self.evaluate(argument)?.truthy().to_string()),
                "random" => {
                    let bound = match self.evaluate(argument)? {
                        ExprValue::Int(bound) => u32::try_from(bound).ok(),
                        _ => None,
                    }
                    .filter(|bound| *bound > 0)
                    .ok_or_else(|| {
                        ParleyError::new(
                            "SCRIPT_TRANSLATE",
                            format!("\"{{random:{}}}\" needs a positive integer.", argument),
                        )
                    })?;
                    Ok(self.rng.next_bounded(bound).to_string())
                }
                other => Err(ParleyError::new(
                    "SCRIPT_TRANSLATE",
                    format!("Unknown translation function \"{}\".", other),
                )),
            };
        }
        if block.contains('.') {
            let parts = block.split('.').map(str::to_string).collect::<Vec<_>>();
            return self.resolve_reference(&parts);
        }
        self.resolve_noun(block)
    }

    /// Routes `qualifier.rest` to the provider registered for `qualifier`.
    pub(crate) fn resolve_reference(&self, parts: &[String]) -> Result<String, ParleyError> {
        let qualifier = parts.first().map(String::as_str).unwrap_or_default();
        let provider = self.providers.get(qualifier).ok_or_else(|| {
            ParleyError::new(
                "SCRIPT_PROVIDER_MISSING",
                format!(
                    "No provider registered for \"{}\" (in \"{}\").",
                    qualifier,
                    parts.join(".")
                ),
            )
        })?;
        provider.translate(parts)
    }
}

impl Operands for Script {
    fn variable(&self, name: &str) -> ScriptValue {
        self.var(name)
    }

    fn reference(&self, parts: &[String]) -> Result<String, ParleyError> {
        self.resolve_reference(parts)
    }
}

fn split_function(block: &str) -> Option<(&str, &str)> {
    let (head, tail) = block.split_once(':')?;
    let head = head.trim();
    if !head.is_empty() && head.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((head, tail))
    } else {
        None
    }
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + index);
                }
            }
            _ => {}
        }
    }
    None
}
