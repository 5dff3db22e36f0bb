use pl_core::{ParleyError, ScriptValue};

use crate::Script;

impl Script {
    pub fn set_var(&mut self, name: &str, value: impl Into<ScriptValue>) {
        self.variables.insert(name.to_string(), value.into());
    }

    pub fn unset_var(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Missing names read as [`ScriptValue::Unset`].
    pub fn var(&self, name: &str) -> ScriptValue {
        self.variables.get(name).cloned().unwrap_or_default()
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ParleyError> {
        match self.var(name) {
            ScriptValue::Int(value) => Ok(value),
            other => Err(var_type_error(name, "integer", &other)),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<String, ParleyError> {
        match self.var(name) {
            ScriptValue::Str(value) => Ok(value),
            other => Err(var_type_error(name, "string", &other)),
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

fn var_type_error(name: &str, wanted: &str, found: &ScriptValue) -> ParleyError {
    ParleyError::new(
        "SCRIPT_VAR_TYPE",
        format!(
            "Variable \"{}\" is {}, expected {}.",
            name,
            found.type_name(),
            wanted
        ),
    )
}
