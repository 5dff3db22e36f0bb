use pl_core::ParleyError;

/// Resolves `qualifier.rest` references against external game state.
/// `parts` is the whole reference split on `.`, qualifier included.
pub trait Provider {
    fn translate(&self, parts: &[String]) -> Result<String, ParleyError>;
}

impl<F> Provider for F
where
    F: Fn(&[String]) -> Result<String, ParleyError>,
{
    fn translate(&self, parts: &[String]) -> Result<String, ParleyError> {
        self(parts)
    }
}
