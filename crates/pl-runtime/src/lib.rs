mod actions;
mod boundary;
mod context;
mod expr;
mod host;
mod provider;
mod script;
mod step;
mod translate;
mod vars;

pub use boundary::PARTY_SIZE;
pub use expr::ExprValue;
pub use host::{EffectOutcome, HostEffect, NullHost, ScriptHost};
pub use provider::Provider;
pub use script::{
    Script, ScriptOptions, ScriptOutput, ScriptState, DEFAULT_RANDOM_SEED, DEFAULT_STEP_LIMIT,
};
