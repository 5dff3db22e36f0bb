use pl_core::ParleyError;
use serde::{Deserialize, Serialize};

/// Side effects a script asks the game to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostEffect {
    Move {
        x: Option<i64>,
        y: Option<i64>,
        z: Option<i64>,
    },
    Sleep,
    Cursor {
        visible: bool,
    },
    Pay {
        price: i64,
        quantity: i64,
    },
    Add {
        item: String,
        subtype: Option<String>,
        amount: i64,
    },
    Lose {
        item: String,
        subtype: Option<String>,
        amount: i64,
    },
    Heal {
        treatment: String,
        player: Option<i64>,
    },
    CastSpell {
        spell: String,
        player: Option<i64>,
    },
    Damage {
        player: Option<i64>,
        points: i64,
    },
    Karma {
        virtue: String,
        amount: i64,
    },
    Music {
        track: String,
    },
    Ztats {
        player: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Done,
    /// The game declined, e.g. the party cannot afford a payment.
    Refused,
}

pub trait ScriptHost {
    fn apply(&mut self, effect: &HostEffect) -> Result<EffectOutcome, ParleyError>;
}

impl<F> ScriptHost for F
where
    F: FnMut(&HostEffect) -> Result<EffectOutcome, ParleyError>,
{
    fn apply(&mut self, effect: &HostEffect) -> Result<EffectOutcome, ParleyError> {
        self(effect)
    }
}

/// Accepts every effect without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl ScriptHost for NullHost {
    fn apply(&mut self, _effect: &HostEffect) -> Result<EffectOutcome, ParleyError> {
        Ok(EffectOutcome::Done)
    }
}
