use log::debug;
use pl_core::{InputKind, InputRequest, NodeId, ParleyError, ScriptTree, ScriptValue};

use crate::script::{ExecFrame, FrameKind};
use crate::{EffectOutcome, ExprValue, HostEffect, Script, ScriptHost, ScriptOutput, ScriptState};

pub(crate) enum ActionOutcome {
    Continue,
    Redirected,
    Stop,
    Suspend(ScriptOutput),
}

pub(crate) type ActionHandler =
    fn(&mut Script, NodeId, &mut dyn ScriptHost) -> Result<ActionOutcome, ParleyError>;

const ACTIONS: &[(&str, ActionHandler)] = &[
    ("context", action_context),
    ("unset_context", action_unset_context),
    ("end", action_end),
    ("stop", action_stop),
    ("redirect", action_redirect),
    ("wait_for_keypress", action_wait_for_keypress),
    ("wait", action_wait),
    ("for", action_for),
    ("random", action_random),
    ("move", action_move),
    ("sleep", action_sleep),
    ("cursor", action_cursor),
    ("pay", action_pay),
    ("if", action_if),
    ("else", action_else),
    ("input", action_input),
    ("add", action_add),
    ("lose", action_lose),
    ("heal", action_heal),
    ("cast_spell", action_cast_spell),
    ("damage", action_damage),
    ("karma", action_karma),
    ("music", action_music),
    ("var", action_var),
    ("ztats", action_ztats),
    ("include", action_include),
];

pub(crate) fn find_action(label: &str) -> Option<ActionHandler> {
    ACTIONS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, handler)| *handler)
}

fn action_context(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let name = script.required_text_attr(node, "name")?;
    let id = script.text_attr(node, "id")?;
    script.push_context(&name, id.as_deref())?;
    Ok(ActionOutcome::Continue)
}

fn action_unset_context(
    script: &mut Script,
    _node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    script.pop_context()?;
    Ok(ActionOutcome::Continue)
}

fn action_end(
    script: &mut Script,
    _node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    script.frames.clear();
    script.state = ScriptState::Done;
    Ok(ActionOutcome::Suspend(ScriptOutput::End))
}

fn action_stop(
    _script: &mut Script,
    _node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    Ok(ActionOutcome::Stop)
}

/// `<redirect target="topic" id="{$answer}" default="other"/>`: jumps to the first
/// `<topic>` whose id matches, falling back to the `default` id. The loaded script
/// is searched before the whole document.
fn action_redirect(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let tree = script.tree()?;
    let target = script.required_text_attr(node, "target")?;
    let id = script.text_attr(node, "id")?;
    let fallback = script.text_attr(node, "default")?;

    let found = script
        .locate(tree.as_ref(), &target, id.as_deref())
        .or_else(|| {
            fallback
                .as_deref()
                .and_then(|fallback| script.locate(tree.as_ref(), &target, Some(fallback)))
        })
        .ok_or_else(|| {
            ParleyError::new(
                "SCRIPT_REDIRECT_NOT_FOUND",
                format!(
                    "Redirect from {} found no <{}> with id \"{}\".",
                    tree.describe(node),
                    target,
                    id.as_deref().unwrap_or_default()
                ),
            )
        })?;
    script.jump_to(tree.as_ref(), found);
    Ok(ActionOutcome::Redirected)
}

fn action_wait_for_keypress(
    script: &mut Script,
    _node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    Ok(script.suspend_for_input(InputRequest::keypress()))
}

fn action_wait(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let millis = script.required_int_attr(node, "msecs")?;
    Ok(ActionOutcome::Suspend(ScriptOutput::Wait { millis }))
}

/// Inclusive `start..=end` by `step`, or `count` passes from `start`.
fn action_for(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let tree = script.tree()?;
    let var = script.text_attr(node, "var")?;
    let start = script.int_attr(node, "start")?.unwrap_or(1);
    let step = script.int_attr(node, "step")?.unwrap_or(1);
    if step == 0 {
        return Err(ParleyError::new(
            "SCRIPT_LOOP_STEP",
            format!("Loop {} has a zero step.", tree.describe(node)),
        ));
    }
    let last = match script.int_attr(node, "count")? {
        Some(count) if count <= 0 => return Ok(ActionOutcome::Continue),
        Some(count) => (count - 1)
            .checked_mul(step)
            .and_then(|span| start.checked_add(span))
            .ok_or_else(|| {
                ParleyError::new(
                    "SCRIPT_LOOP_RANGE",
                    format!("Loop {} overflows.", tree.describe(node)),
                )
            })?,
        None => script.required_int_attr(node, "end")?,
    };
    if (step > 0 && start > last) || (step < 0 && start < last) {
        return Ok(ActionOutcome::Continue);
    }

    if let Some(var) = &var {
        let first = ScriptValue::Int(start);
        script.variables.insert(var.clone(), first);
    }
    script.frames.push(ExecFrame {
        parent: node,
        cursor: tree.first_child(node),
        kind: FrameKind::Loop {
            var,
            current: start,
            last,
            step,
        },
    });
    Ok(ActionOutcome::Continue)
}

/// `chance="N"` runs the body N percent of the time; otherwise one child element
/// is picked by its `weight` (default 1) and its content runs.
fn action_random(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let tree = script.tree()?;
    if let Some(chance) = script.int_attr(node, "chance")? {
        let draw = i64::from(script.rng.next_bounded(100));
        if draw < chance {
            script.push_block(tree.as_ref(), node);
        }
        return Ok(ActionOutcome::Continue);
    }

    let mut weighted = Vec::new();
    for child in tree.child_elements(node) {
        let weight = script.int_attr(child, "weight")?.unwrap_or(1).max(0);
        weighted.push((child, weight));
    }
    let total: i64 = weighted.iter().map(|(_, weight)| weight).sum();
    let Ok(bound) = u32::try_from(total) else {
        return Err(ParleyError::new(
            "SCRIPT_ATTRIBUTE_TYPE",
            format!("Random weights of {} are out of range.", tree.describe(node)),
        ));
    };
    if bound == 0 {
        return Ok(ActionOutcome::Continue);
    }
    let mut draw = i64::from(script.rng.next_bounded(bound));
    for (child, weight) in weighted {
        if draw < weight {
            script.push_block(tree.as_ref(), child);
            break;
        }
        draw -= weight;
    }
    Ok(ActionOutcome::Continue)
}

fn action_move(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Move {
        x: script.int_attr(node, "x")?,
        y: script.int_attr(node, "y")?,
        z: script.int_attr(node, "z")?,
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_sleep(
    _script: &mut Script,
    _node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    host.apply(&HostEffect::Sleep)?;
    Ok(ActionOutcome::Continue)
}

fn action_cursor(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let enable = script.text_attr(node, "enable")?;
    let visible = match enable.as_deref().map(str::trim) {
        None | Some("true" | "on" | "1") => true,
        Some("false" | "off" | "0") => false,
        Some(other) => {
            return Err(ParleyError::new(
                "SCRIPT_ATTRIBUTE_TYPE",
                format!("Cursor enable value \"{}\" is not a boolean.", other),
            ))
        }
    };
    host.apply(&HostEffect::Cursor { visible })?;
    Ok(ActionOutcome::Continue)
}

fn action_pay(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Pay {
        price: script.required_int_attr(node, "price")?,
        quantity: script.int_attr(node, "quantity")?.unwrap_or(1),
    };
    let cantpay = script.text_attr(node, "cantpay")?;
    if host.apply(&effect)? == EffectOutcome::Done {
        return Ok(ActionOutcome::Continue);
    }
    let Some(label) = cantpay else {
        debug!("payment refused, no cantpay label");
        return Ok(ActionOutcome::Continue);
    };

    let tree = script.tree()?;
    let target = script.locate(tree.as_ref(), &label, None).ok_or_else(|| {
        ParleyError::new(
            "SCRIPT_REDIRECT_NOT_FOUND",
            format!("Cantpay block <{}> not found.", label),
        )
    })?;
    script.jump_to(tree.as_ref(), target);
    Ok(ActionOutcome::Redirected)
}

/// Runs its own content when `test` holds, else the content of its `<else>` child.
fn action_if(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let tree = script.tree()?;
    let test = script.required_text_attr(node, "test")?;
    if script.evaluate(&test)?.truthy() {
        script.push_block(tree.as_ref(), node);
    } else if let Some(otherwise) = tree.find_child(node, "else") {
        script.push_block(tree.as_ref(), otherwise);
    }
    Ok(ActionOutcome::Continue)
}

fn action_else(
    _script: &mut Script,
    _node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    Ok(ActionOutcome::Continue)
}

fn action_input(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let kind = InputKind::from_name(&script.required_text_attr(node, "type")?)?;
    let target_var = script.text_attr(node, "name")?;
    let max_len = match script.int_attr(node, "maxlen")? {
        Some(len) => Some(usize::try_from(len).map_err(|_| {
            ParleyError::new(
                "SCRIPT_ATTRIBUTE_TYPE",
                format!("Input maxlen {} is negative.", len),
            )
        })?),
        None => None,
    };
    let choices = script
        .text_attr(node, "options")?
        .map(|options| options.to_lowercase());
    Ok(script.suspend_for_input(InputRequest {
        kind,
        target_var,
        max_len,
        choices,
    }))
}

fn action_add(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Add {
        item: script.required_text_attr(node, "type")?,
        subtype: script.text_attr(node, "subtype")?,
        amount: script.int_attr(node, "amount")?.unwrap_or(1),
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_lose(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Lose {
        item: script.required_text_attr(node, "type")?,
        subtype: script.text_attr(node, "subtype")?,
        amount: script.int_attr(node, "amount")?.unwrap_or(1),
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_heal(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Heal {
        treatment: script
            .text_attr(node, "type")?
            .unwrap_or_else(|| "full".to_string()),
        player: script.int_attr(node, "player")?,
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_cast_spell(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::CastSpell {
        spell: script.required_text_attr(node, "spell")?,
        player: script.int_attr(node, "player")?,
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_damage(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Damage {
        player: script.int_attr(node, "player")?,
        points: script.required_int_attr(node, "pts")?,
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_karma(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Karma {
        virtue: script.required_text_attr(node, "virtue")?,
        amount: script.int_attr(node, "amount")?.unwrap_or(1),
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

fn action_music(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Music {
        track: script.required_text_attr(node, "type")?,
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

/// `expr` is evaluated, `value` is translated and stored as an integer when it
/// parses as one; with neither the variable is unset.
fn action_var(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let name = script.required_text_attr(node, "name")?;
    if let Some(expr) = script.text_attr(node, "expr")? {
        let value = script.evaluate(&expr)?.into_script_value();
        script.set_var(&name, value);
    } else if let Some(value) = script.text_attr(node, "value")? {
        script.set_var(&name, ScriptValue::from_text(&value));
    } else {
        script.unset_var(&name);
    }
    Ok(ActionOutcome::Continue)
}

fn action_ztats(
    script: &mut Script,
    node: NodeId,
    host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let effect = HostEffect::Ztats {
        player: script.int_attr(node, "player")?,
    };
    host.apply(&effect)?;
    Ok(ActionOutcome::Continue)
}

/// Runs another script's content, or one block of it, in place.
fn action_include(
    script: &mut Script,
    node: NodeId,
    _host: &mut dyn ScriptHost,
) -> Result<ActionOutcome, ParleyError> {
    let tree = script.tree()?;
    let name = script.required_text_attr(node, "script")?;
    let block = script.text_attr(node, "block")?;

    let included = tree
        .find_descendant(tree.root(), "script", Some(("id", name.as_str())))
        .and_then(|found| match &block {
            Some(block) => tree.find_descendant(found, block, None),
            None => Some(found),
        })
        .ok_or_else(|| {
            ParleyError::new(
                "SCRIPT_INCLUDE_NOT_FOUND",
                format!(
                    "Include from {} found no script \"{}\"{}.",
                    tree.describe(node),
                    name,
                    block
                        .as_deref()
                        .map(|block| format!(" block <{}>", block))
                        .unwrap_or_default()
                ),
            )
        })?;
    script.push_block(tree.as_ref(), included);
    Ok(ActionOutcome::Continue)
}

impl Script {
    /// Searches the loaded script first, then the whole document.
    pub(crate) fn locate(
        &self,
        tree: &dyn ScriptTree,
        label: &str,
        id: Option<&str>,
    ) -> Option<NodeId> {
        let attribute = id.map(|id| ("id", id));
        self.script_node
            .and_then(|script_node| tree.find_descendant(script_node, label, attribute))
            .or_else(|| tree.find_descendant(tree.root(), label, attribute))
    }

    pub(crate) fn text_attr(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<String>, ParleyError> {
        let tree = self.tree()?;
        match tree.attribute(node, name) {
            Some(raw) => Ok(Some(self.translate(raw)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn required_text_attr(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<String, ParleyError> {
        self.text_attr(node, name)?
            .ok_or_else(|| self.missing_attribute(node, name))
    }

    /// Translated, then evaluated as an expression that must yield an integer.
    pub(crate) fn int_attr(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<i64>, ParleyError> {
        let Some(expr) = self.text_attr(node, name)? else {
            return Ok(None);
        };
        match self.evaluate(&expr)? {
            ExprValue::Int(value) => Ok(Some(value)),
            other => Err(ParleyError::new(
                "SCRIPT_ATTRIBUTE_TYPE",
                format!(
                    "Attribute \"{}\" of {} must be an integer, got \"{}\".",
                    name,
                    self.describe(node),
                    other
                ),
            )),
        }
    }

    pub(crate) fn required_int_attr(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<i64, ParleyError> {
        self.int_attr(node, name)?
            .ok_or_else(|| self.missing_attribute(node, name))
    }

    fn missing_attribute(&self, node: NodeId, name: &str) -> ParleyError {
        ParleyError::new(
            "SCRIPT_ATTRIBUTE_MISSING",
            format!("{} needs attribute \"{}\".", self.describe(node), name),
        )
    }

    fn describe(&self, node: NodeId) -> String {
        self.tree
            .as_ref()
            .map(|tree| tree.describe(node))
            .unwrap_or_else(|| format!("node {}", node.0))
    }
}
