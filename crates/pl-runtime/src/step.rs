use std::rc::Rc;

use log::debug;
use pl_core::{NodeId, NodeKind, ParleyError, ScriptTree, ScriptValue};

use crate::actions::{find_action, ActionOutcome};
use crate::script::{ExecFrame, FrameKind};
use crate::{Script, ScriptHost, ScriptOutput, ScriptState};

impl Script {
    /// Walks the document until there is something for the caller.
    pub fn next_output(&mut self, host: &mut dyn ScriptHost) -> Result<ScriptOutput, ParleyError> {
        match self.state {
            ScriptState::Unloaded => return Err(crate::script::not_loaded()),
            ScriptState::Done => return Ok(ScriptOutput::End),
            ScriptState::AwaitingInput => {
                if let Some(request) = &self.pending_input {
                    return Ok(ScriptOutput::Input {
                        request: request.clone(),
                    });
                }
                self.state = ScriptState::Normal;
            }
            ScriptState::Normal => {}
        }
        if self.idle {
            return Ok(ScriptOutput::Stopped);
        }

        let tree = self.tree()?;
        let mut steps = 0usize;
        while steps < self.step_limit {
            steps += 1;

            let Some(frame) = self.frames.last_mut() else {
                debug!("script traversal exhausted");
                self.state = ScriptState::Done;
                return Ok(ScriptOutput::End);
            };
            let Some(node) = frame.cursor else {
                // A bounded loop iterating is progress; the guard is per iteration.
                if self.close_frame(tree.as_ref()) {
                    steps = 0;
                }
                continue;
            };
            frame.cursor = tree.next_sibling(node);

            match tree.kind(node) {
                NodeKind::Text => {
                    let raw = tree.text(node).unwrap_or_default().trim();
                    if raw.is_empty() {
                        continue;
                    }
                    let text = self.translate(raw)?;
                    return Ok(ScriptOutput::Text { text });
                }
                NodeKind::Element => match self.execute(&tree, node, host)? {
                    ActionOutcome::Continue | ActionOutcome::Redirected => {}
                    ActionOutcome::Stop => {
                        debug!("script pass stopped at {}", tree.describe(node));
                        self.frames.clear();
                        self.idle = true;
                        return Ok(ScriptOutput::Stopped);
                    }
                    ActionOutcome::Suspend(output) => return Ok(output),
                },
            }
        }

        Err(ParleyError::new(
            "SCRIPT_STEP_LIMIT",
            format!("Execution guard exceeded {} steps.", self.step_limit),
        ))
    }

    fn execute(
        &mut self,
        tree: &Rc<dyn ScriptTree>,
        node: NodeId,
        host: &mut dyn ScriptHost,
    ) -> Result<ActionOutcome, ParleyError> {
        let label = tree.label(node);
        match find_action(label) {
            Some(action) => action(self, node, host),
            None => {
                log::warn!("unknown script action {}, skipped", tree.describe(node));
                Ok(ActionOutcome::Continue)
            }
        }
    }

    /// Re-enters a loop body while iterations remain, otherwise pops the frame.
    /// Returns whether the loop went round again.
    fn close_frame(&mut self, tree: &dyn ScriptTree) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        if let FrameKind::Loop {
            var,
            current,
            last,
            step,
        } = &mut frame.kind
        {
            let more = current.checked_add(*step).filter(|next| {
                if *step > 0 {
                    *next <= *last
                } else {
                    *next >= *last
                }
            });
            if let Some(next) = more {
                *current = next;
                frame.cursor = tree.first_child(frame.parent);
                if let Some(var) = var {
                    self.variables.insert(var.clone(), ScriptValue::Int(next));
                }
                return true;
            }
        }
        self.frames.pop();
        false
    }

    pub(crate) fn push_block(&mut self, tree: &dyn ScriptTree, parent: NodeId) {
        self.frames.push(ExecFrame::block(tree, parent));
    }

    /// Abandons the current traversal and continues inside `target`.
    pub(crate) fn jump_to(&mut self, tree: &dyn ScriptTree, target: NodeId) {
        debug!("script redirected to {}", tree.describe(target));
        self.frames.clear();
        self.push_block(tree, target);
    }

    pub(crate) fn suspend_for_input(&mut self, request: pl_core::InputRequest) -> ActionOutcome {
        debug!("script awaiting {} input", request.kind);
        self.pending_input = Some(request.clone());
        self.state = ScriptState::AwaitingInput;
        ActionOutcome::Suspend(ScriptOutput::Input { request })
    }
}
