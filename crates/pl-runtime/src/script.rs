use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::debug;
use pl_core::{
    InputRequest, NodeId, ParleyError, RandomSource, ScriptTree, ScriptValue, SeededRandom,
};
use serde::Serialize;

use crate::Provider;

pub const DEFAULT_RANDOM_SEED: u32 = 1;
pub const DEFAULT_STEP_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptState {
    Unloaded,
    Normal,
    AwaitingInput,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScriptOutput {
    Text { text: String },
    Input { request: InputRequest },
    /// Timed pause; call `next_output` again once it has elapsed.
    Wait { millis: i64 },
    /// The pass was halted; `start` begins a new one.
    Stopped,
    End,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub random_seed: Option<u32>,
    /// Nodes visited per `next_output` call, or per loop iteration, before giving up.
    pub step_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Block,
    Loop {
        var: Option<String>,
        current: i64,
        last: i64,
        step: i64,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ExecFrame {
    pub(crate) parent: NodeId,
    pub(crate) cursor: Option<NodeId>,
    pub(crate) kind: FrameKind,
}

impl ExecFrame {
    pub(crate) fn block(tree: &dyn ScriptTree, parent: NodeId) -> Self {
        Self {
            parent,
            cursor: tree.first_child(parent),
            kind: FrameKind::Block,
        }
    }
}

pub struct Script {
    pub(crate) tree: Option<Rc<dyn ScriptTree>>,
    pub(crate) script_node: Option<NodeId>,
    pub(crate) state: ScriptState,
    pub(crate) frames: Vec<ExecFrame>,
    pub(crate) context: Vec<NodeId>,
    pub(crate) variables: BTreeMap<String, ScriptValue>,
    pub(crate) providers: BTreeMap<String, Box<dyn Provider>>,
    pub(crate) pending_input: Option<InputRequest>,
    pub(crate) rng: Box<dyn RandomSource>,
    pub(crate) step_limit: usize,
    /// Loaded but no pass running (never started, or halted by `stop`).
    pub(crate) idle: bool,
}

impl Script {
    pub fn new() -> Self {
        Self::with_options(ScriptOptions::default())
    }

    pub fn with_options(options: ScriptOptions) -> Self {
        Self {
            tree: None,
            script_node: None,
            state: ScriptState::Unloaded,
            frames: Vec::new(),
            context: Vec::new(),
            variables: BTreeMap::new(),
            providers: BTreeMap::new(),
            pending_input: None,
            rng: Box::new(SeededRandom::new(
                options.random_seed.unwrap_or(DEFAULT_RANDOM_SEED),
            )),
            step_limit: options.step_limit.unwrap_or(DEFAULT_STEP_LIMIT),
            idle: true,
        }
    }

    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    pub fn register_provider(&mut self, qualifier: &str, provider: Box<dyn Provider>) {
        self.providers.insert(qualifier.to_string(), provider);
    }

    pub fn state(&self) -> ScriptState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state != ScriptState::Unloaded
    }

    pub fn pending_input(&self) -> Option<&InputRequest> {
        self.pending_input.as_ref()
    }

    /// Locates `<script id=base_id>` in `tree` and makes it the base context,
    /// or the `(name, id)` sub node when one is given. Variables survive a reload.
    pub fn load(
        &mut self,
        tree: Rc<dyn ScriptTree>,
        base_id: &str,
        sub_node: Option<(&str, &str)>,
    ) -> Result<(), ParleyError> {
        let root = tree.root();
        let script_node = if tree.label(root) == "script"
            && tree
                .attribute(root, "id")
                .is_some_and(|id| id.eq_ignore_ascii_case(base_id))
        {
            root
        } else {
            tree.find_descendant(root, "script", Some(("id", base_id)))
                .ok_or_else(|| {
                    ParleyError::new(
                        "SCRIPT_LOAD_NOT_FOUND",
                        format!("Script \"{}\" not found.", base_id),
                    )
                })?
        };
        let base = match sub_node {
            Some((name, id)) => tree
                .find_descendant(root, name, Some(("id", id)))
                .ok_or_else(|| {
                    ParleyError::new(
                        "SCRIPT_LOAD_NOT_FOUND",
                        format!(
                            "Node <{} id=\"{}\"> not found for script \"{}\".",
                            name, id, base_id
                        ),
                    )
                })?,
            None => script_node,
        };

        debug!("script \"{}\" loaded at {}", base_id, tree.describe(base));
        self.tree = Some(tree);
        self.script_node = Some(script_node);
        self.context = vec![base];
        self.frames.clear();
        self.pending_input = None;
        self.state = ScriptState::Normal;
        self.idle = true;
        Ok(())
    }

    /// Drops the document, any running pass and the context stack.
    pub fn unload(&mut self) {
        self.tree = None;
        self.script_node = None;
        self.frames.clear();
        self.context.clear();
        self.pending_input = None;
        self.state = ScriptState::Unloaded;
        self.idle = true;
    }

    /// Begins a new pass at the first block named `label` in the loaded script.
    pub fn start(&mut self, label: &str) -> Result<(), ParleyError> {
        let tree = self.tree()?;
        let script_node = self.script_node()?;
        let block = tree
            .find_descendant(script_node, label, None)
            .ok_or_else(|| {
                ParleyError::new(
                    "SCRIPT_LABEL_NOT_FOUND",
                    format!("Block <{}> not found in {}.", label, tree.describe(script_node)),
                )
            })?;
        self.frames.clear();
        self.frames.push(ExecFrame::block(tree.as_ref(), block));
        self.pending_input = None;
        self.state = ScriptState::Normal;
        self.idle = false;
        Ok(())
    }

    pub(crate) fn tree(&self) -> Result<Rc<dyn ScriptTree>, ParleyError> {
        self.tree.clone().ok_or_else(not_loaded)
    }

    pub(crate) fn script_node(&self) -> Result<NodeId, ParleyError> {
        self.script_node.ok_or_else(not_loaded)
    }
}

pub(crate) fn not_loaded() -> ParleyError {
    ParleyError::new("SCRIPT_NOT_LOADED", "No script is loaded.")
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("state", &self.state)
            .field("script_node", &self.script_node)
            .field("frames", &self.frames)
            .field("context", &self.context)
            .field("variables", &self.variables)
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("pending_input", &self.pending_input)
            .field("idle", &self.idle)
            .finish()
    }
}
