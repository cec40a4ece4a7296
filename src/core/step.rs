//! Step domain model

/// Action signature for a step: mutate the flow state (usually by emitting
/// commands into its script buffer) and report success or an opaque cause.
pub type StepAction<S> = fn(&mut S) -> anyhow::Result<()>;

/// One named unit of flow work.
///
/// Step names double as checkpoint keys and resume targets, so they must be
/// unique within a flow; the pipeline validates this at construction.
pub struct Step<S> {
    name: String,
    action: StepAction<S>,
}

impl<S> Step<S> {
    pub fn new(name: &str, action: StepAction<S>) -> Self {
        Self { name: name.to_string(), action }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, state: &mut S) -> anyhow::Result<()> {
        (self.action)(state)
    }
}

impl<S> std::fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// Where a run begins: at the head of the flow, or resuming at a named step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPoint {
    Beginning,
    At(String),
}

impl StartPoint {
    /// Maps the CLI's optional `--from-step` argument.
    pub fn from_option(name: Option<String>) -> Self {
        match name {
            Some(name) => StartPoint::At(name),
            None => StartPoint::Beginning,
        }
    }
}
