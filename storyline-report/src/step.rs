// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ModelError, ModelSubject, ResultKind,
    aggregate::{aggregate, effective_result},
};

/// A single recorded step in a scenario.
///
/// Steps form a tree: a step may own any number of child steps, kept in the order in which they
/// were added. Once a step is finalized its result is cached and it can no longer be changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestStep {
    description: String,
    own_result: Option<ResultKind>,
    message: Option<String>,
    children: Vec<TestStep>,
    // Set by `finalize` (or by the report reader), never changed afterwards.
    finalized: Option<ResultKind>,
}

impl TestStep {
    /// Creates a new, running step with the given description.
    ///
    /// Returns an error if the description is empty.
    pub fn new(description: impl Into<String>) -> Result<Self, ModelError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ModelError::EmptyDescription);
        }
        Ok(Self {
            description,
            own_result: None,
            message: None,
            children: Vec::new(),
            finalized: None,
        })
    }

    /// Creates a finalized leaf step with the given result.
    pub fn leaf(description: impl Into<String>, result: ResultKind) -> Result<Self, ModelError> {
        let mut step = Self::new(description)?;
        step.set_result(result)?;
        step.finalize()?;
        Ok(step)
    }

    /// Used by the report reader: the stored result is trusted as-is.
    pub(crate) fn from_parts(
        description: String,
        own_result: Option<ResultKind>,
        message: Option<String>,
        children: Vec<TestStep>,
        stored_result: Option<ResultKind>,
    ) -> Self {
        let mut step = Self {
            description,
            own_result,
            message,
            children,
            finalized: None,
        };
        step.finalized = Some(stored_result.unwrap_or_else(|| effective_result(&step)));
        step
    }

    /// The human-readable description of this step.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The result recorded directly on this step, if any.
    ///
    /// Container steps that only hold children usually have no own result.
    pub fn own_result(&self) -> Option<ResultKind> {
        self.own_result
    }

    /// The message attached to this step, typically a failure or error description.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The child steps, in the order they were added.
    pub fn children(&self) -> &[TestStep] {
        &self.children
    }

    /// Returns true if this step has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    /// The effective result of this step.
    ///
    /// For finalized steps this is the cached result. For running steps it is computed from the
    /// current tree.
    pub fn effective_result(&self) -> ResultKind {
        match self.finalized {
            Some(result) => result,
            None => effective_result(self),
        }
    }

    /// Sets the result of this step.
    pub fn set_result(&mut self, result: ResultKind) -> Result<&mut Self, ModelError> {
        self.ensure_running("set the step result")?;
        self.own_result = Some(result);
        Ok(self)
    }

    /// Sets the result of this step unless one has already been recorded.
    ///
    /// Returns the result the step ends up with.
    pub fn set_result_if_unset(&mut self, result: ResultKind) -> Result<ResultKind, ModelError> {
        self.ensure_running("set the step result")?;
        Ok(*self.own_result.get_or_insert(result))
    }

    /// Attaches a message to this step.
    pub fn set_message(&mut self, message: impl Into<String>) -> Result<&mut Self, ModelError> {
        self.ensure_running("set the step message")?;
        self.message = Some(message.into());
        Ok(self)
    }

    /// Appends a child step and returns a mutable reference to it.
    pub fn add_child(&mut self, child: TestStep) -> Result<&mut TestStep, ModelError> {
        self.ensure_running("add a child step")?;
        self.children.push(child);
        Ok(self
            .children
            .last_mut()
            .expect("a child was just pushed"))
    }

    /// Freezes the result of this step and returns it.
    ///
    /// Any children that are still running are finalized first. Finalizing a step twice is an
    /// error.
    pub fn finalize(&mut self) -> Result<ResultKind, ModelError> {
        self.ensure_running("finalize the step")?;
        for child in &mut self.children {
            if !child.is_finalized() {
                child.finalize()?;
            }
        }
        let result = aggregate(
            self.own_result
                .into_iter()
                .chain(self.children.iter().map(TestStep::effective_result)),
        );
        self.finalized = Some(result);
        Ok(result)
    }

    /// The number of steps in this subtree, including this step.
    pub fn nested_step_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TestStep::nested_step_count)
            .sum::<usize>()
    }

    /// Iterates over this step and all its descendants, depth-first, parents before children.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = &TestStep> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), ModelError> {
        if self.is_finalized() {
            Err(ModelError::finalized(ModelSubject::Step, operation))
        } else {
            Ok(())
        }
    }
}
