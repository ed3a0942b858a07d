// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Process directives and their exit reactions
//!
//! A directive is the declarative request to start one external process.
//! It is assembled once, never mutated, and turned into a concrete
//! start-request during session evaluation.
//!
//! Rules:
//!   - a directive whose condition resolves false produces nothing
//!   - on-exit actions are inert data until the started process exits

use crate::subst::Substitution;

/// A reaction to run when a directive's process exits.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Emit a log line
    Log { message: String },
    /// Request termination of every other process in the session
    Shutdown { reason: String },
}

impl Action {
    pub fn log(message: impl Into<String>) -> Self {
        Action::Log {
            message: message.into(),
        }
    }

    pub fn shutdown(reason: impl Into<String>) -> Self {
        Action::Shutdown {
            reason: reason.into(),
        }
    }
}

/// A declarative request to start one external process.
#[derive(Clone, Debug)]
pub struct Directive {
    program: String,
    args: Vec<Substitution>,
    params: Vec<(String, Substitution)>,
    remaps: Vec<(String, String)>,
    condition: Option<Substitution>,
    on_exit: Vec<Action>,
}

impl Directive {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            params: Vec::new(),
            remaps: Vec::new(),
            condition: None,
            on_exit: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, arg: impl Into<Substitution>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set a named parameter for the process.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Substitution>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Remap one of the process's I/O names onto another.
    pub fn remap(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.remaps.push((from.into(), to.into()));
        self
    }

    /// Gate the directive on a boolean-valued substitution.
    ///
    /// Absent, the directive always runs.
    pub fn condition(mut self, condition: Substitution) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Append an action to run when this directive's process exits.
    pub fn on_exit(mut self, action: Action) -> Self {
        self.on_exit.push(action);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub(crate) fn args(&self) -> &[Substitution] {
        &self.args
    }

    pub(crate) fn params(&self) -> &[(String, Substitution)] {
        &self.params
    }

    pub(crate) fn remaps(&self) -> &[(String, String)] {
        &self.remaps
    }

    pub(crate) fn condition_subst(&self) -> Option<&Substitution> {
        self.condition.as_ref()
    }

    pub(crate) fn on_exit_actions(&self) -> &[Action] {
        &self.on_exit
    }
}
