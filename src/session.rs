// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Session descriptors and their evaluation into a plan
//!
//! A descriptor owns the declared launch arguments and the ordered list of
//! directives. Evaluation is pure: it resolves every substitution against
//! the fixed argument values and produces a [`SessionPlan`], or fails before
//! any process has been asked to start. Partial sessions are not a thing.

use std::fmt;

use crate::args::{ArgumentValues, LaunchArgument};
use crate::directive::{Action, Directive};
use crate::{Error, ErrorKind};

/// The declarative description of one process session.
#[derive(Debug, Default)]
pub struct SessionDescriptor {
    arguments: Vec<LaunchArgument>,
    directives: Vec<Directive>,
}

impl SessionDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a launch argument with its default value and description.
    pub fn declare_argument(
        &mut self,
        name: impl Into<String>,
        default_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.arguments.iter().any(|a| a.name() == name) {
            return Err(ErrorKind::DuplicateArgument(name).into());
        }

        self.arguments
            .push(LaunchArgument::new(name, default_value, description));
        Ok(())
    }

    /// Append a directive; directives are issued in declaration order.
    pub fn add_directive(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn arguments(&self) -> &[LaunchArgument] {
        &self.arguments
    }

    /// Evaluate the descriptor against caller overrides.
    ///
    /// Conditions gate inclusion: a false condition skips the directive
    /// without shifting the ones after it. Any resolution failure, an
    /// undeclared argument or a non-boolean condition, fails the whole
    /// evaluation.
    pub fn evaluate(&self, overrides: &[(String, String)]) -> Result<SessionPlan, Error> {
        let values = ArgumentValues::resolve(&self.arguments, overrides)?;

        let mut processes = Vec::new();
        for directive in &self.directives {
            if let Some(condition) = directive.condition_subst() {
                if !condition.resolve_bool(&values)? {
                    tracing::debug!(program = %directive.program(), "directive skipped");
                    continue;
                }
            }

            let args = directive
                .args()
                .iter()
                .map(|a| a.resolve(&values))
                .collect::<Result<Vec<_>, _>>()?;
            let params = directive
                .params()
                .iter()
                .map(|(name, value)| Ok((name.clone(), value.resolve(&values)?)))
                .collect::<Result<Vec<_>, Error>>()?;

            processes.push(ResolvedProcess {
                program: directive.program().to_string(),
                args,
                params,
                remaps: directive.remaps().to_vec(),
                on_exit: directive.on_exit_actions().to_vec(),
            });
        }

        Ok(SessionPlan { processes })
    }
}

/// A fully resolved start-request for one process.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedProcess {
    pub program: String,
    pub args: Vec<String>,
    pub params: Vec<(String, String)>,
    pub remaps: Vec<(String, String)>,
    pub on_exit: Vec<Action>,
}

impl ResolvedProcess {
    /// The argument vector handed to the program.
    ///
    /// Positional args come first, then `--param NAME=VALUE` per parameter,
    /// then `--remap FROM=TO` per remapping, all in declaration order.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        for (name, value) in &self.params {
            args.push("--param".to_string());
            args.push(format!("{}={}", name, value));
        }
        for (from, to) in &self.remaps {
            args.push("--remap".to_string());
            args.push(format!("{}={}", from, to));
        }
        args
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ResolvedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.command_args() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// The ordered start-requests a descriptor evaluated to.
#[derive(Debug, Default)]
pub struct SessionPlan {
    pub processes: Vec<ResolvedProcess>,
}

impl SessionPlan {
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
