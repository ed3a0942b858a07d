// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Launch arguments and their resolved values
//!
//! Rules:
//!   - argument names are unique within a session
//!   - declarations are immutable once made
//!   - values are fixed before any directive is evaluated, caller override
//!     first, declared default second

use std::collections::BTreeMap;

use crate::{Error, ErrorKind};

/// A named argument declared by a session descriptor.
#[derive(Clone, Debug)]
pub struct LaunchArgument {
    name: String,
    default_value: String,
    description: String,
}

impl LaunchArgument {
    pub(crate) fn new(
        name: impl Into<String>,
        default_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            description: description.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The immutable set of argument values a session is evaluated against.
///
/// Built once from declarations plus caller overrides, then only read.
#[derive(Clone, Debug, Default)]
pub struct ArgumentValues(BTreeMap<String, String>);

impl ArgumentValues {
    /// Fix the value of every declared argument.
    ///
    /// Overrides win over defaults. An override for a name that was never
    /// declared is an error, the session would silently ignore it otherwise.
    pub fn resolve(
        declared: &[LaunchArgument],
        overrides: &[(String, String)],
    ) -> Result<Self, Error> {
        let mut values = BTreeMap::new();
        for arg in declared {
            values.insert(arg.name().to_string(), arg.default_value().to_string());
        }

        for (name, value) in overrides {
            if !values.contains_key(name) {
                return Err(ErrorKind::UnknownArgument(name.clone()).into());
            }
            values.insert(name.clone(), value.clone());
        }

        Ok(Self(values))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Parse a `NAME=VALUE` override as given on the command line.
pub fn parse_override(s: &str) -> Result<(String, String), Error> {
    let mut parts = s.splitn(2, '=');
    let name = parts.next().unwrap_or_default();
    let value = parts.next();

    match value {
        Some(value) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(Error::from(format!("expected NAME=VALUE, got: {}", s))),
    }
}
