// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Values resolved at evaluation time
//!
//! A substitution is either a literal or a reference to a launch argument.
//! Resolution never mutates anything; a reference to an undeclared argument
//! is an error that aborts the evaluation that hit it.

use crate::args::ArgumentValues;
use crate::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Substitution {
    /// A fixed piece of text
    Text(String),
    /// The resolved value of the named launch argument
    Arg(String),
}

impl Substitution {
    pub fn text(text: impl Into<String>) -> Self {
        Substitution::Text(text.into())
    }

    pub fn arg(name: impl Into<String>) -> Self {
        Substitution::Arg(name.into())
    }

    pub fn resolve(&self, values: &ArgumentValues) -> Result<String, Error> {
        match self {
            Substitution::Text(text) => Ok(text.clone()),
            Substitution::Arg(name) => values
                .get(name)
                .map(str::to_string)
                .ok_or_else(|| ErrorKind::UnknownArgument(name.clone()).into()),
        }
    }

    /// Resolve and then interpret as a boolean, for directive conditions.
    ///
    /// Accepts `true`/`1` and `false`/`0`, ignoring ASCII case.
    pub fn resolve_bool(&self, values: &ArgumentValues) -> Result<bool, Error> {
        let value = self.resolve(values)?;
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ErrorKind::NotABoolean(value).into()),
        }
    }
}

impl From<&str> for Substitution {
    fn from(text: &str) -> Self {
        Substitution::text(text)
    }
}

impl From<String> for Substitution {
    fn from(text: String) -> Self {
        Substitution::Text(text)
    }
}
