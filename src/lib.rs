// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Common library functions for Minium
//!
//! A session is described declaratively, evaluated into a plan, and then
//! run under a supervisor that tears everything down when the session's
//! watchdog process exits.

pub mod args;
pub mod camera;
pub mod directive;
mod error;
pub mod session;
pub mod spawn;
pub mod subst;
pub mod supervisor;

pub use error::{Error, ErrorKind};
