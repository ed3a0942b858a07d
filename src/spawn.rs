// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Start session processes as real OS children

use std::convert::TryFrom;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::info;

use crate::session::ResolvedProcess;
use crate::supervisor::{ProcessHandle, Spawner};
use crate::{Error, ErrorKind};

/// Spawns each start-request with `tokio::process`.
///
/// The operator sees everything on one console: children inherit stdio, so
/// their output interleaves with ours.
#[derive(Debug, Default)]
pub struct TokioSpawner;

#[async_trait]
impl Spawner for TokioSpawner {
    type Handle = TokioHandle;

    async fn spawn(&mut self, process: &ResolvedProcess) -> Result<TokioHandle, Error> {
        // FIXME: clear env? set working directory? uid/gid?
        let child = Command::new(&process.program)
            .args(process.command_args())
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ErrorKind::Spawn {
                program: process.program.clone(),
                source,
            })?;

        info!(program = %process.program, pid = child.id(), "started process");
        Ok(TokioHandle { child })
    }
}

pub struct TokioHandle {
    child: Child,
}

#[async_trait]
impl ProcessHandle for TokioHandle {
    async fn wait(&mut self) -> Result<ExitStatus, Error> {
        let status = (&mut self.child).await?;
        Ok(status)
    }

    fn terminate(&mut self) -> Result<(), Error> {
        // SIGTERM first; kill_on_drop covers anything that ignores it
        kill(signal_pid(self.child.id())?, Signal::SIGTERM)?;
        Ok(())
    }

    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

/// A pid that doesn't fit `pid_t` must not wrap into some other process.
fn signal_pid(raw: u32) -> Result<Pid, Error> {
    let pid =
        i32::try_from(raw).map_err(|_| Error::from(format!("pid out of range: {}", raw)))?;
    Ok(Pid::from_raw(pid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_in_range_converts() {
        assert_eq!(signal_pid(1234).expect("convert failed"), Pid::from_raw(1234));
    }

    #[test]
    fn pid_out_of_range_is_rejected() {
        assert!(signal_pid(u32::max_value()).is_err());
    }
}
