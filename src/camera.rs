// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The stock camera-simulation session
//!
//! Wires five programs into one session: the Gazebo simulator, the
//! ROS/Gazebo image bridge, RViz (only when asked for), a video recorder,
//! and the watchdog whose exit tears the whole thing down. The watchdog is
//! this binary's own `stop` role, the same trick the launcher plays when it
//! re-executes itself for a subcommand.

use std::env;

use crate::directive::{Action, Directive};
use crate::session::SessionDescriptor;
use crate::subst::Substitution;
use crate::Error;

pub const RVIZ_ARG: &str = "rviz";
pub const OUTPUT_VIDEO_ARG: &str = "output_video";

/// Build the camera session descriptor.
pub fn camera_session() -> Result<SessionDescriptor, Error> {
    let mut session = SessionDescriptor::new();

    session.declare_argument(RVIZ_ARG, "true", "Open RViz.")?;
    session.declare_argument(OUTPUT_VIDEO_ARG, "/tmp/output", "Output path")?;

    // the simulator, headless; RViz is the one looking at the pictures
    session.add_directive(
        Directive::new("gz")
            .arg("sim")
            .arg("-r")
            .arg("camera_sensor.sdf")
            .arg("--headless-rendering"),
    );

    // bridge camera frames and calibration between the two namespaces
    session.add_directive(
        Directive::new("parameter_bridge")
            .arg("/camera@sensor_msgs/msg/Image@ignition.msgs.Image")
            .arg("/camera_info@sensor_msgs/msg/CameraInfo@ignition.msgs.CameraInfo"),
    );

    session.add_directive(
        Directive::new("rviz2")
            .arg("-d")
            .arg("camera.rviz")
            .condition(Substitution::arg(RVIZ_ARG)),
    );

    session.add_directive(
        Directive::new("video_recorder")
            .param("filename", Substitution::arg(OUTPUT_VIDEO_ARG))
            .remap("image", "camera"),
    );

    // any exit of the watchdog ends the session, successful or not; the
    // watchdog is this same binary re-executed in its stop role, so it
    // starts whether or not we are installed on PATH
    let argv0 = env::args_os()
        .next()
        .ok_or_else(|| Error::from("arg0 is not present?"))?;
    session.add_directive(
        Directive::new(argv0.to_string_lossy())
            .arg("stop")
            .on_exit(Action::log("watchdog exited, stopping everything"))
            .on_exit(Action::shutdown("watchdog timeout")),
    );

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_session_with_defaults() {
        let session = camera_session().expect("build failed");
        let plan = session.evaluate(&[]).expect("evaluate failed");

        let programs: Vec<&str> = plan.processes.iter().map(|p| p.program.as_str()).collect();
        assert_eq!(programs.len(), 5);
        assert_eq!(
            &programs[..4],
            &["gz", "parameter_bridge", "rviz2", "video_recorder"]
        );
    }

    #[test]
    fn headless_session_records_to_the_requested_file() {
        let session = camera_session().expect("build failed");
        let overrides = vec![
            ("rviz".to_string(), "false".to_string()),
            ("output_video".to_string(), "/tmp/out.mp4".to_string()),
        ];
        let plan = session.evaluate(&overrides).expect("evaluate failed");

        let programs: Vec<&str> = plan.processes.iter().map(|p| p.program.as_str()).collect();
        assert_eq!(programs.len(), 4);
        assert_eq!(&programs[..3], &["gz", "parameter_bridge", "video_recorder"]);

        let recorder = plan
            .processes
            .iter()
            .find(|p| p.program == "video_recorder")
            .expect("recorder missing");
        assert_eq!(recorder.param("filename"), Some("/tmp/out.mp4"));
    }

    #[test]
    fn watchdog_runs_this_binary() {
        let session = camera_session().expect("build failed");
        let plan = session.evaluate(&[]).expect("evaluate failed");

        let watchdog = plan.processes.last().expect("watchdog missing");
        let argv0 = env::args_os().next().expect("no argv0");

        // a bare program name would go through a PATH lookup and miss when
        // we are run from a build directory; the session would then have no
        // watchdog at all
        assert_eq!(watchdog.program, argv0.to_string_lossy().into_owned());
        assert_eq!(watchdog.args, vec!["stop"]);
    }

    #[test]
    fn watchdog_carries_the_shutdown_action() {
        let session = camera_session().expect("build failed");
        let plan = session.evaluate(&[]).expect("evaluate failed");

        let watchdog = plan.processes.last().expect("watchdog missing");
        assert_eq!(
            watchdog.on_exit,
            vec![
                Action::log("watchdog exited, stopping everything"),
                Action::shutdown("watchdog timeout"),
            ]
        );
    }
}
