// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::time::Duration;

use clap::{App, Arg, ArgMatches, SubCommand};
use tokio::runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use miniumrc::args::parse_override;
use miniumrc::camera;
use miniumrc::spawn::TokioSpawner;
use miniumrc::supervisor::Supervisor;
use miniumrc::Error;

const LAUNCH: &str = "launch";
const PLAN: &str = "plan";
const STOP: &str = "stop";

const OVERRIDE: &str = "override";
const TIMEOUT: &str = "timeout";

trait SetupClapApp {
    fn setup_clap_app(self) -> Self;
    fn override_opts(self) -> Self;
}

impl<'a, 'b> SetupClapApp for App<'a, 'b> {
    fn setup_clap_app(self) -> Self {
        self.version(env!("CARGO_PKG_VERSION"))
            .author(env!("CARGO_PKG_AUTHORS"))
    }

    fn override_opts(self) -> Self {
        self.arg(
            Arg::with_name(OVERRIDE)
                .value_name("NAME=VALUE")
                .validator(|s| parse_override(&s).map(|_| ()).map_err(|e| e.to_string()))
                .help("override a declared launch argument's default value")
                .multiple(true),
        )
    }
}

fn launch_sub_command() -> App<'static, 'static> {
    SubCommand::with_name(LAUNCH)
        .about("launch the camera session and supervise it to completion")
        .override_opts()
}

fn plan_sub_command() -> App<'static, 'static> {
    SubCommand::with_name(PLAN)
        .about("evaluate the camera session and print it without starting anything")
        .override_opts()
}

fn stop_sub_command() -> App<'static, 'static> {
    SubCommand::with_name(STOP)
        .about("the session watchdog: sleep, then exit")
        .arg(
            Arg::with_name(TIMEOUT)
                .short("t")
                .long(TIMEOUT)
                .value_name("SECS")
                .validator(|s| {
                    s.parse::<u64>()
                        .map(|_| ())
                        .map_err(|_| String::from("number was expected"))
                })
                .help("seconds to wait before exiting")
                .default_value("5")
                .takes_value(true),
        )
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = App::new(env!("CARGO_PKG_NAME"))
        .setup_clap_app()
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand(launch_sub_command().setup_clap_app())
        .subcommand(plan_sub_command().setup_clap_app())
        .subcommand(stop_sub_command().setup_clap_app())
        .get_matches();

    let mut runtime = runtime::Builder::new()
        .basic_scheduler()
        .enable_all()
        .build()
        .expect("Failed to initialize Tokio Runtime");

    runtime.block_on(async move {
        match args.subcommand() {
            (LAUNCH, Some(args)) => launch(args).await,
            (PLAN, Some(args)) => plan(args).await,
            (STOP, Some(args)) => stop(args).await,
            ("", None) => {
                println!("command required");
                println!("{}", args.usage());
                std::process::exit(1);
            }
            (arg, _) => {
                println!("unexpected argument: {}", arg);
                println!("{}", args.usage());
                std::process::exit(2);
            }
        }
    })
}

fn overrides(args: &ArgMatches<'_>) -> Result<Vec<(String, String)>, Error> {
    args.values_of(OVERRIDE)
        .into_iter()
        .flatten()
        .map(parse_override)
        .collect()
}

async fn launch(args: &ArgMatches<'_>) -> Result<(), Error> {
    let overrides = overrides(args)?;
    let session = camera::camera_session()?;

    // evaluation is pure; if it fails here, nothing has been started
    let plan = session.evaluate(&overrides)?;

    let outcome = Supervisor::new(TokioSpawner).run(plan).await?;
    match outcome.shutdown_reason {
        Some(reason) => info!(reason = %reason, "session ended"),
        None => info!("session ended, all processes exited on their own"),
    }

    Ok(())
}

async fn plan(args: &ArgMatches<'_>) -> Result<(), Error> {
    let overrides = overrides(args)?;
    let session = camera::camera_session()?;

    println!("arguments:");
    for arg in session.arguments() {
        println!(
            "    {}={}\t{}",
            arg.name(),
            arg.default_value(),
            arg.description()
        );
    }

    let plan = session.evaluate(&overrides)?;
    println!("processes:");
    for process in &plan.processes {
        println!("    {}", process);
    }

    Ok(())
}

async fn stop(args: &ArgMatches<'_>) -> Result<(), Error> {
    let secs = args
        .value_of(TIMEOUT)
        .unwrap_or("5")
        .parse::<u64>()
        .map_err(|e| format!("timeout is not a number: {}", e))?;

    info!(seconds = secs, "watchdog armed");
    tokio::time::delay_for(Duration::from_secs(secs)).await;
    info!("watchdog timeout elapsed");

    Ok(())
}
