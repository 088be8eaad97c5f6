use anyhow::{Context, bail};
use clap::Parser;
use iotdb_tablet_bench::{
    driver::performance_test,
    specification::ScenarioSpec,
    specs::{built_in_scenario_names, built_in_scenarios},
};
use observability_deps::tracing::info;

use super::common::{SessionArgs, ValueArgs};

#[derive(Debug, Parser)]
#[clap(visible_alias = "s")]
pub(crate) struct Config {
    /// Connection to the store
    #[clap(flatten)]
    session: SessionArgs,

    /// Value generation
    #[clap(flatten)]
    values: ValueArgs,

    /// Logging configuration
    #[clap(flatten)]
    pub(crate) logging_config: trogging::cli::LoggingConfig,

    /// The name of a built-in scenario to run; may be given more than once
    #[clap(long = "builtin", env = "IOTDB_BENCH_BUILTIN")]
    builtin: Vec<String>,

    /// The path to a scenario file in JSON format
    #[clap(long = "spec-path", env = "IOTDB_BENCH_SPEC_PATH")]
    spec_path: Option<String>,

    /// Run every built-in scenario, in order
    #[clap(long = "all", default_value_t = false)]
    all: bool,

    /// Print the names of the built-in scenarios and exit
    #[clap(long = "list", default_value_t = false)]
    list: bool,

    /// Print the named built-in scenario as JSON and exit. This is useful as a starting point
    /// for writing your own scenario file.
    #[clap(long = "print-spec")]
    print_spec: Option<String>,
}

fn find_built_in(name: &str) -> Result<ScenarioSpec, anyhow::Error> {
    built_in_scenarios()
        .into_iter()
        .find(|spec| spec.name == name)
        .with_context(|| {
            format!(
                "built-in scenario with name '{name}' not found, available: {}",
                built_in_scenario_names().join(", ")
            )
        })
}

pub(crate) async fn command(config: Config) -> Result<(), anyhow::Error> {
    if config.list {
        for name in built_in_scenario_names() {
            println!("{name}");
        }
        return Ok(());
    }

    if let Some(name) = config.print_spec {
        println!("{}", find_built_in(&name)?.to_json_string_pretty()?);
        return Ok(());
    }

    let mut scenarios = if config.all {
        built_in_scenarios()
    } else {
        config
            .builtin
            .iter()
            .map(|name| find_built_in(name))
            .collect::<Result<Vec<_>, _>>()?
    };
    if let Some(path) = &config.spec_path {
        scenarios.push(ScenarioSpec::from_path(path)?);
    }
    if scenarios.is_empty() {
        bail!("no scenario given, use --builtin, --spec-path or --all (--list shows built-ins)");
    }

    for spec in scenarios {
        info!(scenario = %spec.name, "running scenario");
        println!("scenario: {}", spec.name);
        let run = spec.run_config(config.values.seed, config.values.random_values);
        let mut session = config.session.session();
        let report = performance_test(&mut session, &run)
            .await
            .with_context(|| format!("scenario '{}' failed", spec.name))?;
        println!("{report}");
    }

    Ok(())
}
