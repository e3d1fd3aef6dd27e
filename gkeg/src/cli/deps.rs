// gkeg/src/cli/deps.rs
use clap::Args;
use colored::Colorize;
use gkeg_common::config::Config;
use gkeg_common::dependency::{plan, DependencyTag, PlannedDependency, Provision};
use gkeg_common::error::Result;
use gkeg_common::HostPlatform;
use prettytable::{format, Cell, Row, Table};

use super::load_formula;

#[derive(Args, Debug)]
pub struct Deps {
    /// Plan for this platform instead of the current host (macos, linux, other)
    #[arg(long)]
    pub platform: Option<HostPlatform>,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

fn kind_label(tags: DependencyTag) -> &'static str {
    if tags.is_build_only() {
        "build"
    } else if tags.contains(DependencyTag::BUILD) {
        "build, runtime"
    } else {
        "runtime"
    }
}

fn provision_label(provision: Provision) -> &'static str {
    match provision {
        Provision::Formula => "formula",
        Provision::Host => "host",
        Provision::External => "external",
    }
}

fn row(dep: &PlannedDependency) -> Row {
    let name = match dep.provision {
        Provision::Formula => dep.name.normal(),
        Provision::Host => dep.name.dimmed(),
        Provision::External => dep.name.yellow(),
    };
    Row::new(vec![
        Cell::new(&name.to_string()),
        Cell::new(kind_label(dep.tags)),
        Cell::new(provision_label(dep.provision)),
    ])
}

impl Deps {
    pub fn run(&self, config: &Config) -> Result<()> {
        let formula = load_formula(config)?;
        let platform = self.platform.unwrap_or_else(HostPlatform::current);
        let dep_plan = plan(&formula, platform);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&dep_plan)?);
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Needed for").style_spec("b"),
            Cell::new("Provided by").style_spec("b"),
        ]));
        for dep in &dep_plan.entries {
            table.add_row(row(dep));
        }
        table.printstd();
        println!(
            "{} dependencies for {} on {} ({} managed, {} host-provided, {} external)",
            dep_plan.entries.len(),
            formula.name,
            platform,
            dep_plan.managed().len(),
            dep_plan.host_provided().len(),
            dep_plan.external().len()
        );
        Ok(())
    }
}
