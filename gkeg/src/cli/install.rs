// gkeg/src/cli/install.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use gkeg_common::config::Config;
use gkeg_common::error::Result;
use gkeg_core::{caveats, InstallOptions, Installer, SystemRunner};
use tracing::instrument;

use super::{load_formula, print_header};

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Build the development branch instead of the release archive
    #[arg(long)]
    head: bool,

    /// Build from a copy of an existing source tree
    #[arg(long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Do not require the managed dependencies to be installed
    #[arg(long)]
    ignore_dependencies: bool,

    /// Keep the build directory after the build finishes
    #[arg(long)]
    keep_tmp: bool,

    /// Run the upstream quickcheck against the installed keg
    #[arg(long)]
    quickcheck: bool,

    /// Check requirements and print the steps without building
    #[arg(long)]
    dry_run: bool,
}

impl InstallArgs {
    fn options(&self) -> InstallOptions {
        InstallOptions {
            head: self.head,
            source_dir: self.source.clone(),
            ignore_dependencies: self.ignore_dependencies,
            keep_tmp: self.keep_tmp,
            quickcheck: self.quickcheck,
            dry_run: self.dry_run,
        }
    }

    #[instrument(skip(self, config), fields(head = self.head, dry_run = self.dry_run))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let formula = load_formula(config)?;
        let installer = Installer::new(config.clone(), formula);
        let opts = self.options();

        print_header(&format!(
            "Installing {} {}",
            installer.formula().name,
            installer.formula().version
        ));
        let mut runner = SystemRunner;
        let outcome = installer.install(&opts, &mut runner).await?;

        let Some(report) = &outcome.report else {
            print_header(&format!("Would build from {}", outcome.origin));
            for (i, step) in outcome.steps.iter().enumerate() {
                println!("{:>3}. {}", i, step);
            }
            println!("Would install to {}", outcome.keg.display());
            return Ok(());
        };

        println!(
            "{} {} ({} steps, {} files copied)",
            "Installed".green().bold(),
            outcome.keg.display(),
            report.completed.len(),
            report.copied
        );
        if outcome.quickcheck_ran {
            println!("{}", "quickcheck passed".green());
        }
        if let Some(text) = caveats(installer.formula(), &outcome.keg) {
            print_header("Caveats");
            print!("{text}");
        }
        Ok(())
    }
}
