// gkeg/src/cli/steps.rs
use clap::Args;
use gkeg_common::config::Config;
use gkeg_common::error::Result;
use gkeg_core::{InstallOptions, Installer};

use super::{load_formula, print_header};

#[derive(Args, Debug)]
pub struct Steps {
    /// Plan a build of the development branch
    #[arg(long)]
    pub head: bool,
}

impl Steps {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installer = Installer::new(config.clone(), load_formula(config)?);
        let opts = InstallOptions {
            head: self.head,
            ..Default::default()
        };
        let origin = installer.origin(&opts)?;
        let steps = installer.preview_steps(&opts)?;

        print_header(&format!("Build steps for {origin}"));
        for (i, step) in steps.iter().enumerate() {
            println!("{:>3}. {}", i, step);
        }
        Ok(())
    }
}
