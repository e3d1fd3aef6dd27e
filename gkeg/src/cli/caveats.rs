// gkeg/src/cli/caveats.rs
use clap::Args;
use gkeg_common::config::Config;
use gkeg_common::error::Result;
use gkeg_core::{caveats, InstallOptions, Installer};

use super::load_formula;

#[derive(Args, Debug)]
pub struct Caveats;

impl Caveats {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installer = Installer::new(config.clone(), load_formula(config)?);
        let origin = installer.origin(&InstallOptions::default())?;
        let keg = installer.keg_path(&origin);
        match caveats(installer.formula(), &keg) {
            Some(text) => print!("{text}"),
            None => println!("{} has no caveats.", installer.formula().name),
        }
        Ok(())
    }
}
