// gkeg/src/cli/info.rs
use std::path::Path;

use clap::Args;
use colored::Colorize;
use gkeg_common::config::Config;
use gkeg_common::error::Result;
use gkeg_common::Formula;
use gkeg_core::{InstallOptions, Installer};
use serde::Serialize;

use super::load_formula;

#[derive(Serialize)]
struct InfoJson<'a> {
    formula: &'a Formula,
    keg: &'a Path,
    installed: bool,
}

#[derive(Args, Debug)]
pub struct Info {
    /// Print the formula as JSON
    #[arg(long)]
    pub json: bool,
}

impl Info {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installer = Installer::new(config.clone(), load_formula(config)?);
        let formula = installer.formula();
        let keg = installer.keg_path(&installer.origin(&InstallOptions::default())?);

        if self.json {
            let value = InfoJson {
                formula,
                keg: &keg,
                installed: keg.is_dir(),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!(
            "{}: stable {}{}",
            formula.name.green().bold(),
            formula.version,
            if formula.head.is_some() { ", HEAD" } else { "" }
        );
        println!("{}", formula.desc);
        println!("{}", formula.homepage.cyan());
        println!(
            "{} ({})",
            keg.display(),
            if keg.is_dir() {
                "installed".green()
            } else {
                "not installed".yellow()
            }
        );
        println!("{} {}", "From:".bold(), formula.url);
        if let Some(head) = &formula.head {
            println!("{} {}", "Head:".bold(), head);
        }

        println!("{}", "Resources:".bold());
        for resource in &formula.resources {
            let cached = gkeg_net::resource_cache_path(resource, config).is_file();
            println!(
                "  {} {}{}",
                resource.name,
                resource.url,
                if cached { " (cached)" } else { "" }
            );
        }

        println!("{}", "Patches:".bold());
        for patch in &formula.patches {
            println!("  {} ({})", patch.name, patch.touched_files().join(", "));
        }

        let dep_plan = installer.dependency_plan();
        let build: Vec<_> = dep_plan.build_only().iter().map(|e| e.name.as_str()).collect();
        let runtime: Vec<_> = dep_plan.runtime().iter().map(|e| e.name.as_str()).collect();
        println!("{} {}", "Build:".bold(), build.join(", "));
        println!("{} {}", "Required:".bold(), runtime.join(", "));
        Ok(())
    }
}
