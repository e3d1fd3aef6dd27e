// gkeg/src/cli/doctor.rs
use clap::Args;
use colored::Colorize;
use gkeg_common::config::Config;
use gkeg_common::error::{GkegError, Result};
use gkeg_core::check::diagnose;
use gkeg_core::Installer;

use super::{load_formula, print_header};

#[derive(Args, Debug)]
pub struct Doctor;

impl Doctor {
    pub fn run(&self, config: &Config) -> Result<()> {
        let installer = Installer::new(config.clone(), load_formula(config)?);
        let report = diagnose(&installer.dependency_plan(), config);

        print_header(&format!("Requirements ({})", installer.platform()));
        if report.requirements.is_empty() {
            println!("  none on this platform");
        }
        for req in &report.requirements {
            if req.satisfied {
                println!("  {} {}", "ok".green(), req.name);
            } else {
                println!("  {} {}: {}", "missing".red().bold(), req.name, req.message);
            }
        }

        print_header(&format!(
            "Dependencies under {}",
            config.opt_dir().display()
        ));
        println!("  {} present", report.dependencies.present.len());
        if !report.dependencies.missing.is_empty() {
            println!(
                "  {} {}",
                "missing:".red().bold(),
                report.dependencies.missing.join(", ")
            );
        }

        print_header("Build tools");
        for tool in &report.tools {
            match &tool.path {
                Some(path) => println!("  {} {} ({})", "ok".green(), tool.name, path.display()),
                None => println!("  {} {}", "missing".red().bold(), tool.name),
            }
        }

        if report.is_healthy() {
            println!("{}", "Ready to build.".green().bold());
            Ok(())
        } else {
            Err(GkegError::ValidationError(
                "The build prerequisites are not met".to_string(),
            ))
        }
    }
}
