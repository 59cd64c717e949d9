//! Command line tool to generate a node's local party identity, or a
//! batch of test identities for a local multi-node setup.
#![forbid(unsafe_code)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct KeygenService {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a single party identity and print it.
    Identity {
        /// Number of decimal digits in the generated identity.
        #[clap(short, long, default_value_t = 18)]
        digits: u32,
    },
    /// Generate identities for a number of test parties, writing a
    /// `[tss] pubkey = "..."` config fragment for each as separate
    /// files under `dir`.
    TestParties {
        /// Force overwrite if any file exists.
        #[clap(short, long)]
        force: bool,

        /// Number of parties to generate.
        #[clap(short, long)]
        num: u8,

        /// Directory to write `party-N.toml` fragments into.
        dir: PathBuf,
    },
}

fn random_identity(digits: u32) -> String {
    let mut rng = rand::thread_rng();
    let first: u8 = rng.gen_range(1..=9);
    let mut id = first.to_string();
    for _ in 1..digits {
        let digit: u8 = rng.gen_range(0..=9);
        id.push((b'0' + digit) as char);
    }
    id
}

fn run() -> Result<()> {
    let args = KeygenService::parse();
    match args.cmd {
        Command::Identity { digits } => {
            println!("{}", random_identity(digits));
        }
        Command::TestParties { force, num, dir } => {
            fs::create_dir_all(&dir)?;
            for i in 0..num {
                let path = dir.join(format!("party-{i}.toml"));
                if path.exists() && !force {
                    bail!(
                        "file {} already exists, use --force to overwrite",
                        path.display()
                    );
                }
                let pubkey = random_identity(18);
                fs::write(
                    &path,
                    format!("[tss]\npubkey = \"{pubkey}\"\n"),
                )?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    run()
}
