// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use quark_boot::fuse::SVN_INDEX_COUNT;
use quark_boot_tools::fuses::FuseRecord;
use quark_boot_tools::{public_key, InputData};

/// Compute the fuse record for a root public key.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// DER SubjectPublicKeyInfo of the root key
    #[arg(short, long)]
    key: PathBuf,

    /// JSON fuse record output
    #[arg(short, long)]
    output: PathBuf,

    /// SVN floor assignments as index:value, repeatable
    #[arg(long = "svn-floor", value_parser = parse_floor)]
    svn_floor: Vec<(u32, u32)>,
}

fn parse_floor(arg: &str) -> Result<(u32, u32), String> {
    let (index, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected index:value, got `{arg}`"))?;
    let index = index
        .parse::<u32>()
        .map_err(|e| format!("invalid index: {e}"))?;
    let value = value
        .parse::<u32>()
        .map_err(|e| format!("invalid value: {e}"))?;
    if index as usize >= SVN_INDEX_COUNT {
        return Err(format!("index {index} out of range 0-{}", SVN_INDEX_COUNT - 1));
    }
    Ok((index, value))
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init_from_env(Env::default().filter_or("QUARK_LOG_LEVEL", "info"));

    let key_data = InputData::new(&args.key, 1..=1024 * 1024, "public key")?;
    let (modulus, exponent) =
        public_key::rsa_components(key_data.as_bytes()).context("parse root public key")?;

    let mut floors = [0u32; SVN_INDEX_COUNT];
    for (index, value) in &args.svn_floor {
        if floors[*index as usize] != 0 {
            bail!("duplicate SVN floor for index {index}");
        }
        floors[*index as usize] = *value;
    }

    let record = FuseRecord::from_public_key(&modulus, &exponent, floors)?;
    fs::write(&args.output, record.to_json()?).context("write fuse record")?;
    info!(
        "fuse record for {} written to {}",
        args.key.display(),
        args.output.display()
    );

    Ok(())
}
