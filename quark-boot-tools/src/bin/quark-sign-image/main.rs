// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use std::mem::size_of;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::trace;
use ring::signature::RsaKeyPair;

use quark_boot::csh::CshHeader;
use quark_boot_tools::signer::{
    oem_key_record, ModuleSigner, DEFAULT_IMAGE_HEADER_SIZE, KEY_MODULE_HEADER_SIZE,
};
use quark_boot_tools::{public_key, InputData, OutputFile};

/// Sign a flash module with an RSA-2048 key.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Raw module body, or a DER public key with --key-module
    #[arg(short, long)]
    input: PathBuf,

    /// Signed module output
    #[arg(short, long)]
    output: PathBuf,

    /// Header region size; the body starts at this offset
    #[arg(short, long)]
    body_offset: Option<u32>,

    /// Security version number
    #[arg(short, long, default_value_t = 0)]
    svn: u32,

    /// Security version number index (0-15)
    #[arg(short = 'x', long, default_value_t = 0)]
    svn_index: u32,

    /// PKCS#8 DER private signing key
    #[arg(short, long)]
    key: PathBuf,

    /// Treat the input as an OEM public key and emit a signed key module
    #[arg(short = 'c', long)]
    key_module: bool,

    /// Print the layout of the signed module
    #[arg(short, long)]
    layout: bool,

    /// Suppress log output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "off" } else { "info" };
    env_logger::init_from_env(Env::default().filter_or("QUARK_LOG_LEVEL", default_level));

    trace!(
        "quark-sign-image {} -> {} svn {}:{}",
        args.input.display(),
        args.output.display(),
        args.svn_index,
        args.svn
    );

    let mut private = InputData::new(&args.key, 0..=1024 * 1024, "private key")?;
    let key = RsaKeyPair::from_pkcs8(private.as_bytes())
        .map_err(|e| anyhow::anyhow!("can not load RSA private key: {e}"))?;

    let input = InputData::new(&args.input, 1..=64 * 1024 * 1024, "module body")?;

    let (body, header_size) = if args.key_module {
        let (modulus, exponent) = public_key::rsa_components(input.as_bytes())
            .context("parse OEM public key")?;
        let record = oem_key_record(&modulus, &exponent)?;
        (record, args.body_offset.unwrap_or(KEY_MODULE_HEADER_SIZE))
    } else {
        (
            input.as_bytes().to_vec(),
            args.body_offset.unwrap_or(DEFAULT_IMAGE_HEADER_SIZE),
        )
    };

    let mut signer = ModuleSigner::new(&body, key, header_size)?;
    let header = signer.build_header(args.svn_index, args.svn, 0)?;
    let signed_module = signer.sign(header)?;

    // Clear the private key memory.
    private.clear();

    if args.layout {
        print_layout(&header, signed_module.len());
    }

    let mut output = OutputFile::new(args.output)?;
    output.seek_and_write(0, signed_module, "signed module")?;
    output.flush()?;

    Ok(())
}

fn print_layout(header: &CshHeader, total: usize) {
    println!("{:<12} {:>10} {:>10}", "region", "offset", "size");
    println!(
        "{:<12} {:>10} {:>10}",
        "header",
        0,
        size_of::<CshHeader>()
    );
    println!(
        "{:<12} {:>10} {:>10}",
        "padding",
        size_of::<CshHeader>(),
        header.header_size as usize - size_of::<CshHeader>()
    );
    println!(
        "{:<12} {:>10} {:>10}",
        "body",
        header.header_size,
        header.module_size - header.header_size
    );
    println!(
        "{:<12} {:>10} {:>10}",
        "key",
        header.module_size,
        header.key_size
    );
    println!(
        "{:<12} {:>10} {:>10}",
        "signature",
        header.module_size + header.key_size,
        header.signature_size
    );
    println!("{:<12} {:>10} {:>10}", "total", 0, total);
}
