// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Host-side tooling for the quark-boot verification chain: module signing,
//! key-module construction and fuse-record enrollment.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use log::error;

pub mod fuses;
pub mod public_key;
pub mod signer;

/// File contents read up front and bounded to an expected size range.
pub struct InputData {
    data: Vec<u8>,
}

impl InputData {
    pub fn new(path: &Path, range: RangeInclusive<usize>, desc: &str) -> io::Result<Self> {
        let data = fs::read(path).map_err(|e| {
            error!("Can not read {} from {}: {}", desc, path.display(), e);
            e
        })?;
        if !range.contains(&data.len()) {
            error!(
                "Invalid size {} of {} from {}, expected {:?}",
                data.len(),
                desc,
                path.display(),
                range
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid {} file size", desc),
            ));
        }
        Ok(InputData { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Zeroize the buffer; for inputs holding key material.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|b| *b = 0);
    }
}

/// Output file with positioned writes.
pub struct OutputFile {
    name: PathBuf,
    file: File,
}

impl OutputFile {
    pub fn new(path: PathBuf) -> io::Result<Self> {
        let file = File::create(&path).map_err(|e| {
            error!("Can not create output file {}: {}", path.display(), e);
            e
        })?;
        Ok(OutputFile { name: path, file })
    }

    pub fn seek_and_write(&mut self, offset: u64, data: &[u8], desc: &str) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset)).map_err(|e| {
            error!("Can not seek output file {}: {}", self.name.display(), e);
            e
        })?;
        self.write(data, desc)
    }

    pub fn write(&mut self, data: &[u8], desc: &str) -> io::Result<()> {
        self.file.write_all(data).map_err(|e| {
            error!(
                "Can not write {} to file {}: {}",
                desc,
                self.name.display(),
                e
            );
            e
        })
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
