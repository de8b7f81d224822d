// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

#![no_std]

//! Build-time layout of the SPI flash part and the fixed BootROM service
//! addresses consumed by the secure-boot verification chain.
//!
//! Every region below is located by the flash map at build time; nothing is
//! discovered at runtime. Firmware code slices the memory-mapped flash with
//! these constants and hands the slices to `quark-boot`.

pub mod build_time;
