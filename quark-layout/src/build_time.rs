// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

/*
    Flash Layout:
                  Binary                       Address
            0x00000000 -> +--------------+ <-  0xFF800000
           (0x00080000)   |    STAGE1    |
            0x00080000 -> +--------------+ <-  0xFF880000
           (0x00300000)   |    STAGE2    |
            0x00380000 -> +--------------+ <-  0xFFB80000
           (0x00300000)   |   RECOVERY   |
            0x00680000 -> +--------------+ <-  0xFFE80000
           (0x00020000)   |  NV STORAGE  |
            0x006A0000 -> +--------------+ <-  0xFFEA0000
           (0x00158000)   |   PLATFORM   |
            0x007F8000 -> +--------------+ <-  0xFFFF8000
           (0x00008000)   |  KEY MODULE  |
            0x00800000 -> +--------------+ <- 0x100000000 (4G)
*/

// Flash part
pub const FLASH_SIZE: u32 = 0x80_0000;
pub const FLASH_BASE: u32 = 0xFF80_0000; // 0xFFFFFFFF - FLASH_SIZE + 1

// Regions, as offsets into the part
pub const STAGE1_OFFSET: u32 = 0x0;
pub const STAGE1_SIZE: u32 = 0x8_0000;
pub const STAGE2_OFFSET: u32 = 0x8_0000; // STAGE1_OFFSET + STAGE1_SIZE
pub const STAGE2_SIZE: u32 = 0x30_0000;
pub const RECOVERY_OFFSET: u32 = 0x38_0000; // STAGE2_OFFSET + STAGE2_SIZE
pub const RECOVERY_SIZE: u32 = 0x30_0000;
pub const NV_STORAGE_OFFSET: u32 = 0x68_0000; // RECOVERY_OFFSET + RECOVERY_SIZE
pub const NV_STORAGE_SIZE: u32 = 0x2_0000;
pub const PLATFORM_DATA_OFFSET: u32 = 0x6A_0000; // NV_STORAGE_OFFSET + NV_STORAGE_SIZE
pub const PLATFORM_DATA_SIZE: u32 = 0x15_8000;
pub const KEY_MODULE_OFFSET: u32 = 0x7F_8000; // PLATFORM_DATA_OFFSET + PLATFORM_DATA_SIZE
pub const KEY_MODULE_SIZE: u32 = 0x8000;

// Regions, memory mapped
pub const STAGE1_BASE: u32 = 0xFF80_0000; // FLASH_BASE + STAGE1_OFFSET
pub const STAGE2_BASE: u32 = 0xFF88_0000; // FLASH_BASE + STAGE2_OFFSET
pub const RECOVERY_BASE: u32 = 0xFFB8_0000; // FLASH_BASE + RECOVERY_OFFSET
pub const NV_STORAGE_BASE: u32 = 0xFFE8_0000; // FLASH_BASE + NV_STORAGE_OFFSET
pub const PLATFORM_DATA_BASE: u32 = 0xFFEA_0000; // FLASH_BASE + PLATFORM_DATA_OFFSET
pub const KEY_MODULE_BASE: u32 = 0xFFFF_8000; // FLASH_BASE + KEY_MODULE_OFFSET

// On-package eSRAM, used for the pre-memory scratch heap
pub const ESRAM_BASE: u32 = 0x8000_0000;
pub const ESRAM_SIZE: u32 = 0x8_0000;
pub const SCRATCH_HEAP_BASE: u32 = 0x8000_0000; // ESRAM_BASE
pub const SCRATCH_HEAP_SIZE: u32 = 0x1400;

// Masked BootROM validation services. The ROM publishes a fixed table of
// function pointers; these are the two entries the verification chain calls.
pub const BOOTROM_VALIDATE_MODULE_ENTRYPOINT_ADDRESS: usize = 0xFFFE_1040;
pub const BOOTROM_VALIDATE_KEY_ENTRYPOINT_ADDRESS: usize = 0xFFFE_1044;
