// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bus adapter seam between the translation core and guest memory.
//!
//! The block cache and dispatcher never touch RAM/BIOS bytes directly; they
//! go through a [`Bus`] implementation, which also owns the per-page
//! code-presence bitmap and the self-modifying-code invalidate callback.
//! [`SimpleBus`] is a minimal flat RAM+BIOS implementation adequate for
//! exercising and testing the translation core in isolation; a full system
//! bus (DMA, GPU, SPU, peripherals) is out of scope here.

use crate::core::cpu::PHYS_MASK;
use crate::core::error::{EmulatorError, Result};

/// Adapter the translation core uses to read guest code and manage the
/// per-page code-presence bitmap that drives self-modifying-code invalidation.
pub trait Bus {
    /// Read one instruction word. `address` is a virtual address; the
    /// implementation is responsible for segment folding and mirroring.
    fn read_word(&self, address: u32) -> Result<u32>;

    /// Whether code at `address` is eligible for block caching at all
    /// (typically: RAM and BIOS, not scratchpad or hardware registers).
    fn is_cacheable(&self, address: u32) -> bool;

    /// Whether `address` falls in the mirrored RAM region the page map covers.
    fn is_ram(&self, address: u32) -> bool;

    /// Fold mirrors/segments down to a canonical physical address.
    fn unmirror(&self, address: u32) -> u32;

    /// Mark the RAM page containing `address` as holding cached code.
    fn set_code_page(&mut self, address: u32);

    /// Clear every page's code-presence flag (used on a full cache reset).
    fn clear_code_page_flags(&mut self);

    /// Register the callback the bus invokes when a write lands on a page
    /// flagged as holding cached code. The callback receives a RAM page index.
    fn register_invalidate_callback(&mut self, callback: Box<dyn FnMut(usize)>);

    /// Whether an external interrupt line is currently asserted. A full
    /// system bus would derive this from its interrupt controller; here it
    /// is a settable flag for testing interrupt dispatch in isolation.
    fn has_interrupt_line_asserted(&self) -> bool;
}

/// Minimal flat RAM + BIOS bus: enough address space to discover, compile,
/// execute, and invalidate blocks without a full system around it.
pub struct SimpleBus {
    ram: Vec<u8>,
    bios: Vec<u8>,
    page_size: u32,
    code_pages: Vec<bool>,
    invalidate_callback: Option<Box<dyn FnMut(usize)>>,
    interrupt_asserted: bool,
}

const BIOS_BASE: u32 = 0x1FC0_0000;
const BIOS_SIZE: usize = 512 * 1024;

impl SimpleBus {
    /// Build a bus with `ram_size` bytes of RAM (must be a multiple of
    /// `page_size`) and an empty BIOS image, using the PSX's 4 KiB pages.
    pub fn with_ram_size(ram_size: usize) -> Self {
        Self::with_geometry(ram_size, 0x1000)
    }

    /// As [`Self::with_ram_size`] but with an explicit page size, matching
    /// whatever [`crate::core::config::CacheConfig`] specifies.
    pub fn with_geometry(ram_size: usize, page_size: u32) -> Self {
        let page_count = ram_size.div_ceil(page_size as usize);
        Self {
            ram: vec![0u8; ram_size],
            bios: vec![0u8; BIOS_SIZE],
            page_size,
            code_pages: vec![false; page_count],
            invalidate_callback: None,
            interrupt_asserted: false,
        }
    }

    /// Copy a BIOS image in at its base address. Errors if the image is the
    /// wrong size.
    pub fn load_bios(&mut self, image: &[u8]) -> Result<()> {
        if image.len() != BIOS_SIZE {
            return Err(EmulatorError::InvalidBiosSize {
                expected: BIOS_SIZE,
                got: image.len(),
            });
        }
        self.bios.copy_from_slice(image);
        Ok(())
    }

    /// Write raw bytes into RAM starting at `offset`, for test setup.
    pub fn write_ram_slice(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .ok_or(EmulatorError::InvalidMemoryAccess { address: offset as u32 })?;
        if end > self.ram.len() {
            return Err(EmulatorError::InvalidMemoryAccess {
                address: offset as u32,
            });
        }
        self.ram[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Simulate a guest store to RAM, firing the invalidate callback if the
    /// written page was flagged as holding cached code.
    pub fn store_word(&mut self, address: u32, value: u32) -> Result<()> {
        let phys = self.unmirror(address);
        let offset = phys as usize;
        if offset % 4 != 0 {
            return Err(EmulatorError::UnalignedAccess { address, size: 4 });
        }
        if offset + 4 > self.ram.len() {
            return Err(EmulatorError::InvalidMemoryAccess { address });
        }
        self.ram[offset..offset + 4].copy_from_slice(&value.to_le_bytes());

        let page = offset / self.page_size as usize;
        if page < self.code_pages.len() && self.code_pages[page] {
            self.code_pages[page] = false;
            if let Some(callback) = self.invalidate_callback.as_mut() {
                callback(page);
            }
        }
        Ok(())
    }

    /// Assert or clear the simulated interrupt line, for testing
    /// [`crate::core::cpu::CpuCore::has_pending_interrupt`].
    pub fn set_interrupt_line(&mut self, asserted: bool) {
        self.interrupt_asserted = asserted;
    }

    fn page_index(&self, phys: u32) -> usize {
        (phys as usize) / self.page_size as usize
    }
}

impl Bus for SimpleBus {
    fn read_word(&self, address: u32) -> Result<u32> {
        let phys = self.unmirror(address);
        if phys % 4 != 0 {
            return Err(EmulatorError::UnalignedAccess { address, size: 4 });
        }
        let offset = phys as usize;
        if offset + 4 <= self.ram.len() {
            let bytes = self.ram[offset..offset + 4].try_into().unwrap();
            return Ok(u32::from_le_bytes(bytes));
        }
        if phys >= BIOS_BASE {
            let bios_offset = (phys - BIOS_BASE) as usize;
            if bios_offset + 4 <= self.bios.len() {
                let bytes = self.bios[bios_offset..bios_offset + 4].try_into().unwrap();
                return Ok(u32::from_le_bytes(bytes));
            }
        }
        Err(EmulatorError::InvalidMemoryAccess { address })
    }

    fn is_cacheable(&self, address: u32) -> bool {
        let phys = self.unmirror(address);
        (phys as usize) < self.ram.len()
            || (phys >= BIOS_BASE && (phys - BIOS_BASE) < BIOS_SIZE as u32)
    }

    fn is_ram(&self, address: u32) -> bool {
        let phys = self.unmirror(address);
        (phys as usize) < self.ram.len()
    }

    fn unmirror(&self, address: u32) -> u32 {
        address & PHYS_MASK
    }

    fn set_code_page(&mut self, address: u32) {
        let phys = self.unmirror(address);
        let page = self.page_index(phys);
        if page < self.code_pages.len() {
            self.code_pages[page] = true;
        }
    }

    fn clear_code_page_flags(&mut self) {
        for flag in self.code_pages.iter_mut() {
            *flag = false;
        }
    }

    fn register_invalidate_callback(&mut self, callback: Box<dyn FnMut(usize)>) {
        self.invalidate_callback = Some(callback);
    }

    fn has_interrupt_line_asserted(&self) -> bool {
        self.interrupt_asserted
    }
}
