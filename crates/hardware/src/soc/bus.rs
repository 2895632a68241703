//! Physical memory bus.
//!
//! Routes addressed reads and writes to RAM or a device. The device set is
//! fixed for this platform, so routing is a straight match on address
//! ranges rather than a registry of handlers. RAM is the common fast path.
//!
//! Accesses below `0x1000` or past the end of RAM fault; unclaimed holes
//! inside the device window read zero and drop writes.

use crate::common::MemFault;
use crate::common::constants::{
    BOOT_ROM, BOOT_ROM_BASE, BOOT_ROM_LEN, DTB_BASE, MAX_DTB_SIZE, MSWI_BASE, MSWI_SIZE,
    MTIMER_BASE, MTIMER_SIZE, PLIC_BASE, PLIC_SIZE, RAM_BASE, RESERVED_LOW_LIMIT, UART_BASE,
    UART_SIZE, VIRTIO_BLK_BASE, VIRTIO_BLK_SIZE,
};
use crate::soc::Machine;
use crate::soc::devices::plic::PLIC_SRC_UART;

#[inline]
fn in_range(addr: u64, base: u64, size: u64) -> bool {
    addr >= base && addr < base + size
}

impl Machine {
    /// Physical load of `width` bytes (1, 2, 4, or 8) at `addr`.
    ///
    /// Misaligned RAM accesses are permitted (the host performs an
    /// unaligned load of the full width).
    pub fn phys_load(&self, addr: u64, width: usize) -> Result<u64, MemFault> {
        let end = addr.checked_add(width as u64).ok_or(MemFault::Access)?;
        if addr < RESERVED_LOW_LIMIT {
            return Err(MemFault::Access);
        }
        if addr >= RAM_BASE {
            if end <= self.ram_end() {
                return Ok(self.ram.load((addr - RAM_BASE) as usize, width));
            }
            return Err(MemFault::Access);
        }

        if in_range(addr, BOOT_ROM_BASE, BOOT_ROM_LEN) {
            let mut val = 0u64;
            for i in 0..width as u64 {
                let off = addr - BOOT_ROM_BASE + i;
                let byte = *BOOT_ROM.get(off as usize).unwrap_or(&0);
                val |= (byte as u64) << (8 * i);
            }
            return Ok(val);
        }
        if in_range(addr, DTB_BASE, MAX_DTB_SIZE) {
            let off = (addr - DTB_BASE) as usize;
            if off + width <= self.dtb.len() {
                return Ok(self.dtb.load(off, width));
            }
            return Ok(0);
        }
        if in_range(addr, MSWI_BASE, MSWI_SIZE) {
            return Ok(self.clint.mswi_load(addr - MSWI_BASE));
        }
        if in_range(addr, MTIMER_BASE, MTIMER_SIZE) {
            return Ok(self.clint.mtimer_load(addr - MTIMER_BASE));
        }
        if in_range(addr, PLIC_BASE, PLIC_SIZE) {
            return Ok(self.plic.load(addr - PLIC_BASE));
        }
        if in_range(addr, UART_BASE, UART_SIZE) {
            return Ok(self.uart.load(addr - UART_BASE) as u64);
        }
        if in_range(addr, VIRTIO_BLK_BASE, VIRTIO_BLK_SIZE) {
            return Ok(self.vblk.load(addr - VIRTIO_BLK_BASE) as u64);
        }
        Ok(0)
    }

    /// Physical store of the low `width` bytes of `val` at `addr`.
    pub fn phys_store(&self, addr: u64, width: usize, val: u64) -> Result<(), MemFault> {
        let end = addr.checked_add(width as u64).ok_or(MemFault::Access)?;
        if addr < RESERVED_LOW_LIMIT {
            return Err(MemFault::Access);
        }
        if addr >= RAM_BASE {
            if end <= self.ram_end() {
                self.ram.store((addr - RAM_BASE) as usize, width, val);
                return Ok(());
            }
            return Err(MemFault::Access);
        }

        if in_range(addr, BOOT_ROM_BASE, BOOT_ROM_LEN) {
            return Ok(()); // ROM
        }
        if in_range(addr, DTB_BASE, MAX_DTB_SIZE) {
            let off = (addr - DTB_BASE) as usize;
            if off + width <= self.dtb.len() {
                self.dtb.store(off, width, val);
            }
            return Ok(());
        }
        if in_range(addr, MSWI_BASE, MSWI_SIZE) {
            self.clint.mswi_store(addr - MSWI_BASE, val, &self.lines);
            return Ok(());
        }
        if in_range(addr, MTIMER_BASE, MTIMER_SIZE) {
            self.clint.mtimer_store(addr - MTIMER_BASE, val, &self.lines);
            return Ok(());
        }
        if in_range(addr, PLIC_BASE, PLIC_SIZE) {
            self.plic.store(addr - PLIC_BASE, val, &self.lines);
            return Ok(());
        }
        if in_range(addr, UART_BASE, UART_SIZE) {
            if self.uart.store(addr - UART_BASE, val as u8) {
                self.plic.raise(PLIC_SRC_UART, &self.lines);
            }
            return Ok(());
        }
        if in_range(addr, VIRTIO_BLK_BASE, VIRTIO_BLK_SIZE) {
            self.vblk.store(addr - VIRTIO_BLK_BASE, val as u32);
            return Ok(());
        }
        Ok(())
    }

    /// Copies a binary blob into physical memory (RAM or the DTB buffer).
    ///
    /// Returns `false` when the blob does not fit its target region.
    pub fn load_blob(&self, addr: u64, data: &[u8]) -> bool {
        if addr >= RAM_BASE {
            let off = (addr - RAM_BASE) as usize;
            if off + data.len() <= self.ram.len() {
                self.ram.write_slice(off, data);
                return true;
            }
            return false;
        }
        if in_range(addr, DTB_BASE, MAX_DTB_SIZE) {
            let off = (addr - DTB_BASE) as usize;
            if off + data.len() <= self.dtb.len() {
                self.dtb.write_slice(off, data);
                return true;
            }
        }
        false
    }
}
