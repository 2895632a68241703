//! virtio-mmio block device (register stub).
//!
//! Implements the virtio 1.x MMIO register layout for a block device
//! (device id 2) offering only `VIRTIO_F_VERSION_1`. Queue notification is
//! accepted and ignored; no request processing is performed.

use std::sync::Mutex;

use crate::soc::lock;

/// "virt" magic value.
const MAGIC: u32 = 0x7472_6976;
/// virtio-mmio version 2 (the virtio 1.x layout).
const VERSION: u32 = 2;
/// Block device id.
const DEVICE_ID: u32 = 2;
/// Vendor id ("QEMU").
const VENDOR_ID: u32 = 0x554D_4551;
/// Device feature word 1 (bits 63:32): VIRTIO_F_VERSION_1.
const DEVICE_FEATURES_HI: u32 = 1;

#[derive(Debug, Default)]
struct VirtQueue {
    num_max: u32,
    num: u32,
    ready: u32,
    desc: u64,
    driver: u64,
    device: u64,
}

#[derive(Debug, Default)]
struct VirtioState {
    dev_feat_sel: u32,
    dri_feat: [u32; 2],
    dri_feat_sel: u32,
    queue_sel: u32,
    queue: VirtQueue,
    int_status: u32,
    status: u32,
    config_gen: u32,
}

/// The virtio-mmio block device.
#[derive(Debug, Default)]
pub struct VirtioBlk {
    state: Mutex<VirtioState>,
}

impl VirtioBlk {
    /// Creates the device in its reset state.
    pub fn new() -> Self {
        Self::default()
    }

    /// MMIO read of one 32-bit register.
    pub fn load(&self, offset: u64) -> u32 {
        let st = lock(&self.state);
        match offset {
            0x00 => MAGIC,
            0x04 => VERSION,
            0x08 => DEVICE_ID,
            0x0C => VENDOR_ID,
            0x10 => {
                if st.dev_feat_sel == 1 {
                    DEVICE_FEATURES_HI
                } else {
                    0
                }
            }
            0x14 => st.dev_feat_sel,
            0x20 => *st.dri_feat.get(st.dri_feat_sel as usize).unwrap_or(&0),
            0x24 => st.dri_feat_sel,
            0x30 => st.queue_sel,
            0x34 => st.queue.num_max,
            0x38 => st.queue.num,
            0x44 => st.queue.ready,
            0x60 => st.int_status,
            0x70 => st.status,
            0x80 => st.queue.desc as u32,
            0x84 => (st.queue.desc >> 32) as u32,
            0x90 => st.queue.driver as u32,
            0x94 => (st.queue.driver >> 32) as u32,
            0xA0 => st.queue.device as u32,
            0xA4 => (st.queue.device >> 32) as u32,
            0xFC => st.config_gen,
            // Device-specific config (block geometry) reads zero.
            _ => 0,
        }
    }

    /// MMIO write of one 32-bit register.
    pub fn store(&self, offset: u64, val: u32) {
        let mut st = lock(&self.state);
        match offset {
            0x14 => st.dev_feat_sel = val,
            0x20 => {
                let sel = st.dri_feat_sel as usize;
                if sel < st.dri_feat.len() {
                    st.dri_feat[sel] = val;
                }
            }
            0x24 => st.dri_feat_sel = val,
            0x30 => st.queue_sel = val,
            0x38 => st.queue.num = val,
            0x44 => st.queue.ready = val,
            0x50 => {} // queue notify: IO is not implemented
            0x64 => st.int_status &= !val,
            0x70 => st.status = val,
            0x80 => st.queue.desc = (st.queue.desc & !0xFFFF_FFFF) | val as u64,
            0x84 => st.queue.desc = (st.queue.desc & 0xFFFF_FFFF) | ((val as u64) << 32),
            0x90 => st.queue.driver = (st.queue.driver & !0xFFFF_FFFF) | val as u64,
            0x94 => st.queue.driver = (st.queue.driver & 0xFFFF_FFFF) | ((val as u64) << 32),
            0xA0 => st.queue.device = (st.queue.device & !0xFFFF_FFFF) | val as u64,
            0xA4 => st.queue.device = (st.queue.device & 0xFFFF_FFFF) | ((val as u64) << 32),
            _ => {}
        }
    }
}
