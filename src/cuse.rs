//! The character-device method contract presented to the host kernel-proxy
//! runtime, grounded in the `vm_open`/`vm_close`/`vm_read`/`vm_write`/
//! `vm_ioctl`/`vm_poll` callback set both `dev_midi.c` and
//! `dev_oss_sequencer.c` register with the CUSE layer.

/// Mirrors the reference's `CUSE_ERR_*` return codes. A device implementation
/// maps `crate::error::Error` onto these at the boundary; callers further up
/// the stack only ever see `crate::error::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuseStatus {
    Success,
    Busy,
    Invalid,
    NoMemory,
    WouldBlock,
}

/// Poll readiness bitmask, mirroring `CUSE_POLL_READ`/`CUSE_POLL_WRITE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollMask {
    pub readable: bool,
    pub writable: bool,
}

/// A single open handle on a character device. Every method corresponds 1:1
/// to one of the reference's `cuse_methods` callbacks; `self` here plays the
/// role of the `struct cuse_dev *` + private-data pair the C side threads
/// through every call.
pub trait CharDeviceOps: Send {
    /// Always fails in both reference devices: these are write-only control
    /// devices. Kept as an explicit operation (not an omission) so the
    /// contract documents the read-side behavior rather than leaving it
    /// implicit.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CuseStatus> {
        let _ = buf;
        Err(CuseStatus::Invalid)
    }

    /// Consumes `data`, returning the number of bytes accepted. A short
    /// return is only valid at a natural record boundary; partial records
    /// must still consume a full record's worth of bytes once started.
    fn write(&mut self, data: &[u8]) -> Result<usize, CuseStatus>;

    /// `cmd` is the raw ioctl request number; `data_in`/`data_out` mirror the
    /// `IOC_IN`/`IOC_OUT` copy-in/copy-out buffers the reference populates
    /// before/after the `switch (cmd)` dispatch.
    fn ioctl(&mut self, cmd: u32, data_in: &[u8], data_out: &mut [u8]) -> Result<usize, CuseStatus>;

    fn poll(&self) -> PollMask;
}

/// Constructs and destroys handles for a named device, mirroring
/// `vm_open`/`vm_close` and the backend-instantiation/teardown they perform.
pub trait CharDevice: Send + Sync {
    type Handle: CharDeviceOps;

    fn open(&self) -> Result<Self::Handle, CuseStatus>;
}
