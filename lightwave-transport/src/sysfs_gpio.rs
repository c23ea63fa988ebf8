//! Linux sysfs GPIO transmitter
//!
//! Drives the radio's data line through `/sys/class/gpio/gpioN/value`.
//!
//! ```text
//! /sys/class/gpio/
//!   export          <- "22" creates gpio22/
//!   unexport        <- "22" removes it again
//!   gpio22/
//!     direction     <- "low" / "high" = output at the idle level
//!     value         <- "1" / "0" per pulse
//! ```
//!
//! sysfs writes cost a few microseconds each, well inside the 140 us tick.

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::pacing;
use crate::types::{BackendKind, CancelToken, TransmitterInfo};
use crate::waveform::{Pulse, TxParams, Waveform};
use crate::Transmitter;

/// Default sysfs GPIO class directory
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

const EXPORT_FILE: &str = "export";
const UNEXPORT_FILE: &str = "unexport";
const DIRECTION_FILE: &str = "direction";
const VALUE_FILE: &str = "value";

/// How long to wait for udev to hand over a freshly exported pin
const EXPORT_SETTLE: Duration = Duration::from_millis(500);

/// Transmitter backed by a sysfs GPIO line
pub struct SysfsGpioTransmitter {
    info: TransmitterInfo,
    root: PathBuf,
    pin_dir: PathBuf,
    mask: u32,
    /// Pin was exported by us and is unexported on close
    exported: bool,
    previous_direction: String,
    /// Resting level of the line; high for an active-low transmitter
    idle_high: bool,
    realtime: bool,
    timeout: Option<Duration>,
    value: Mutex<Option<File>>,
    closed: AtomicBool,
}

impl SysfsGpioTransmitter {
    /// Claim the pin under [`SYSFS_GPIO_ROOT`]
    pub fn open(params: &TxParams) -> Result<Self, TransportError> {
        Self::open_at(SYSFS_GPIO_ROOT, params)
    }

    /// Claim the pin under an arbitrary GPIO class directory
    pub fn open_at(root: impl AsRef<Path>, params: &TxParams) -> Result<Self, TransportError> {
        params.validate()?;
        let root = root.as_ref().to_path_buf();
        let pin = params.pin;
        let pin_dir = root.join(format!("gpio{pin}"));

        let exported = !pin_dir.exists();
        if exported {
            debug!(pin, "Exporting GPIO");
            fs::write(root.join(EXPORT_FILE), pin.to_string())?;
            wait_for_export(&pin_dir)?;
        }

        let direction_path = pin_dir.join(DIRECTION_FILE);
        let previous_direction = fs::read_to_string(&direction_path)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "in".to_string());
        // "low"/"high" switch to output with the level already applied
        let idle_high = params.invert;
        fs::write(&direction_path, if idle_high { "high" } else { "low" })?;

        let value = OpenOptions::new()
            .write(true)
            .open(pin_dir.join(VALUE_FILE))?;
        write_level(&value, idle_high)?;

        info!(
            pin,
            path = %pin_dir.display(),
            exported,
            idle_high,
            "GPIO transmitter ready"
        );

        Ok(Self {
            info: TransmitterInfo {
                kind: BackendKind::Sysfs,
                pin,
                device_path: pin_dir.display().to_string(),
            },
            root,
            mask: params.pin_mask()?,
            pin_dir,
            exported,
            previous_direction,
            idle_high,
            realtime: params.realtime,
            timeout: params.timeout(),
            value: Mutex::new(Some(value)),
            closed: AtomicBool::new(false),
        })
    }

    /// Level a pulse puts on our pin, `None` when it leaves the pin alone
    fn level(&self, pulse: &Pulse) -> Option<bool> {
        if pulse.on_mask & self.mask != 0 {
            Some(true)
        } else if pulse.off_mask & self.mask != 0 {
            Some(false)
        } else {
            None
        }
    }
}

fn wait_for_export(pin_dir: &Path) -> Result<(), TransportError> {
    let deadline = Instant::now() + EXPORT_SETTLE;
    let direction = pin_dir.join(DIRECTION_FILE);
    while Instant::now() < deadline {
        // The node appears before its permissions are fixed up
        if OpenOptions::new().write(true).open(&direction).is_ok() {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    Err(TransportError::PermissionDenied(format!(
        "{} not writable after export",
        direction.display()
    )))
}

fn write_level(file: &File, high: bool) -> Result<(), TransportError> {
    file.write_at(if high { b"1" } else { b"0" }, 0)?;
    Ok(())
}

impl Transmitter for SysfsGpioTransmitter {
    fn transmit(&self, waveform: &Waveform, cancel: &CancelToken) -> Result<(), TransportError> {
        let guard = self.value.lock();
        let file = guard
            .as_ref()
            .ok_or_else(|| TransportError::Device("transmitter is closed".into()))?;

        let _priority = if self.realtime {
            realtime::raise()
        } else {
            None
        };

        let mut level = self.idle_high;
        let result = pacing::play(waveform, cancel, self.timeout, |pulse| {
            match self.level(pulse) {
                Some(high) if high != level => {
                    write_level(file, high)?;
                    level = high;
                }
                _ => {}
            }
            Ok(())
        });

        // Never leave the carrier keyed
        if let Err(e) = write_level(file, self.idle_high) {
            warn!(pin = self.info.pin, "Failed to return line to idle: {e}");
        }
        if let Err(e) = &result {
            warn!(pin = self.info.pin, "Transmission stopped: {e}");
        }
        result
    }

    fn info(&self) -> &TransmitterInfo {
        &self.info
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Every step runs; the first failure is reported
        let mut first_error: Option<TransportError> = None;
        let mut step = |name: &str, result: Result<(), TransportError>| {
            if let Err(e) = result {
                warn!(pin = self.info.pin, step = name, "GPIO release step failed: {e}");
                first_error.get_or_insert(e);
            }
        };

        if let Some(file) = self.value.lock().take() {
            step("idle", write_level(&file, self.idle_high));
        }
        step(
            "direction",
            fs::write(self.pin_dir.join(DIRECTION_FILE), &self.previous_direction)
                .map_err(TransportError::from),
        );
        if self.exported {
            step(
                "unexport",
                fs::write(self.root.join(UNEXPORT_FILE), self.info.pin.to_string())
                    .map_err(TransportError::from),
            );
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(pin = self.info.pin, "GPIO transmitter closed");
                Ok(())
            }
        }
    }
}

impl Drop for SysfsGpioTransmitter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(pin = self.info.pin, "Failed to release GPIO: {e}");
        }
    }
}

#[cfg(all(target_os = "linux", feature = "realtime"))]
mod realtime {
    use tracing::{debug, warn};

    /// FIFO priority requested while a waveform is being sent
    const PRIORITY: libc::c_int = 99;

    /// Restores the thread's previous scheduling policy on drop
    pub(super) struct PriorityGuard {
        policy: libc::c_int,
        param: libc::sched_param,
    }

    pub(super) fn raise() -> Option<PriorityGuard> {
        // SAFETY: pid 0 addresses the calling thread; the param structs are
        // plain C data owned by this frame.
        unsafe {
            let policy = libc::sched_getscheduler(0);
            if policy < 0 {
                return None;
            }
            let mut param: libc::sched_param = std::mem::zeroed();
            if libc::sched_getparam(0, &mut param) != 0 {
                return None;
            }

            let mut fifo: libc::sched_param = std::mem::zeroed();
            fifo.sched_priority = PRIORITY;
            if libc::sched_setscheduler(0, libc::SCHED_FIFO, &fifo) != 0 {
                warn!(
                    "Could not raise thread to SCHED_FIFO {PRIORITY}: {}",
                    std::io::Error::last_os_error()
                );
                return None;
            }
            debug!(priority = PRIORITY, "Thread switched to SCHED_FIFO");
            Some(PriorityGuard { policy, param })
        }
    }

    impl Drop for PriorityGuard {
        fn drop(&mut self) {
            // SAFETY: restores values read by `raise` on this same thread.
            unsafe {
                libc::sched_setscheduler(0, self.policy, &self.param);
            }
        }
    }
}

#[cfg(not(all(target_os = "linux", feature = "realtime")))]
mod realtime {
    pub(super) struct PriorityGuard;

    pub(super) fn raise() -> Option<PriorityGuard> {
        tracing::debug!("Real-time scheduling not available in this build");
        None
    }
}
