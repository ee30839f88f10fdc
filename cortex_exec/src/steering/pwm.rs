//! Sysfs PWM channel.
//!
//! The kernel exposes each PWM chip as a directory with `export` and `unexport` files. Exporting
//! a channel creates a `pwmN` directory holding `period`, `duty_cycle` and `enable`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An exported PWM channel, unexported when dropped.
pub struct Pwm {
    chip: PathBuf,
    channel: u32,
    duty_cycle: File,
    enable: File,
}

#[derive(Debug, thiserror::Error)]
pub enum PwmError {
    #[error("Could not write {0:?}: {1}")]
    WriteFailed(PathBuf, std::io::Error),

    #[error("Could not open {0:?}: {1}")]
    OpenFailed(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pwm {
    /// Export `channel` of the chip at `chip` and set its period.
    ///
    /// The channel is left disabled.
    pub fn new<P: AsRef<Path>>(chip: P, channel: u32, period_ns: u32) -> Result<Self, PwmError> {
        let chip = chip.as_ref().to_path_buf();
        let dir = chip.join(format!("pwm{}", channel));

        if !dir.exists() {
            write_attr(&chip.join("export"), channel)?;
            debug!("Exported PWM channel {:?}", dir);
        }

        write_attr(&dir.join("period"), period_ns)?;

        Ok(Self {
            duty_cycle: open_attr(&dir.join("duty_cycle"))?,
            enable: open_attr(&dir.join("enable"))?,
            chip,
            channel,
        })
    }

    /// Set the duty cycle in nanoseconds.
    pub fn set_duty_cycle(&mut self, duty_ns: u32) -> Result<(), PwmError> {
        rewrite(&mut self.duty_cycle, duty_ns).map_err(|e| PwmError::WriteFailed(self.path("duty_cycle"), e))
    }

    /// Switch the output on or off.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), PwmError> {
        rewrite(&mut self.enable, enabled as u8).map_err(|e| PwmError::WriteFailed(self.path("enable"), e))
    }

    fn path(&self, attr: &str) -> PathBuf {
        self.chip.join(format!("pwm{}", self.channel)).join(attr)
    }
}

impl Drop for Pwm {
    fn drop(&mut self) {
        if let Err(e) = self.set_enabled(false) {
            warn!("{}", e);
        }

        if let Err(e) = write_attr(&self.chip.join("unexport"), self.channel) {
            warn!("{}", e);
        }
    }
}

fn open_attr(path: &Path) -> Result<File, PwmError> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| PwmError::OpenFailed(path.to_path_buf(), e))
}

fn write_attr<T: std::fmt::Display>(path: &Path, value: T) -> Result<(), PwmError> {
    let mut file = open_attr(path)?;
    rewrite(&mut file, value).map_err(|e| PwmError::WriteFailed(path.to_path_buf(), e))
}

/// Replace the contents of an attribute file.
fn rewrite<T: std::fmt::Display>(file: &mut File, value: T) -> std::io::Result<()> {
    let text = value.to_string();
    file.seek(SeekFrom::Start(0))?;
    // Sysfs attributes ignore truncation, plain files need it
    file.set_len(0).ok();
    file.write_all(text.as_bytes())?;
    file.flush()
}
