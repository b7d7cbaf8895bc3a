//! Received-Packet Persistence
//!
//! Durably records received payloads as an append-only text log, one line
//! per packet. The sink is write-through: every record performs a complete
//! mount → open → write → close → unmount sequence and holds nothing across
//! calls. A power loss between cycles loses at most the in-flight record
//! and never corrupts earlier ones.

use crate::types::{LogRecord, StorageError};

/// Storage driver capability consumed by the sink
///
/// Maps onto a FAT-style block-device filesystem: a mountable volume,
/// append-mode file handles, explicit close and unmount. Errors are opaque
/// driver codes; the sink tags them with the stage that produced them.
pub trait StorageDriver {
    /// Open-file handle type
    type Handle;

    /// Mount the volume identified by `volume`.
    fn mount(&mut self, volume: &str) -> Result<(), i16>;

    /// Open `path` for appending, creating it if absent.
    fn open_append(&mut self, path: &str) -> Result<Self::Handle, i16>;

    /// Append `text`, returning the number of bytes written.
    fn write(&mut self, handle: &mut Self::Handle, text: &str) -> Result<usize, i16>;

    /// Close the handle, flushing buffered data.
    fn close(&mut self, handle: Self::Handle) -> Result<(), i16>;

    /// Unmount the volume.
    fn unmount(&mut self, volume: &str) -> Result<(), i16>;
}

/// Write-through record sink
///
/// Each `append_record` call acquires and releases the volume entirely, so
/// there is no cross-call handle to manage and no partial record can
/// dangle: the resource sequence fully unwinds on every path, success or
/// failure.
pub struct PersistenceSink<S: StorageDriver> {
    driver: S,
    volume: &'static str,
    path: &'static str,
}

impl<S: StorageDriver> PersistenceSink<S> {
    /// Create a sink appending to `path` on `volume`
    pub const fn new(driver: S, volume: &'static str, path: &'static str) -> Self {
        Self {
            driver,
            volume,
            path,
        }
    }

    /// Durably append one record.
    ///
    /// Performs the full mount/open/write/close/unmount sequence. The first
    /// failure wins and is stage-tagged; cleanup still runs after a failed
    /// write, and a close or unmount failure after a good write is reported
    /// as its own stage so the caller knows the payload reached the medium.
    pub fn append_record(&mut self, record: &LogRecord) -> Result<(), StorageError> {
        self.driver
            .mount(self.volume)
            .map_err(StorageError::MountFailed)?;

        let mut handle = match self.driver.open_append(self.path) {
            Ok(handle) => handle,
            Err(code) => {
                let _ = self.driver.unmount(self.volume);
                return Err(StorageError::OpenFailed(code));
            }
        };

        let line = record.format_line();
        let write_result = match self.driver.write(&mut handle, &line) {
            Ok(written) if written == line.len() => Ok(()),
            Ok(written) => Err(StorageError::ShortWrite {
                written,
                expected: line.len(),
            }),
            Err(code) => Err(StorageError::WriteFailed(code)),
        };

        let close_result = self.driver.close(handle);
        let unmount_result = self.driver.unmount(self.volume);

        write_result?;
        close_result.map_err(StorageError::CloseFailed)?;
        unmount_result.map_err(StorageError::UnmountFailed)?;
        Ok(())
    }
}
