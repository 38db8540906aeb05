//! Upload Session Module
//!
//! Holds the state of one in-progress upload: a temp-file backed
//! random-access buffer, the declared total size, and the coverage set of
//! byte ranges received so far. Sessions do not survive a process restart;
//! durability begins only at the handoff to the remote store.

use crate::range_set::{ByteInterval, RangeSet};
use crate::Result;
use std::fs::File;
use std::os::unix::fs::FileExt;
use tracing::debug;

/// In-memory state for one not-yet-finalized upload.
///
/// The buffer is an anonymous temp file grown on demand; writing at an
/// offset past the current extent leaves a zero-filled hole, and reads past
/// the extent zero-fill rather than fail (explicit contract, used by
/// clients polling a partial upload).
///
/// Callers serialize access per session; the registry wraps each session in
/// its own lock so distinct sessions never block each other.
pub struct UploadSession {
    id: String,
    total_size: Option<u64>,
    buffer: File,
    coverage: RangeSet,
}

impl UploadSession {
    /// Open an empty session backed by a fresh anonymous temp file.
    pub fn new(id: String) -> Result<Self> {
        let buffer = tempfile::tempfile()?;
        debug!("opened session buffer for protocol {}", id);
        Ok(Self {
            id,
            total_size: None,
            buffer,
            coverage: RangeSet::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared full object size, if known yet.
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Record the declared total size. The first declaration wins; later
    /// calls are no-ops.
    pub fn declare_total_size(&mut self, total: u64) {
        if self.total_size.is_none() {
            self.total_size = Some(total);
        }
    }

    /// Replace the whole buffer in one shot: truncate, write `bytes` at
    /// offset 0, and reset both size and coverage. Destructive to any prior
    /// partial-write state — this is the protocol's "resend everything"
    /// mode.
    pub fn write_full(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.set_len(0)?;
        self.buffer.write_all_at(bytes, 0)?;

        self.total_size = Some(bytes.len() as u64);
        self.coverage.clear();
        if !bytes.is_empty() {
            self.coverage
                .insert(ByteInterval::new(0, bytes.len() as u64 - 1));
        }
        Ok(())
    }

    /// Write a chunk at `offset`, extending the buffer as needed, then
    /// record the covered interval. A failed write surfaces the I/O error
    /// and leaves coverage untouched.
    pub fn write_chunk(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.buffer.write_all_at(bytes, offset)?;
        self.coverage
            .insert(ByteInterval::new(offset, offset + bytes.len() as u64 - 1));
        Ok(())
    }

    /// True once the total size is known and the coverage set equals
    /// exactly `[0, total-1]`.
    pub fn is_complete(&self) -> bool {
        match self.total_size {
            Some(total) => self.coverage.is_fully_covered(total),
            None => false,
        }
    }

    /// Read the inclusive range `[start, end]`, zero-filling any portion
    /// past the buffer's written extent. Requires `start <= end`.
    pub fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let length = (end - start + 1) as usize;
        let mut buf = vec![0u8; length];

        let mut filled = 0;
        while filled < length {
            let read = self.buffer.read_at(&mut buf[filled..], start + filled as u64)?;
            if read == 0 {
                // Past the extent: the remainder stays zero.
                break;
            }
            filled += read;
        }
        Ok(buf)
    }

    /// Read exactly the buffer's current extent, regardless of coverage or
    /// declared size — the "no Range header, upload still in progress"
    /// read path.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let extent = self.buffer.metadata()?.len();
        if extent == 0 {
            return Ok(Vec::new());
        }
        self.read_range(0, extent - 1)
    }

    /// Canonical intervals received so far.
    pub fn received_ranges(&self) -> &[ByteInterval] {
        self.coverage.intervals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_full_completes_and_reads_back() {
        let mut session = UploadSession::new("1000".to_string()).unwrap();
        session.write_full(&[1, 2, 3]).unwrap();

        assert!(session.is_complete());
        assert_eq!(session.total_size(), Some(3));
        assert_eq!(session.read_all().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn write_full_discards_prior_partial_state() {
        let mut session = UploadSession::new("1000".to_string()).unwrap();
        session.declare_total_size(100);
        session.write_chunk(90, &[9; 10]).unwrap();

        session.write_full(&[7; 4]).unwrap();
        assert_eq!(
            session.total_size(),
            Some(4),
            "full write resets the declared size"
        );
        assert_eq!(session.received_ranges(), &[ByteInterval::new(0, 3)]);
        assert!(session.is_complete());
        assert_eq!(session.read_all().unwrap(), vec![7; 4]);
    }

    #[test]
    fn empty_full_write_is_complete_with_empty_coverage() {
        let mut session = UploadSession::new("1000".to_string()).unwrap();
        session.write_full(&[]).unwrap();

        assert_eq!(session.total_size(), Some(0));
        assert!(session.received_ranges().is_empty());
        assert!(session.is_complete());
        assert!(session.read_all().unwrap().is_empty());
    }

    #[test]
    fn chunks_complete_in_any_order() {
        let mut session = UploadSession::new("1001".to_string()).unwrap();
        session.declare_total_size(10);

        session.write_chunk(5, &[5, 6, 7, 8, 9]).unwrap();
        assert!(!session.is_complete());
        session.write_chunk(0, &[0, 1, 2, 3, 4]).unwrap();
        assert!(session.is_complete());
        assert_eq!(
            session.read_all().unwrap(),
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]
        );
    }

    #[test]
    fn declare_total_size_is_first_wins() {
        let mut session = UploadSession::new("1002".to_string()).unwrap();
        session.declare_total_size(10);
        session.declare_total_size(999);
        assert_eq!(session.total_size(), Some(10));
    }

    #[test]
    fn read_range_zero_fills_past_the_extent() {
        let mut session = UploadSession::new("1003".to_string()).unwrap();
        session.declare_total_size(10);
        session.write_chunk(0, &[1, 1, 1, 1, 1]).unwrap();

        let bytes = session.read_range(0, 9).unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[..5], &[1, 1, 1, 1, 1]);
        assert_eq!(&bytes[5..], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn read_all_returns_only_the_written_extent() {
        let mut session = UploadSession::new("1004".to_string()).unwrap();
        session.declare_total_size(100);
        session.write_chunk(0, &[2; 8]).unwrap();

        // Extent follows the highest offset written, not the declared size.
        assert_eq!(session.read_all().unwrap(), vec![2; 8]);
    }

    #[test]
    fn writing_past_a_gap_leaves_the_hole_zeroed() {
        let mut session = UploadSession::new("1005".to_string()).unwrap();
        session.declare_total_size(8);
        session.write_chunk(6, &[6, 7]).unwrap();

        assert_eq!(session.received_ranges(), &[ByteInterval::new(6, 7)]);
        let bytes = session.read_all().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0, 0, 0, 6, 7]);
    }
}
