//! Mock report transport for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use super::traits::{ReportTransport, TransportError};

/// One scripted result for `read`.
#[derive(Debug, Clone)]
pub enum MockRead {
    /// A frame from the host.
    Data(Vec<u8>),
    /// No data available yet.
    WouldBlock,
    /// A non-framing read failure.
    Fail(String),
    /// The channel went away.
    Disconnect,
}

/// Mock transport for unit testing engine logic.
///
/// Clones share the same state, so a test can keep one handle while the
/// engine owns another.
#[derive(Clone)]
pub struct MockTransport {
    /// Scripted read results; an empty script reads as `WouldBlock`.
    read_script: Arc<Mutex<VecDeque<MockRead>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Remaining writes that should fail.
    failing_writes: Arc<AtomicUsize>,
    /// Writes block while this is true.
    write_gate: Arc<(Mutex<bool>, Condvar)>,
    reads: Arc<AtomicUsize>,
    /// Set once a scripted `Disconnect` has been read.
    disconnected: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            read_script: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            failing_writes: Arc::new(AtomicUsize::new(0)),
            write_gate: Arc::new((Mutex::new(false), Condvar::new())),
            reads: Arc::new(AtomicUsize::new(0)),
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a frame to be returned by a later read.
    pub fn queue_frame(&self, frame: &[u8]) {
        self.queue_read(MockRead::Data(frame.to_vec()));
    }

    pub fn queue_read(&self, read: MockRead) {
        self.read_script.lock().unwrap().push_back(read);
    }

    /// Number of reads issued so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of scripted reads not yet consumed.
    pub fn pending_reads(&self) -> usize {
        self.read_script.lock().unwrap().len()
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Make the next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Block every write until `release_writes` is called.
    pub fn hold_writes(&self) {
        *self.write_gate.0.lock().unwrap() = true;
    }

    pub fn release_writes(&self) {
        let (lock, cvar) = &*self.write_gate;
        *lock.lock().unwrap() = false;
        cvar.notify_all();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportTransport for MockTransport {
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let next = self.read_script.lock().unwrap().pop_front();
        match next {
            Some(MockRead::Data(frame)) => {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                Ok(n)
            }
            Some(MockRead::WouldBlock) | None => Err(TransportError::WouldBlock),
            Some(MockRead::Fail(msg)) => Err(TransportError::ReadFailed(msg)),
            Some(MockRead::Disconnect) => {
                self.disconnected.store(true, Ordering::SeqCst);
                Err(TransportError::Disconnected)
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<usize, TransportError> {
        {
            let (lock, cvar) = &*self.write_gate;
            let mut held = lock.lock().unwrap();
            while *held {
                held = cvar.wait(held).unwrap();
            }
        }
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let failing = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(TransportError::WriteFailed("injected failure".into()));
        }
        self.write_log.lock().unwrap().push(data.to_vec());
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_read_script() {
        let mock = MockTransport::new();
        mock.queue_frame(&[0xA2, 0x10]);
        mock.queue_read(MockRead::Fail("boom".into()));

        let mut buf = [0u8; 16];
        assert_eq!(mock.read(&mut buf).unwrap(), 2);
        assert!(matches!(mock.read(&mut buf), Err(TransportError::ReadFailed(_))));

        // Script is empty now
        assert!(mock.read(&mut buf).unwrap_err().is_would_block());
        assert_eq!(mock.read_count(), 3);
    }

    #[test]
    fn test_mock_write_capture() {
        let mock = MockTransport::new();
        mock.fail_next_writes(1);
        assert!(mock.write(b"Hello").is_err());
        mock.write(b"World").unwrap();

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], b"World");
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        mock.queue_read(MockRead::Disconnect);
        mock.queue_frame(&[0xA2, 0x10]);

        let mut buf = [0u8; 16];
        assert!(matches!(mock.read(&mut buf), Err(TransportError::Disconnected)));
        // Stays down; the remaining script is never reached.
        assert!(matches!(mock.read(&mut buf), Err(TransportError::Disconnected)));
        assert!(matches!(mock.write(b"test"), Err(TransportError::Disconnected)));
        assert_eq!(mock.pending_reads(), 1);
    }
}
