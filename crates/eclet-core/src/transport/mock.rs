//! Scripted mock transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::traits::{Transport, TransportError};
use crate::protocol::StatusCode;
use crate::protocol::response::{encode_response, encode_status};

/// Mock transport for unit testing framing and error paths.
///
/// Responses are returned in the order they were queued, regardless of the
/// command written.
#[derive(Clone)]
pub struct MockTransport {
    /// Queued raw response frames.
    response_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Captured command frames.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Whether the device is "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            response_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue a raw frame, exactly as the bus would deliver it.
    pub fn queue_raw(&self, frame: &[u8]) {
        self.response_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(frame.to_vec());
    }

    /// Queue a well-formed frame carrying `payload`.
    pub fn queue_payload(&self, payload: &[u8]) {
        self.queue_raw(&encode_response(payload));
    }

    /// Queue a status frame.
    pub fn queue_status(&self, status: StatusCode) {
        self.queue_raw(&encode_status(status));
    }

    /// Queue a frame carrying `payload` with one bit flipped after the count byte.
    pub fn queue_corrupted(&self, payload: &[u8]) {
        let mut frame = encode_response(payload);
        frame[1] ^= 0x01;
        self.queue_raw(&frame);
    }

    /// Number of responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.response_queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Get all captured command frames.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Opcodes of all captured command frames.
    pub fn opcodes(&self) -> Vec<u8> {
        self.write_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|f| f.get(2).copied())
            .collect()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Simulate the device dropping off the bus.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Simulate the device coming back.
    pub fn reconnect(&self) {
        *self.connected.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&self, frame: &[u8]) -> Result<usize, TransportError> {
        if !*self.connected.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(TransportError::Disconnected);
        }
        self.write_log.lock().unwrap_or_else(PoisonError::into_inner).push(frame.to_vec());
        Ok(frame.len())
    }

    fn read(&self, _max_len: usize) -> Result<Vec<u8>, TransportError> {
        if !*self.connected.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(TransportError::Disconnected);
        }
        self.response_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(TransportError::Timeout { timeout_ms: 100 })
    }

    fn wait(&self, _exec_time: Duration) {}

    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_queue() {
        let mock = MockTransport::new();
        mock.queue_status(StatusCode::Success);
        mock.queue_payload(&[0x42; 4]);
        assert_eq!(mock.pending(), 2);

        let r1 = mock.send_and_receive(&[0x03, 0x07], Duration::ZERO, 1).unwrap();
        assert_eq!(r1, vec![0x04, 0x00, 0x03, 0x40]);

        let r2 = mock.send_and_receive(&[0x03, 0x07], Duration::ZERO, 4).unwrap();
        assert_eq!(r2.len(), 7);

        assert_eq!(mock.pending(), 0);
        assert!(matches!(
            mock.send_and_receive(&[0x03], Duration::ZERO, 1),
            Err(TransportError::Timeout { .. })
        ));
    }

    #[test]
    fn test_mock_write_capture() {
        let mock = MockTransport::new();
        mock.write(&[0x03, 0x07, 0x1B]).unwrap();
        mock.write(&[0x03, 0x07, 0x02]).unwrap();

        assert_eq!(mock.get_writes().len(), 2);
        assert_eq!(mock.opcodes(), vec![0x1B, 0x02]);

        mock.clear_writes();
        assert!(mock.get_writes().is_empty());
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.disconnect();
        assert!(!mock.is_connected());
        assert!(matches!(mock.write(&[0x03]), Err(TransportError::Disconnected)));

        mock.reconnect();
        assert!(mock.write(&[0x03]).is_ok());
    }
}
