use std::time::Instant;

use bytes::Bytes;

/// One chunk of a file as delivered by a single request.
#[derive(Debug, Clone)]
pub struct ChunkDescriptor {
    /// Relative path identifying the upload (e.g. `p/h/photo.jpg`)
    pub session_key: String,
    /// Zero-based chunk index
    pub index: u32,
    /// Total number of chunks for the file
    pub total_chunks: u32,
    pub payload: Bytes,
}

impl ChunkDescriptor {
    pub fn new(
        session_key: impl Into<String>,
        index: u32,
        total_chunks: u32,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            index,
            total_chunks,
            payload: payload.into(),
        }
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total_chunks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Receiving,
    Finalizing,
    Finalized,
    Failed,
}

/// Server-side bookkeeping for one file's chunk sequence.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub key: String,
    pub chunk_count: u32,
    pub chunks_received: u32,
    pub bytes_received: u64,
    pub state: SessionState,
    /// Last time a chunk arrived or the session restarted
    pub updated_at: Instant,
}

impl UploadSession {
    pub fn new(key: impl Into<String>, chunk_count: u32) -> Self {
        Self {
            key: key.into(),
            chunk_count,
            chunks_received: 0,
            bytes_received: 0,
            state: SessionState::Receiving,
            updated_at: Instant::now(),
        }
    }

    /// Restart the session as if index 0 had just arrived.
    pub fn restart(&mut self, chunk_count: u32) {
        self.chunk_count = chunk_count;
        self.chunks_received = 0;
        self.bytes_received = 0;
        self.state = SessionState::Receiving;
        self.updated_at = Instant::now();
    }

    pub fn record_chunk(&mut self, len: u64) {
        self.chunks_received += 1;
        self.bytes_received += len;
        self.updated_at = Instant::now();
    }

    /// Receiving with at least one chunk stored
    pub fn is_in_progress(&self) -> bool {
        self.state == SessionState::Receiving && self.chunks_received > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_is_first_and_last() {
        let chunk = ChunkDescriptor::new("p/h/photo.jpg", 0, 1, b"abc".to_vec());
        assert!(chunk.is_first());
        assert!(chunk.is_last());
    }

    #[test]
    fn test_session_restart_resets_counters() {
        let mut session = UploadSession::new("p/h/photo.jpg", 3);
        session.record_chunk(10);
        session.state = SessionState::Failed;
        session.restart(4);
        assert_eq!(session.chunk_count, 4);
        assert_eq!(session.chunks_received, 0);
        assert_eq!(session.bytes_received, 0);
        assert_eq!(session.state, SessionState::Receiving);
    }
}
