use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use vitrine_core::constants::STAGING_SUFFIX;
use vitrine_core::models::{ChunkDescriptor, SessionState, UploadSession};

use crate::error::{AssemblyError, AssemblyResult};
use crate::keys::validate_key;

/// Result of accepting one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Chunk committed to the staging file; more chunks are expected
    Pending { received: u32, total: u32 },
    /// Last chunk committed and the file moved to its permanent path
    Finalized { path: PathBuf, size: u64 },
}

type SessionHandle = Arc<Mutex<UploadSession>>;

/// Appends chunks to per-key staging files and relocates them once complete.
///
/// Every append-then-maybe-finalize sequence runs under a mutex scoped to the session
/// key, so duplicate or retried requests for one key cannot interleave bytes. Distinct
/// keys never contend.
pub struct ChunkAssembler {
    staging_dir: PathBuf,
    target_dir: PathBuf,
    sessions: DashMap<String, SessionHandle>,
}

impl ChunkAssembler {
    /// Create a new ChunkAssembler
    ///
    /// # Arguments
    /// * `staging_dir` - Directory for in-progress `.part` files
    /// * `target_dir` - Directory finalized files are renamed into; should share a
    ///   filesystem with `staging_dir` so the rename is atomic
    ///
    /// Directories are created lazily on first write.
    pub fn new(staging_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            target_dir: target_dir.into(),
            sessions: DashMap::new(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Staging file path for a session key
    pub fn staging_path(&self, key: &str) -> AssemblyResult<PathBuf> {
        validate_key(key)?;
        Ok(self.staging_dir.join(format!("{}{}", key, STAGING_SUFFIX)))
    }

    /// Permanent file path for a session key
    pub fn target_path(&self, key: &str) -> AssemblyResult<PathBuf> {
        validate_key(key)?;
        Ok(self.target_dir.join(key))
    }

    /// Snapshot of a live session, if any
    pub async fn session(&self, key: &str) -> Option<UploadSession> {
        let handle = self.sessions.get(key).map(|entry| entry.value().clone())?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Current state of a live session, if any
    pub async fn session_state(&self, key: &str) -> Option<SessionState> {
        self.session(key).await.map(|session| session.state)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Accept one chunk.
    ///
    /// Index 0 truncates the staging file, later indices append. The last index appends
    /// and then renames the staging file over the target path. Indices are not checked
    /// for gaps: callers deliver chunks sequentially.
    pub async fn accept(&self, chunk: ChunkDescriptor) -> AssemblyResult<ChunkOutcome> {
        let (outcome, _) = self.accept_with(chunk, |_| async {}).await?;
        Ok(outcome)
    }

    /// Accept one chunk and, if it finalized the file, run `on_finalized` on the target
    /// path before the key lock is released.
    ///
    /// Post-processing of the finalized file is therefore serialized with any other
    /// upload or finalize of the same key.
    pub async fn accept_with<T, F, Fut>(
        &self,
        chunk: ChunkDescriptor,
        on_finalized: F,
    ) -> AssemblyResult<(ChunkOutcome, Option<T>)>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        if chunk.total_chunks == 0 {
            return Err(AssemblyError::InvalidChunk(
                "chunk count must be greater than 0".to_string(),
            ));
        }
        if chunk.index >= chunk.total_chunks {
            return Err(AssemblyError::InvalidChunk(format!(
                "chunk index {} out of range for {} chunks",
                chunk.index, chunk.total_chunks
            )));
        }
        validate_key(&chunk.session_key)?;

        let handle = self.session_handle(&chunk.session_key, chunk.total_chunks);
        let result = {
            let mut session = handle.lock().await;
            match self.accept_locked(&mut session, &chunk).await {
                Ok(ChunkOutcome::Finalized { path, size }) => {
                    let output = on_finalized(path.clone()).await;
                    Ok((ChunkOutcome::Finalized { path, size }, Some(output)))
                }
                Ok(pending) => Ok((pending, None)),
                Err(err) => {
                    session.state = SessionState::Failed;
                    Err(err)
                }
            }
        };
        drop(handle);

        if !matches!(result, Ok((ChunkOutcome::Pending { .. }, _))) {
            self.release(&chunk.session_key);
        }

        result
    }

    /// Run `f` while holding the lock of `key`, so it cannot overlap a chunk append or
    /// finalize of the same key.
    pub async fn with_key_lock<T, F, Fut>(&self, key: &str, f: F) -> AssemblyResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        validate_key(key)?;

        let handle = self.session_handle(key, 1);
        let output = {
            let _session = handle.lock().await;
            f().await
        };
        drop(handle);
        self.release(key);

        Ok(output)
    }

    /// Drop Receiving sessions that saw no chunk for `max_idle`, deleting their staging
    /// files. Returns how many were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let handles: Vec<(String, SessionHandle)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut evicted = 0;
        for (key, handle) in handles {
            let mut session = handle.lock().await;
            if session.updated_at.elapsed() < max_idle {
                continue;
            }

            if session.state == SessionState::Receiving {
                if let Ok(staging) = self.staging_path(&key) {
                    match fs::remove_file(&staging).await {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => tracing::warn!(
                            key = %key,
                            error = %e,
                            "Failed to remove abandoned staging file"
                        ),
                    }
                }
            }
            session.state = SessionState::Failed;

            // Only this sweep and the registry hold the handle
            let removed = self
                .sessions
                .remove_if(&key, |_, registered| {
                    Arc::ptr_eq(registered, &handle) && Arc::strong_count(registered) == 2
                })
                .is_some();
            drop(session);

            if removed {
                evicted += 1;
                tracing::info!(key = %key, "Evicted idle upload session");
            }
        }

        evicted
    }

    fn session_handle(&self, key: &str, chunk_count: u32) -> SessionHandle {
        self.sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UploadSession::new(key, chunk_count))))
            .value()
            .clone()
    }

    /// Drop the registry entry unless another request still holds the session or a
    /// chunk sequence is still in progress.
    fn release(&self, key: &str) {
        self.sessions.remove_if(key, |_, handle| {
            Arc::strong_count(handle) == 1
                && handle
                    .try_lock()
                    .map(|session| !session.is_in_progress())
                    .unwrap_or(false)
        });
    }

    async fn accept_locked(
        &self,
        session: &mut UploadSession,
        chunk: &ChunkDescriptor,
    ) -> AssemblyResult<ChunkOutcome> {
        let key = chunk.session_key.as_str();
        let staging = self.staging_path(key)?;

        if chunk.is_first() {
            session.restart(chunk.total_chunks);
        } else {
            session.chunk_count = chunk.total_chunks;
            session.state = SessionState::Receiving;
        }

        ensure_parent_dir(&staging).await?;

        let start = std::time::Instant::now();
        write_chunk(&staging, chunk).await?;
        session.record_chunk(chunk.payload.len() as u64);

        tracing::debug!(
            key = %key,
            chunk = chunk.index,
            chunks = chunk.total_chunks,
            size_bytes = chunk.payload.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Chunk appended to staging file"
        );

        if !chunk.is_last() {
            return Ok(ChunkOutcome::Pending {
                received: session.chunks_received,
                total: session.chunk_count,
            });
        }

        session.state = SessionState::Finalizing;
        let target = self.target_path(key)?;
        ensure_parent_dir(&target).await?;
        let size = finalize(key, &staging, &target).await?;
        session.state = SessionState::Finalized;

        tracing::info!(
            key = %key,
            path = %target.display(),
            chunks = session.chunks_received,
            size_bytes = size,
            "Chunked upload finalized"
        );

        Ok(ChunkOutcome::Finalized { path: target, size })
    }
}

/// Ensure parent directory exists
async fn ensure_parent_dir(path: &Path) -> AssemblyResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| AssemblyError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Write one chunk and close the handle. On failure the staging file is cut back to
/// its previous length so committed bytes stay intact and no partial chunk remains.
async fn write_chunk(staging: &Path, chunk: &ChunkDescriptor) -> AssemblyResult<()> {
    let write_err = |source: io::Error| AssemblyError::ChunkWrite {
        key: chunk.session_key.clone(),
        index: chunk.index,
        source,
    };

    let mut options = fs::OpenOptions::new();
    if chunk.is_first() {
        options.write(true).create(true).truncate(true);
    } else {
        options.append(true).create(true);
    }
    let mut file = options.open(staging).await.map_err(write_err)?;

    let committed = file.metadata().await.map_err(write_err)?.len();

    let written = async {
        file.write_all(&chunk.payload).await?;
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(source) = written {
        if let Err(rollback) = file.set_len(committed).await {
            tracing::warn!(
                key = %chunk.session_key,
                chunk = chunk.index,
                error = %rollback,
                "Failed to roll back partial chunk"
            );
        }
        return Err(write_err(source));
    }

    Ok(())
}

/// Rename the staging file over the target, replacing any previous file.
async fn finalize(key: &str, staging: &Path, target: &Path) -> AssemblyResult<u64> {
    let finalize_err = |source: io::Error| AssemblyError::Finalize {
        key: key.to_string(),
        source,
    };

    if let Err(first) = fs::rename(staging, target).await {
        // Platforms without replace-on-rename refuse an existing target.
        if fs::try_exists(target).await.unwrap_or(false) {
            fs::remove_file(target).await.map_err(finalize_err)?;
            fs::rename(staging, target).await.map_err(finalize_err)?;
        } else {
            return Err(finalize_err(first));
        }
    }

    let meta = fs::metadata(target).await.map_err(finalize_err)?;
    Ok(meta.len())
}
