use std::sync::{Arc, Mutex, PoisonError};

use super::{StateBackend, StoreError, StoreState};

#[derive(Debug, Default)]
struct Inner {
    state: Option<StoreState>,
    saves: usize,
    fail_loads: bool,
    fail_writes: bool,
}

/// Process-local backend. Clones share the same document.
///
/// Used for dry-run imports (seeded from the real data file, never written
/// back) and for exercising failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn seeded(state: StoreState) -> Self {
        let backend = Self::default();
        backend.lock().state = Some(state);
        backend
    }

    pub fn fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Last successfully saved (or seeded) state.
    pub fn snapshot(&self) -> Option<StoreState> {
        self.lock().state.clone()
    }

    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<Option<StoreState>, StoreError> {
        let inner = self.lock();
        if inner.fail_loads {
            return Err(StoreError::Unavailable("memory backend set to fail loads".to_string()));
        }
        Ok(inner.state.clone())
    }

    fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StoreError::Unavailable("memory backend set to fail writes".to_string()));
        }
        inner.state = Some(state.clone());
        inner.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
