use super::error::EngineError;
use super::interfaces::Scene;
use std::sync::Mutex;
use tracing::debug;

/// Worker threads plus one scene per worker.
///
/// A worker always locks the scene at its own thread index, so the locks are
/// never contended. The pool lives for a whole search run and is reused by
/// every stage.
pub struct ScenePool<S> {
    scenes: Vec<Mutex<S>>,
    #[cfg(feature = "parallel")]
    threads: rayon::ThreadPool,
}

impl<S: Scene> ScenePool<S> {
    /// Builds a pool of `num_threads` workers (every logical core when
    /// `None`), each with its own deep copy of `template`.
    pub fn new(template: &S, num_threads: Option<usize>) -> Result<Self, EngineError> {
        #[cfg(feature = "parallel")]
        {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(n) = num_threads {
                builder = builder.num_threads(n);
            }
            let threads = builder
                .build()
                .map_err(|e| EngineError::ThreadPool(e.to_string()))?;
            let n_scenes = threads.current_num_threads().max(1);
            debug!(workers = n_scenes, "Initialized scene pool.");
            Ok(Self {
                scenes: Self::clone_scenes(template, n_scenes),
                threads,
            })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = num_threads;
            debug!(workers = 1, "Initialized scene pool.");
            Ok(Self {
                scenes: Self::clone_scenes(template, 1),
            })
        }
    }

    fn clone_scenes(template: &S, n: usize) -> Vec<Mutex<S>> {
        (0..n)
            .map(|_| Mutex::new(template.clone_specific_deep(&[1])))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Runs `op` on the pool's worker threads.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        #[cfg(feature = "parallel")]
        {
            self.threads.install(op)
        }

        #[cfg(not(feature = "parallel"))]
        {
            op()
        }
    }

    /// Calls `f` with the scene bound to the calling worker.
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, EngineError> {
        let slot = worker_index() % self.scenes.len().max(1);
        let cell = self
            .scenes
            .get(slot)
            .ok_or_else(|| EngineError::Internal("scene pool is empty".to_string()))?;
        let mut scene = cell
            .lock()
            .map_err(|_| EngineError::Internal(format!("scene {} was poisoned", slot)))?;
        Ok(f(&mut scene))
    }
}

#[cfg(feature = "parallel")]
fn worker_index() -> usize {
    rayon::current_thread_index().unwrap_or(0)
}

#[cfg(not(feature = "parallel"))]
fn worker_index() -> usize {
    0
}
