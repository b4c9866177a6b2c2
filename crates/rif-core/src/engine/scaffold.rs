use super::config::SearchConfig;
use super::error::EngineError;
use super::interfaces::{ScaffoldDataCache, ScaffoldProvider};
use crate::core::models::index::{TreeIndex, TreeLimits};
use crate::core::rotamers::catalog::RotamerCatalog;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Per-scaffold data that remembers which catalog its tables were built for.
#[derive(Debug)]
pub struct ScaffoldData {
    name: String,
    prepared_for: OnceLock<u64>,
}

impl ScaffoldData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prepared_for: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared_for.get().is_some()
    }
}

impl ScaffoldDataCache for ScaffoldData {
    fn setup_onebody_tables(
        &self,
        catalog: &RotamerCatalog,
        _config: &SearchConfig,
    ) -> Result<(), EngineError> {
        let hash = catalog.validation_hash();
        let prepared = *self.prepared_for.get_or_init(|| {
            debug!(scaffold = %self.name, rotamers = catalog.len(), "Prepared one-body tables.");
            hash
        });
        if prepared != hash {
            return Err(EngineError::Scaffold(format!(
                "tables of scaffold '{}' were built for a different rotamer catalog",
                self.name
            )));
        }
        Ok(())
    }
}

/// A fixed list of scaffolds, all on level 1 of the scaffold tree.
#[derive(Debug, Default)]
pub struct StaticScaffoldProvider {
    scaffolds: Vec<Arc<ScaffoldData>>,
}

impl StaticScaffoldProvider {
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            scaffolds: names
                .into_iter()
                .map(|name| Arc::new(ScaffoldData::new(name)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.scaffolds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scaffolds.is_empty()
    }

    pub fn scaffold(&self, index: TreeIndex) -> Option<&Arc<ScaffoldData>> {
        if index.level != 1 {
            return None;
        }
        usize::try_from(index.position)
            .ok()
            .and_then(|i| self.scaffolds.get(i))
    }
}

impl ScaffoldProvider for StaticScaffoldProvider {
    fn scaffold_index_limits(&self) -> TreeLimits {
        TreeLimits {
            levels: 2,
            count_at_level: self.scaffolds.len() as u64,
        }
    }

    fn data_cache(&self, index: TreeIndex) -> Result<Arc<dyn ScaffoldDataCache>, EngineError> {
        self.scaffold(index)
            .map(|data| Arc::clone(data) as Arc<dyn ScaffoldDataCache>)
            .ok_or_else(|| EngineError::Scaffold(format!("no scaffold at {}", index)))
    }
}
