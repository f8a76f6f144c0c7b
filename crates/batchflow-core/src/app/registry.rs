//! AdapterRegistry - engine identifier から adapter への対応表
//!
//! # 学習ポイント
//! - BTreeMap で型消去された trait object（`Arc<dyn ExecutionAdapter>`）を管理
//! - 初期化時のみ可変、実行中は読み取り専用（ロック不要）
//! - 重複登録は RegistryError で拒否

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::impls::{
    AudioEngineAdapter, ConvertEngineAdapter, MetaEngineAdapter, PassthroughAdapter,
    VideoEngineAdapter,
};
use crate::ports::ExecutionAdapter;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("adapter for engine '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn ExecutionAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every adapter shipped with the crate.
    pub fn with_builtin_adapters() -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn ExecutionAdapter>; 5] = [
            Arc::new(AudioEngineAdapter),
            Arc::new(VideoEngineAdapter),
            Arc::new(ConvertEngineAdapter),
            Arc::new(MetaEngineAdapter),
            Arc::new(PassthroughAdapter),
        ];
        for adapter in builtins {
            let engine = adapter.engine().to_string();
            // Engine names of the built-ins are distinct.
            registry.adapters.entry(engine).or_insert(adapter);
        }
        registry
    }

    /// Register an adapter under its own engine identifier.
    pub fn register<A: ExecutionAdapter + 'static>(&mut self, adapter: A) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(adapter))
    }

    pub fn register_arc(&mut self, adapter: Arc<dyn ExecutionAdapter>) -> Result<(), RegistryError> {
        let engine = adapter.engine().to_string();
        if self.adapters.contains_key(&engine) {
            return Err(RegistryError::AlreadyRegistered(engine));
        }
        self.adapters.insert(engine, adapter);
        Ok(())
    }

    pub fn get(&self, engine: &str) -> Option<Arc<dyn ExecutionAdapter>> {
        self.adapters.get(engine).cloned()
    }

    /// Registered engine identifiers, sorted.
    pub fn registered_engines(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("engines", &self.registered_engines())
            .finish()
    }
}
