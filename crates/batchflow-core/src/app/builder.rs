//! RunnerBuilder - Runner の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンで adapter / config / decider を組み立てる
//! - 起動時検証（Fail-fast 設計）

use std::sync::Arc;

use crate::app::config::RunnerConfig;
use crate::app::registry::{AdapterRegistry, RegistryError};
use crate::app::runner::Runner;
use crate::domain::{Decider, PolicyDecider};
use crate::ports::ExecutionAdapter;

/// RunnerBuilder は Runner を構築
///
/// # 使用例
/// ```ignore
/// let runner = RunnerBuilder::new()
///     .with_builtin_adapters()
///     .expect_engines(&["engine.audio"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_engines() で期待される engine identifier を宣言
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError::MissingEngines を返す
pub struct RunnerBuilder {
    registry: AdapterRegistry,
    config: RunnerConfig,
    decider: Arc<dyn Decider>,
    expected_engines: Option<Vec<String>>,
}

/// BuildError は Runner 構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Missing engines: {0:?}. These engines were expected but have no adapter.")]
    MissingEngines(Vec<String>),
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self {
            registry: AdapterRegistry::new(),
            config: RunnerConfig::default(),
            decider: Arc::new(PolicyDecider),
            expected_engines: None,
        }
    }

    /// Start from the adapters shipped with the crate. Adapters registered
    /// earlier on this builder are dropped.
    pub fn with_builtin_adapters(mut self) -> Self {
        self.registry = AdapterRegistry::with_builtin_adapters();
        self
    }

    pub fn register<A: ExecutionAdapter + 'static>(mut self, adapter: A) -> Result<Self, RegistryError> {
        self.registry.register(adapter)?;
        Ok(self)
    }

    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn decider<D: Decider + 'static>(mut self, decider: D) -> Self {
        self.decider = Arc::new(decider);
        self
    }

    pub fn expect_engines(mut self, engines: &[&str]) -> Self {
        self.expected_engines = Some(engines.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Runner, BuildError> {
        if let Some(expected) = &self.expected_engines {
            let registered = self.registry.registered_engines();
            let missing: Vec<String> = expected
                .iter()
                .filter(|e| !registered.contains(e))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingEngines(missing));
            }
        }
        Ok(Runner::new(self.registry, self.config, self.decider))
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
