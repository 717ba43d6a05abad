//! Shared request state.

use fieldkit_db::repository::{SurrealDefinitionRepository, SurrealValueRepository};
use fieldkit_engine::{DefinitionRegistry, EngineConfig, ValueService};
use surrealdb::{Connection, Surreal};

/// Application state handed to every handler, generic over the
/// SurrealDB connection so tests can run against the in-memory
/// engine. Shared as `Arc<AppState<C>>`.
pub struct AppState<C: Connection> {
    pub registry: DefinitionRegistry<SurrealDefinitionRepository<C>>,
    pub values: ValueService<SurrealDefinitionRepository<C>, SurrealValueRepository<C>>,
}

impl<C: Connection> AppState<C> {
    pub fn new(db: Surreal<C>, config: EngineConfig) -> Self {
        Self {
            registry: DefinitionRegistry::new(
                SurrealDefinitionRepository::new(db.clone()),
                config.clone(),
            ),
            values: ValueService::new(
                SurrealDefinitionRepository::new(db.clone()),
                SurrealValueRepository::new(db),
                config,
            ),
        }
    }
}
