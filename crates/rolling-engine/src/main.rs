//! Request loop binary for the Rolling economy core.
//!
//! Reads one JSON [`ActionRequest`] per line on stdin and writes one JSON
//! [`Response`] per line on stdout. Logs go to stderr.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load the game configuration (`ROLLING_CONFIG`, default `rolling-config.yaml`)
//! 3. Load the world seed (`ROLLING_SEED`, default `rolling-seed.json`)
//! 4. Connect to `PostgreSQL` and migrate, if `DATABASE_URL` is set
//! 5. Serve requests until stdin closes
//! 6. Save a holdings snapshot, if persistence is enabled

mod error;

use std::path::{Path, PathBuf};

use rolling_core::{GameConfig, WorldSeed};
use rolling_db::{HoldingsStore, LedgerStore, PostgresConfig, PostgresPool};
use rolling_economy::{ActionRequest, DispatchError, Dispatcher, EconomyContext, Response};
use rolling_store::MemoryStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the game configuration file.
const CONFIG_VAR: &str = "ROLLING_CONFIG";

/// Environment variable naming the world seed file.
const SEED_VAR: &str = "ROLLING_SEED";

const DEFAULT_CONFIG_PATH: &str = "rolling-config.yaml";

const DEFAULT_SEED_PATH: &str = "rolling-seed.json";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if startup fails, if stdin or stdout fail, or if a
/// request hits a failure that is not a game refusal.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("rolling-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        resources = config.resources.len(),
        stuffs = config.stuffs.len(),
        builds = config.builds.len(),
        "Configuration loaded"
    );

    // 3. Seed the world.
    let (store, affinities) = load_seed()?.into_world()?;
    let dispatcher = Dispatcher::new(EconomyContext::new(config, affinities));

    // 4. Optional persistence.
    let pool = match PostgresConfig::from_env()? {
        Some(db_config) => {
            let pool = PostgresPool::connect(&db_config).await?;
            pool.run_migrations().await?;
            Some(pool)
        }
        None => {
            info!("DATABASE_URL not set, running without persistence");
            None
        }
    };

    // 5. Serve.
    let mut session = Session {
        dispatcher,
        store,
        pool,
    };
    let served = session.serve().await?;

    // 6. Snapshot.
    session.snapshot().await?;
    if let Some(pool) = &session.pool {
        pool.close().await;
    }

    info!(requests = served, "rolling-engine shutdown complete");
    Ok(())
}

/// Load the game configuration.
///
/// A missing file at the default path falls back to an empty
/// configuration. A path given explicitly must exist.
fn load_config() -> Result<GameConfig, EngineError> {
    match std::env::var_os(CONFIG_VAR) {
        Some(path) => Ok(GameConfig::from_file(&PathBuf::from(path))?),
        None => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                Ok(GameConfig::from_file(path)?)
            } else {
                info!("Config file not found, using defaults");
                Ok(GameConfig::default())
            }
        }
    }
}

/// Load the world seed, with the same fallback rules as [`load_config`].
fn load_seed() -> Result<WorldSeed, EngineError> {
    match std::env::var_os(SEED_VAR) {
        Some(path) => Ok(WorldSeed::from_file(&PathBuf::from(path))?),
        None => {
            let path = Path::new(DEFAULT_SEED_PATH);
            if path.exists() {
                Ok(WorldSeed::from_file(path)?)
            } else {
                info!("Seed file not found, starting from an empty world");
                Ok(WorldSeed::default())
            }
        }
    }
}

// -----------------------------------------------------------------------
// Session
// -----------------------------------------------------------------------

/// Everything one engine run works on.
struct Session {
    dispatcher: Dispatcher,
    store: MemoryStore,
    pool: Option<PostgresPool>,
}

impl Session {
    /// Serve stdin until it closes. Returns the number of requests handled.
    async fn serve(&mut self) -> Result<u64, EngineError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let mut served: u64 = 0;

        while let Some(line) = lines.next_line().await? {
            let Some(reply) = self.handle_line(&line)? else {
                continue;
            };
            stdout.write_all(reply.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
            self.flush_ledger().await?;
            served = served.saturating_add(1);
        }
        Ok(served)
    }

    /// Handle one input line and return the encoded response.
    ///
    /// Blank lines, malformed requests and requests without a needed
    /// target are logged and skipped.
    fn handle_line(&mut self, line: &str) -> Result<Option<String>, EngineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let request: ActionRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed request");
                return Ok(None);
            }
        };

        let response = match self.dispatcher.dispatch(&mut self.store, &request) {
            Ok(response) => response,
            Err(DispatchError::MissingTarget(action_type)) => {
                tracing::warn!(
                    ?action_type,
                    actor = %request.actor,
                    "Skipping request without target"
                );
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(error = %e, actor = %request.actor, "Request failed");
                return Err(e.into());
            }
        };
        Ok(Some(encode(&response)?))
    }

    /// Append committed ledger entries to the database.
    async fn flush_ledger(&mut self) -> Result<(), EngineError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let entries = self.store.drain_ledger()?;
        LedgerStore::new(pool.pool()).batch_insert(&entries).await?;
        Ok(())
    }

    /// Save the final holdings.
    async fn snapshot(&self) -> Result<(), EngineError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        let resources: Vec<_> = self.store.resource_rows().cloned().collect();
        HoldingsStore::new(pool.pool())
            .save(&resources, self.store.stuffs())
            .await?;
        Ok(())
    }
}

fn encode(response: &Response) -> Result<String, EngineError> {
    Ok(serde_json::to_string(response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_store::{MemoryAffinities, Store};
    use rolling_types::{CharacterId, GroundPoint, ResourceId, StorageLocation};

    fn session() -> (Session, CharacterId) {
        let alice = CharacterId::new();
        let seed = serde_json::json!({
            "characters": [{
                "id": alice,
                "name": "Alice",
                "action_points": "2",
                "position": { "world_row": 0, "world_col": 0, "zone_row": 1, "zone_col": 1 }
            }],
            "resources": [{
                "location": { "kind": "ground", "at": { "world_row": 0, "world_col": 0, "zone_row": 1, "zone_col": 1 } },
                "resource_id": "WOOD",
                "quantity": "500"
            }]
        })
        .to_string();
        let config = GameConfig::parse("resources:\n  WOOD: { name: Bois, unit: gram }\n")
            .unwrap_or_default();
        let (store, _) = WorldSeed::parse(&seed)
            .and_then(WorldSeed::into_world)
            .unwrap_or_else(|_| (MemoryStore::new(), MemoryAffinities::new()));
        let session = Session {
            dispatcher: Dispatcher::new(EconomyContext::new(config, MemoryAffinities::new())),
            store,
            pool: None,
        };
        (session, alice)
    }

    #[test]
    fn blank_and_malformed_lines_are_skipped() {
        let (mut session, _) = session();
        assert!(matches!(session.handle_line("   "), Ok(None)));
        assert!(matches!(session.handle_line("{not json"), Ok(None)));
        let untargeted = serde_json::json!({
            "action_type": "take_from_build",
            "actor": CharacterId::new(),
        })
        .to_string();
        assert!(matches!(session.handle_line(&untargeted), Ok(None)));
    }

    #[test]
    fn request_line_gets_a_response_line() {
        let (mut session, alice) = session();
        let line = serde_json::json!({
            "action_type": "pick_up_from_ground",
            "actor": alice,
            "params": { "resource_id": "WOOD", "quantity": "200" }
        })
        .to_string();

        let reply = session.handle_line(&line);

        assert!(reply.is_ok_and(|r| r.is_some_and(|r| r.contains("\"result\":\"done\""))));
        assert_eq!(
            session.store.resource_quantity(
                &StorageLocation::Ground(GroundPoint::new(0, 0, 1, 1)),
                &ResourceId::from("WOOD")
            ),
            rust_decimal::Decimal::from(300)
        );
    }

    #[test]
    fn unknown_target_is_refused_and_serving_continues() {
        let (mut session, alice) = session();
        let give = serde_json::json!({
            "action_type": "give_to_character",
            "actor": alice,
            "target": CharacterId::new(),
            "params": { "resource_id": "WOOD", "quantity": "10" }
        })
        .to_string();

        let reply = session.handle_line(&give);

        assert!(reply.is_ok_and(|r| r.is_some_and(|r| r.contains("\"result\":\"refused\""))));
        let pick_up = serde_json::json!({
            "action_type": "pick_up_from_ground",
            "actor": alice,
            "params": { "resource_id": "WOOD", "quantity": "100" }
        })
        .to_string();
        assert!(
            session
                .handle_line(&pick_up)
                .is_ok_and(|r| r.is_some_and(|r| r.contains("\"result\":\"done\"")))
        );
    }

    #[test]
    fn unknown_actor_stops_the_loop() {
        let (mut session, _) = session();
        let line = serde_json::json!({
            "action_type": "drop_on_ground",
            "actor": CharacterId::new(),
        })
        .to_string();
        assert!(matches!(
            session.handle_line(&line),
            Err(EngineError::Dispatch { .. })
        ));
    }
}
