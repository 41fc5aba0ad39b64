//! Application context: owns the one session for this process.
//!
//! `App` wires configuration, the HTTP gateway, the snapshot store, the
//! session and the navigation guard together, and hands out references.

use anyhow::Result;
use tracing::{debug, info, warn};
use zewi_core::{
    Config, FileSnapshotStore, GuardConfig, HttpAuthGateway, MemorySnapshotStore,
    NavigationGuard, PersistenceAdapter, RouteTable, SessionConfig, SessionStore, UserProfile,
};

/// Snapshot backend chosen at startup.
pub enum Snapshot {
    File(FileSnapshotStore),
    Memory(MemorySnapshotStore),
}

impl PersistenceAdapter for Snapshot {
    fn load(&self) -> Option<UserProfile> {
        match self {
            Snapshot::File(store) => store.load(),
            Snapshot::Memory(store) => store.load(),
        }
    }

    fn save(&self, user: Option<&UserProfile>) {
        match self {
            Snapshot::File(store) => store.save(user),
            Snapshot::Memory(store) => store.save(user),
        }
    }
}

pub type Store = SessionStore<HttpAuthGateway, Snapshot>;

pub struct App {
    pub config: Config,
    pub session: Store,
    pub guard: NavigationGuard,
    pub routes: RouteTable,
}

impl App {
    /// Build the context and start the initial auth check.
    pub fn new(config: Config, ephemeral: bool) -> Result<Self> {
        let gateway = HttpAuthGateway::from_config(&config)?;
        debug!(base_url = gateway.base_url(), "Gateway configured");

        let snapshot = if ephemeral {
            Snapshot::Memory(MemorySnapshotStore::new())
        } else {
            let dir = config.data_dir()?;
            debug!(?dir, "Snapshot directory configured");
            Snapshot::File(FileSnapshotStore::new(dir))
        };

        let session = SessionStore::start(gateway, snapshot, SessionConfig::from(&config));
        let guard = NavigationGuard::for_store(&session, GuardConfig::from(&config));
        info!(ephemeral, "Session started");

        Ok(Self {
            config,
            session,
            guard,
            routes: RouteTable::default(),
        })
    }

    /// When the on-disk snapshot was last written, if there is one.
    pub fn snapshot_saved_at(&self) -> Option<String> {
        match self.session.persistence() {
            Snapshot::File(store) => store.saved_at().map(|at| at.to_rfc3339()),
            Snapshot::Memory(_) => None,
        }
    }

    /// Remember the last email used to log in.
    pub fn remember_email(&mut self, email: &str) {
        if self.config.last_email.as_deref() == Some(email) {
            return;
        }
        self.config.last_email = Some(email.to_string());
        if let Err(e) = Config::update_saved(|saved| saved.last_email = Some(email.to_string())) {
            warn!(error = %e, "Failed to save config");
        }
    }
}
