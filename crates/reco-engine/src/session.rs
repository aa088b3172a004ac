use reco_crypto::MasterKey;
use reco_storage::ObjectStorage;

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No bootstrap record yet.
    Uninitialized,
    /// Account exists, no master key in memory.
    Locked,
    /// Master key resolved, no cloud storage configured.
    Unlocked,
    /// Master key resolved and cloud storage attached.
    Ready,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Locked => "locked",
            EngineState::Unlocked => "unlocked",
            EngineState::Ready => "ready",
        })
    }
}

/// Credentials held between login and logout.
#[derive(Debug, Default)]
pub(crate) struct Session {
    pub master_key: Option<MasterKey>,
    pub storage: Option<ObjectStorage>,
}

impl Session {
    pub fn clear(&mut self) {
        self.master_key = None;
        self.storage = None;
    }

    pub fn state(&self, account_exists: bool) -> EngineState {
        match (account_exists, &self.master_key, &self.storage) {
            (false, _, _) => EngineState::Uninitialized,
            (true, None, _) => EngineState::Locked,
            (true, Some(_), None) => EngineState::Unlocked,
            (true, Some(_), Some(_)) => EngineState::Ready,
        }
    }
}
