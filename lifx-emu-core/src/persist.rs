//! Keeping the names and memberships a user gave the bulb across restarts.
//!
//! Saved state is tagged with a hash of the configured defaults.  If the configuration changes,
//! the hash no longer matches and the saved state is ignored, so editing the config always wins
//! over whatever was set from an app earlier.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh64::xxh64;

use crate::state::{DeviceDefaults, DeviceState, Membership};
use crate::types::{Guid, Label};

/// Somewhere to keep one blob between runs.
///
/// Implementations log their own failures.  A store that cannot be read behaves as if it were
/// empty.
pub trait PersistentStore {
    fn load(&self) -> Option<Vec<u8>>;
    fn save(&mut self, blob: &[u8]);
}

/// A store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub data: Option<Vec<u8>>,
}

impl PersistentStore for MemoryStore {
    fn load(&self) -> Option<Vec<u8>> {
        self.data.clone()
    }

    fn save(&mut self, blob: &[u8]) {
        self.data = Some(blob.to_vec());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMembership {
    pub guid: [u8; 16],
    pub label: [u8; 32],
    pub updated_at: u64,
}

impl From<&Membership> for PersistedMembership {
    fn from(m: &Membership) -> PersistedMembership {
        PersistedMembership {
            guid: m.guid.0,
            label: m.label.0,
            updated_at: m.updated_at,
        }
    }
}

impl From<&PersistedMembership> for Membership {
    fn from(m: &PersistedMembership) -> Membership {
        Membership {
            guid: Guid(m.guid),
            label: Label(m.label),
            updated_at: m.updated_at,
        }
    }
}

/// What is written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// [PersistenceGuard::defaults_hash] of the configuration this was saved under.
    pub hash: u64,
    pub label: [u8; 32],
    pub tags: [u8; 8],
    pub tag_labels: [u8; 32],
    pub location: PersistedMembership,
    pub group: PersistedMembership,
}

pub struct PersistenceGuard {
    hash: u64,
    store: Box<dyn PersistentStore>,
}

impl std::fmt::Debug for PersistenceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PersistenceGuard {{ hash: {:016x} }}", self.hash)
    }
}

impl PersistenceGuard {
    pub fn new(defaults: &DeviceDefaults, store: Box<dyn PersistentStore>) -> PersistenceGuard {
        PersistenceGuard {
            hash: Self::defaults_hash(defaults),
            store,
        }
    }

    /// Hash of the configured label, location and group.  Each field is length prefixed so that
    /// moving bytes from one field to the next changes the hash.
    pub fn defaults_hash(defaults: &DeviceDefaults) -> u64 {
        let mut buf = Vec::with_capacity(160);
        let mut field = |bytes: &[u8]| {
            buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(bytes);
        };
        field(defaults.label.as_bytes());
        field(defaults.location.label.as_bytes());
        field(&defaults.location.guid.0);
        field(defaults.group.label.as_bytes());
        field(&defaults.group.guid.0);
        xxh64(&buf, 0)
    }

    /// Overwrites the persisted fields of `state` with saved values, if there are any that were
    /// saved under the current defaults.  Returns true if anything was loaded.
    pub fn load(&self, state: &mut DeviceState) -> bool {
        let blob = match self.store.load() {
            Some(b) => b,
            None => {
                debug!("No saved state, using defaults");
                return false;
            }
        };
        let saved: PersistedState = match serde_json::from_slice(&blob) {
            Ok(s) => s,
            Err(e) => {
                warn!("Ignoring unreadable saved state: {}", e);
                return false;
            }
        };
        if saved.hash != self.hash {
            info!(
                "Configured defaults changed (saved hash {:016x}, now {:016x}), ignoring saved state",
                saved.hash, self.hash
            );
            return false;
        }

        state.label = Label(saved.label);
        state.tags = saved.tags;
        state.tag_labels = Label(saved.tag_labels);
        state.location = (&saved.location).into();
        state.group = (&saved.group).into();
        info!(
            "Loaded saved state: label {:?}, location {:?}, group {:?}",
            state.label.to_string(),
            state.location.label.to_string(),
            state.group.label.to_string()
        );
        true
    }

    pub fn save(&mut self, state: &DeviceState) {
        let saved = PersistedState {
            hash: self.hash,
            label: state.label.0,
            tags: state.tags,
            tag_labels: state.tag_labels.0,
            location: (&state.location).into(),
            group: (&state.group).into(),
        };
        match serde_json::to_vec(&saved) {
            Ok(blob) => {
                debug!("Saving state ({} bytes)", blob.len());
                self.store.save(&blob);
            }
            Err(e) => warn!("Unable to serialize state: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A memory store that can be inspected after it has been handed to a guard.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<Option<Vec<u8>>>>);

    impl PersistentStore for SharedStore {
        fn load(&self) -> Option<Vec<u8>> {
            self.0.lock().unwrap().clone()
        }
        fn save(&mut self, blob: &[u8]) {
            *self.0.lock().unwrap() = Some(blob.to_vec());
        }
    }

    fn changed_state(defaults: &DeviceDefaults) -> DeviceState {
        let mut state = DeviceState::from_defaults(defaults);
        state.label = Label::new("Renamed");
        state.tags = [1, 2, 3, 4, 5, 6, 7, 8];
        state.location = Membership::new(
            Guid::parse("11111111-2222-3333-4444-555555555555").unwrap(),
            "Office",
            42,
        );
        state
    }

    #[test]
    fn test_save_then_load() {
        let defaults = DeviceDefaults::default();
        let store = SharedStore::default();
        let mut guard = PersistenceGuard::new(&defaults, Box::new(store.clone()));
        guard.save(&changed_state(&defaults));

        let guard = PersistenceGuard::new(&defaults, Box::new(store));
        let mut fresh = DeviceState::from_defaults(&defaults);
        assert!(guard.load(&mut fresh));
        assert_eq!(&fresh.label, "Renamed");
        assert_eq!(fresh.tags, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&fresh.location.label, "Office");
        assert_eq!(fresh.location.updated_at, 42);
        assert_eq!(fresh.group, defaults.group);
    }

    #[test]
    fn test_changed_defaults_discard_saved_state() {
        let defaults = DeviceDefaults::default();
        let store = SharedStore::default();
        let mut guard = PersistenceGuard::new(&defaults, Box::new(store.clone()));
        guard.save(&changed_state(&defaults));

        let mut new_defaults = DeviceDefaults::default();
        new_defaults.group.label = Label::new("Kitchen");
        let guard = PersistenceGuard::new(&new_defaults, Box::new(store));
        let mut fresh = DeviceState::from_defaults(&new_defaults);
        assert!(!guard.load(&mut fresh));
        assert_eq!(&fresh.label, "LIFX Emulator");
        assert_eq!(&fresh.group.label, "Kitchen");
    }

    #[test]
    fn test_hash_covers_each_field() {
        let base = DeviceDefaults::default();
        let h = PersistenceGuard::defaults_hash(&base);
        assert_eq!(h, PersistenceGuard::defaults_hash(&base.clone()));

        let mut d = base.clone();
        d.label = Label::new("Other");
        assert_ne!(h, PersistenceGuard::defaults_hash(&d));

        let mut d = base.clone();
        d.location.guid.0[15] ^= 1;
        assert_ne!(h, PersistenceGuard::defaults_hash(&d));

        // color is not part of the identity
        let mut d = base;
        d.color.hue = 1234;
        assert_eq!(h, PersistenceGuard::defaults_hash(&d));
    }

    #[test]
    fn test_garbage_is_ignored() {
        let defaults = DeviceDefaults::default();
        let store = MemoryStore {
            data: Some(b"not json".to_vec()),
        };
        let guard = PersistenceGuard::new(&defaults, Box::new(store));
        let mut state = DeviceState::from_defaults(&defaults);
        assert!(!guard.load(&mut state));
        assert_eq!(state, DeviceState::from_defaults(&defaults));
    }
}
