//! [`KeyProfileRegistry`]: name to profile lookup plus the default profile.
//!
//! The registry is an explicitly constructed handle rather than process
//! global state. Clone it into every [`SealedValue`](crate::SealedValue) that
//! needs key lookup; all clones share the same table.
//!
//! Writes (`register`, `set_default`) are expected during startup. The table is
//! published through `arc-swap`, so lookups on the seal/unseal path never
//! block and a concurrent writer swaps in a complete new table atomically.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::error::SealError;
use crate::profile::{KeyProfile, KeyProfileSpec};

#[derive(Clone, Debug, Default)]
struct Profiles {
    by_name: HashMap<String, Arc<dyn KeyProfile>>,
    default: Option<String>,
}

/// Shared lookup table of key profiles with a designated default.
#[derive(Clone, Debug, Default)]
pub struct KeyProfileRegistry {
    inner: Arc<ArcSwap<Profiles>>,
}

impl KeyProfileRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured profile specs.
    ///
    /// Profiles are registered in order, so the first spec becomes the
    /// default unless `default` names another one.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidKey`] if a spec's key cannot be decoded, or
    /// [`SealError::KeyProfileNotFound`] if `default` names no configured spec.
    pub fn from_specs(specs: &[KeyProfileSpec], default: Option<&str>) -> Result<Self, SealError> {
        let registry = Self::new();
        for spec in specs {
            registry.register(spec.to_profile()?);
        }
        if let Some(name) = default {
            let profile = registry
                .load(name)
                .ok_or_else(|| SealError::KeyProfileNotFound(name.to_owned()))?;
            registry.set_default_shared(profile);
        }
        Ok(registry)
    }

    /// Insert or replace the profile registered under `profile.name()`.
    ///
    /// The first profile registered into an empty registry also becomes the
    /// default.
    pub fn register<P: KeyProfile + 'static>(&self, profile: P) {
        self.register_shared(Arc::new(profile));
    }

    /// [`register`](Self::register) for an already shared profile.
    pub fn register_shared(&self, profile: Arc<dyn KeyProfile>) {
        let name = profile.name().to_owned();
        let previous = self.inner.rcu(|current| {
            let mut next = Profiles::clone(current);
            if next.by_name.is_empty() && next.default.is_none() {
                next.default = Some(name.clone());
            }
            next.by_name.insert(name.clone(), Arc::clone(&profile));
            next
        });

        let replaced = previous.by_name.contains_key(&name);
        let is_default = self.inner.load().default.as_deref() == Some(name.as_str());
        let fingerprint = profile.fingerprint();
        info!(
            profile = %name,
            rolled = profile.should_be_rolled(),
            fingerprint = fingerprint.as_deref().unwrap_or("-"),
            replaced,
            is_default,
            "key profile registered"
        );
        if is_default && profile.should_be_rolled() {
            warn!(profile = %name, "default key profile is marked to be rolled");
        }
    }

    /// Look up a profile by name. Pure lookup; never constructs anything.
    pub fn load(&self, name: &str) -> Option<Arc<dyn KeyProfile>> {
        self.inner.load().by_name.get(name).cloned()
    }

    /// Make `profile` the default, registering it if needed.
    pub fn set_default<P: KeyProfile + 'static>(&self, profile: P) {
        self.set_default_shared(Arc::new(profile));
    }

    /// [`set_default`](Self::set_default) for an already shared profile.
    pub fn set_default_shared(&self, profile: Arc<dyn KeyProfile>) {
        let name = profile.name().to_owned();
        self.inner.rcu(|current| {
            let mut next = Profiles::clone(current);
            next.by_name.insert(name.clone(), Arc::clone(&profile));
            next.default = Some(name.clone());
            next
        });
        info!(profile = %name, "default key profile set");
        if profile.should_be_rolled() {
            warn!(profile = %name, "default key profile is marked to be rolled");
        }
    }

    /// The current default profile.
    ///
    /// # Panics
    ///
    /// Panics if no profile has ever been registered. Sealing without key
    /// material is a setup error, not a recoverable condition.
    #[track_caller]
    pub fn default_profile(&self) -> Arc<dyn KeyProfile> {
        match self.try_default_profile() {
            Some(profile) => profile,
            None => panic!("no default key profile: register a key profile before sealing values"),
        }
    }

    /// The current default profile, or `None` if none is set.
    pub fn try_default_profile(&self) -> Option<Arc<dyn KeyProfile>> {
        let profiles = self.inner.load();
        let name = profiles.default.as_deref()?;
        profiles.by_name.get(name).cloned()
    }

    /// Resolve the profile for a stored name; `None` selects the default.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::KeyProfileNotFound`] if `name` is not registered.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn KeyProfile>, SealError> {
        match name {
            None => Ok(self.default_profile()),
            Some(name) => self
                .load(name)
                .ok_or_else(|| SealError::KeyProfileNotFound(name.to_owned())),
        }
    }

    /// All registered profiles, sorted by name.
    pub fn profiles(&self) -> Vec<Arc<dyn KeyProfile>> {
        let mut all: Vec<_> = self.inner.load().by_name.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Name of the current default profile, if any.
    pub fn default_name(&self) -> Option<String> {
        self.inner.load().default.clone()
    }

    /// Number of registered profiles.
    pub fn len(&self) -> usize {
        self.inner.load().by_name.len()
    }

    /// Return `true` if no profiles are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.load().by_name.is_empty()
    }
}
