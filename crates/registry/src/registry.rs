// SPDX-License-Identifier: MIT

//! The runtime registry: a single reader/writer-locked map keyed by
//! runtime name, with heterogeneous (`Borrow<str>`) lookup so callers
//! never allocate a `RuntimeName` just to look one up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use sk_core::{LifecycleState, RuntimeId, RuntimeName};

use crate::config::RuntimeConfig;
use crate::error::{RegistryError, Result};
use crate::handle::RuntimeHandle;

struct Entry<H: RuntimeHandle> {
    id: RuntimeId,
    state: LifecycleState,
    config: RuntimeConfig,
    handle: Option<H>,
    created_at_epoch_ms: u64,
    started_at_epoch_ms: Option<u64>,
}

/// A point-in-time view of one runtime, cloned out from under the
/// lock for `ls`/`ps`/`show`.
#[derive(Debug, Clone)]
pub struct RuntimeView {
    pub id: RuntimeId,
    pub name: RuntimeName,
    pub state: LifecycleState,
    pub config: RuntimeConfig,
    pub connections: usize,
    pub created_at_epoch_ms: u64,
    pub started_at_epoch_ms: Option<u64>,
}

pub struct Registry<H: RuntimeHandle> {
    state_dir: PathBuf,
    inner: RwLock<HashMap<RuntimeName, Entry<H>>>,
}

impl<H: RuntimeHandle> Registry<H> {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into(), inner: RwLock::new(HashMap::new()) }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Load every persisted config in the state directory without
    /// starting anything; the daemon drives `start()` afterward for
    /// entries whose `was_running` flag was set.
    pub fn replay(&self, now_ms: u64) -> Result<Vec<RuntimeName>> {
        let mut started = Vec::new();
        for (name, config) in crate::persistence::replay_all(&self.state_dir)? {
            self.insert_created(name.clone(), config, now_ms)?;
            started.push(name);
        }
        Ok(started)
    }

    fn insert_created(&self, name: RuntimeName, config: RuntimeConfig, now_ms: u64) -> Result<()> {
        let mut guard = self.inner.write();
        guard.insert(
            name,
            Entry {
                id: RuntimeId::new(),
                state: LifecycleState::Created,
                config,
                handle: None,
                created_at_epoch_ms: now_ms,
                started_at_epoch_ms: None,
            },
        );
        Ok(())
    }

    /// Create a new runtime entry and persist its config. Does not
    /// start it — callers invoke `start()` separately so socket setup
    /// happens outside any lock.
    pub fn create(&self, name: RuntimeName, config: RuntimeConfig, now_ms: u64) -> Result<RuntimeId> {
        config.validate()?;
        {
            let guard = self.inner.read();
            if guard.contains_key(&name) {
                return Err(RegistryError::NameTaken(name.as_str().to_string()));
            }
        }
        crate::persistence::save(&self.state_dir, &name, &config)?;
        let id = RuntimeId::new();
        let mut guard = self.inner.write();
        guard.insert(
            name,
            Entry { id, state: LifecycleState::Created, config, handle: None, created_at_epoch_ms: now_ms, started_at_epoch_ms: None },
        );
        Ok(id)
    }

    /// Look up a runtime's config without holding the lock across the
    /// caller's reactor submission.
    pub fn config_for(&self, name: &str) -> Result<RuntimeConfig> {
        let guard = self.inner.read();
        guard.get(name).map(|e| e.config.clone()).ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Install a handle built by the caller from the config returned
    /// by `config_for`. The build step itself (reactor submissions)
    /// must happen between `config_for` and this call, outside any
    /// lock this registry holds.
    pub fn install_handle(&self, name: &str, handle: H, now_ms: u64) -> Result<()> {
        let mut guard = self.inner.write();
        let entry = guard.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if entry.handle.is_some() {
            return Err(RegistryError::AlreadyRunning(name.to_string()));
        }
        entry.handle = Some(handle);
        entry.state = LifecycleState::Running;
        entry.started_at_epoch_ms = Some(now_ms);
        entry.config.was_running = true;
        crate::persistence::save(&self.state_dir, &RuntimeName::parse(name)?, &entry.config)?;
        Ok(())
    }

    /// Run `f` against the running handle named `name`, under the
    /// write lock for exactly the duration of the call. Callers must
    /// not perform a reactor submission inside `f`.
    pub fn with_handle_mut<F, R>(&self, name: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut H) -> R,
    {
        let mut guard = self.inner.write();
        let entry = guard.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let handle = entry.handle.as_mut().ok_or_else(|| RegistryError::NotRunning(name.to_string()))?;
        Ok(f(handle))
    }

    pub fn mark_failed(&self, name: &str) -> Result<()> {
        let mut guard = self.inner.write();
        let entry = guard.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry.state = LifecycleState::Failed;
        Ok(())
    }

    /// Extract a running handle for teardown outside the lock,
    /// applying the owner's child policy to direct children in the
    /// same pass. Cascade is computed under the write lock by
    /// iterating the map once. The second element of the returned
    /// pair names every child whose handle was actually torn down
    /// here, so a caller tracking per-runtime resources outside this
    /// registry (listening/connection fds, say) knows which children
    /// to release too, not just the runtime it asked to stop.
    pub fn stop(&self, name: &str) -> Result<(H, Vec<RuntimeName>)> {
        let mut guard = self.inner.write();
        let handle = {
            let entry = guard.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            let handle = entry.handle.take().ok_or_else(|| RegistryError::NotRunning(name.to_string()))?;
            entry.state = LifecycleState::Stopped;
            entry.config.was_running = false;
            handle
        };

        let children: Vec<RuntimeName> = guard
            .iter()
            .filter(|(_, e)| e.config.owner.as_deref() == Some(name))
            .map(|(n, _)| n.clone())
            .collect();
        let mut removed = Vec::new();
        let mut torn_down = Vec::new();
        for child in children {
            if let Some(entry) = guard.get_mut(&child) {
                if let Some(mut h) = entry.handle.take() {
                    h.teardown();
                    torn_down.push(child.clone());
                }
                match entry.config.child_policy {
                    sk_core::ChildPolicy::Stop => entry.state = LifecycleState::Stopped,
                    sk_core::ChildPolicy::Remove => removed.push(child),
                }
            }
        }
        for child in &removed {
            guard.remove(child);
        }
        drop(guard);
        for child in &removed {
            let _ = crate::persistence::delete(&self.state_dir, child);
        }
        if let Ok(name) = RuntimeName::parse(name) {
            let _ = crate::persistence::save(&self.state_dir, &name, &self.config_for(name.as_str())?);
        }
        Ok((handle, torn_down))
    }

    /// Remove a runtime outright: tears down any live handle, deletes
    /// its persisted config, and drops the entry.
    pub fn remove(&self, name: &str) -> Result<Option<H>> {
        let mut guard = self.inner.write();
        let mut entry = guard.remove(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        drop(guard);
        let handle = entry.handle.take();
        let owned_name = RuntimeName::parse(name)?;
        crate::persistence::delete(&self.state_dir, &owned_name)?;
        Ok(handle)
    }

    /// Overwrite a runtime's persisted config in place, for the
    /// `edit`/`owner` commands. Does not touch a live handle — callers
    /// needing the change to take effect immediately must `stop`/`start`.
    pub fn update_config(&self, name: &str, config: RuntimeConfig) -> Result<()> {
        let mut guard = self.inner.write();
        let entry = guard.get_mut(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let owned_name = RuntimeName::parse(name)?;
        crate::persistence::save(&self.state_dir, &owned_name, &config)?;
        entry.config = config;
        Ok(())
    }

    pub fn rename(&self, old: &str, new: RuntimeName) -> Result<()> {
        let mut guard = self.inner.write();
        if guard.contains_key(&new) {
            return Err(RegistryError::NameTaken(new.as_str().to_string()));
        }
        let entry = guard.remove(old).ok_or_else(|| RegistryError::NotFound(old.to_string()))?;
        crate::persistence::save(&self.state_dir, &new, &entry.config)?;
        crate::persistence::delete(&self.state_dir, &RuntimeName::parse(old)?)?;
        guard.insert(new, entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<RuntimeView> {
        let guard = self.inner.read();
        let (name, entry) = guard.get_key_value(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(view(name.clone(), entry))
    }

    pub fn list(&self) -> Vec<RuntimeView> {
        let guard = self.inner.read();
        guard.iter().map(|(n, e)| view(n.clone(), e)).collect()
    }

    pub fn get_by_group(&self, group: &str) -> Vec<RuntimeView> {
        let guard = self.inner.read();
        guard
            .iter()
            .filter(|(_, e)| e.config.group.as_deref() == Some(group))
            .map(|(n, e)| view(n.clone(), e))
            .collect()
    }

    /// Tear down every running handle, for graceful shutdown.
    pub fn stop_all(&self) -> Vec<H> {
        let mut guard = self.inner.write();
        let mut handles = Vec::new();
        for entry in guard.values_mut() {
            if let Some(handle) = entry.handle.take() {
                entry.state = LifecycleState::Stopped;
                handles.push(handle);
            }
        }
        handles
    }

    /// Registry-level pub/sub dispatch: walk every running handle in
    /// iteration order and deliver the publication to any matching
    /// subscription.
    pub fn publish(&self, channel: &str, message: &[u8]) -> usize {
        let mut guard = self.inner.write();
        let mut delivered = 0;
        for entry in guard.values_mut() {
            if let Some(h) = entry.handle.as_mut() {
                if h.deliver_pubsub(channel, message) {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

fn view<H: RuntimeHandle>(name: RuntimeName, entry: &Entry<H>) -> RuntimeView {
    RuntimeView {
        id: entry.id,
        name,
        state: entry.state,
        config: entry.config.clone(),
        connections: entry.handle.as_ref().map(|h| h.connection_count()).unwrap_or(0),
        created_at_epoch_ms: entry.created_at_epoch_ms,
        started_at_epoch_ms: entry.started_at_epoch_ms,
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
