//! In-memory directory.
//!
//! A [`MemoryDirectory`] holds entries and passwords behind a lock and acts as
//! its own [`Connector`]. Clones share state, so a test can keep a handle and
//! inspect what a source wrote. It can be taken offline to simulate an
//! unreachable server, or told to reject password modifications.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use staffio_core::{DirectoryError, DirectoryResult};

use crate::config::SourceConfig;
use crate::connection::{Connector, DirectoryConnection, Entry, SearchScope};

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    passwords: HashMap<String, String>,
    offline: bool,
    reject_modify: bool,
    connects: usize,
}

/// Shared in-memory directory.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    addr: String,
    state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
    /// Empty directory reporting `addr` in its errors.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            state: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the maps consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Address this directory reports.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Adds or replaces an entry with a password.
    pub fn insert(&self, entry: Entry, password: impl Into<String>) {
        let mut state = self.lock();
        state.passwords.insert(entry.dn.clone(), password.into());
        state.entries.insert(entry.dn.clone(), entry);
    }

    /// Adds a bindable identity without attributes.
    pub fn add_identity(&self, dn: impl Into<String>, password: impl Into<String>) {
        self.insert(
            Entry {
                dn: dn.into(),
                attrs: HashMap::new(),
            },
            password,
        );
    }

    /// Current password of `dn`.
    #[must_use]
    pub fn password(&self, dn: &str) -> Option<String> {
        self.lock().passwords.get(dn).cloned()
    }

    /// Makes every later connect and operation fail with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Makes password modifications fail after a successful bind.
    pub fn set_reject_modify(&self, reject: bool) {
        self.lock().reject_modify = reject;
    }

    /// Number of sessions opened so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    fn ensure_online(&self, state: &State) -> DirectoryResult<()> {
        if state.offline {
            return Err(DirectoryError::connection(&self.addr, "connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for MemoryDirectory {
    async fn connect(&self, _config: &SourceConfig) -> DirectoryResult<Box<dyn DirectoryConnection>> {
        let mut state = self.lock();
        self.ensure_online(&state)?;
        state.connects += 1;
        Ok(Box::new(MemorySession {
            directory: self.clone(),
            bound: None,
        }))
    }
}

struct MemorySession {
    directory: MemoryDirectory,
    bound: Option<String>,
}

#[async_trait]
impl DirectoryConnection for MemorySession {
    async fn bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()> {
        let state = self.directory.lock();
        self.directory.ensure_online(&state)?;

        match state.passwords.get(dn) {
            Some(stored) if !password.is_empty() && stored == password => {
                self.bound = Some(dn.to_owned());
                Ok(())
            }
            _ => {
                self.bound = None;
                Err(DirectoryError::auth_failed(&self.directory.addr, dn))
            }
        }
    }

    async fn password_modify(
        &mut self,
        user_dn: &str,
        old: Option<&str>,
        new: &str,
    ) -> DirectoryResult<()> {
        let addr = self.directory.addr.clone();
        let mut state = self.directory.lock();
        self.directory.ensure_online(&state)?;

        if self.bound.is_none() {
            return Err(DirectoryError::operation(addr, "insufficient access"));
        }
        if state.reject_modify {
            return Err(DirectoryError::operation(addr, "unwilling to perform"));
        }
        let Some(current) = state.passwords.get_mut(user_dn) else {
            return Err(DirectoryError::not_found(user_dn));
        };
        if let Some(old) = old
            && old != current.as_str()
        {
            return Err(DirectoryError::operation(addr, "old password mismatch"));
        }
        *current = new.to_owned();
        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        _attrs: &[&str],
    ) -> DirectoryResult<Vec<Entry>> {
        let state = self.directory.lock();
        self.directory.ensure_online(&state)?;

        // Supports the two filters sources issue: `(uid=..)` and
        // `(objectClass=*)`.
        let uid = filter
            .strip_prefix("(uid=")
            .and_then(|rest| rest.strip_suffix(')'));

        let mut found: Vec<Entry> = state
            .entries
            .values()
            .filter(|entry| match scope {
                SearchScope::Base => entry.dn == base,
                SearchScope::Subtree => entry.dn.ends_with(base),
            })
            .filter(|entry| uid.is_none_or(|uid| entry.first("uid") == uid))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.dn.cmp(&b.dn));
        Ok(found)
    }
}
