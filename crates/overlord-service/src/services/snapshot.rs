//! Role/member snapshot cache
//!
//! In-memory projection of the guild's roles (rebuilt by role sync) and of
//! the bot accounts seen so far. Only the sync service writes roles here.

use std::collections::{HashMap, HashSet};

use overlord_core::entities::Role;
use overlord_core::value_objects::{RoleMask, Snowflake};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    /// Ordered by `idx`
    roles: Vec<Role>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<Snowflake, usize>,
    bots: HashSet<Snowflake>,
}

#[derive(Debug, Default)]
pub struct Snapshot {
    inner: RwLock<Inner>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the role index with a freshly indexed role list
    pub fn load_roles(&self, mut roles: Vec<Role>) {
        roles.sort_by_key(|r| r.idx);
        let by_name = roles
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.name.clone(), pos))
            .collect();
        let by_id = roles.iter().enumerate().map(|(pos, r)| (r.id, pos)).collect();

        let mut inner = self.inner.write();
        inner.roles = roles;
        inner.by_name = by_name;
        inner.by_id = by_id;
    }

    pub fn role_count(&self) -> usize {
        self.inner.read().roles.len()
    }

    pub fn roles(&self) -> Vec<Role> {
        self.inner.read().roles.clone()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    pub fn role_id(&self, name: &str) -> Option<Snowflake> {
        let inner = self.inner.read();
        inner.by_name.get(name).map(|&pos| inner.roles[pos].id)
    }

    /// Ids for the given names; unknown names are dropped
    pub fn role_ids<S: AsRef<str>>(&self, names: &[S]) -> Vec<Snowflake> {
        let inner = self.inner.read();
        names
            .iter()
            .filter_map(|n| inner.by_name.get(n.as_ref()))
            .map(|&pos| inner.roles[pos].id)
            .collect()
    }

    /// Names of the given role ids, in the order given; unknown ids are dropped
    pub fn role_names(&self, ids: &[Snowflake]) -> Vec<String> {
        let inner = self.inner.read();
        ids.iter()
            .filter_map(|id| inner.by_id.get(id))
            .map(|&pos| inner.roles[pos].name.clone())
            .collect()
    }

    /// Bitmask over the current role index
    pub fn mask_for(&self, ids: &[Snowflake]) -> RoleMask {
        let inner = self.inner.read();
        let indices = ids
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter_map(|&pos| usize::try_from(inner.roles[pos].idx).ok());
        RoleMask::from_indices(inner.roles.len(), indices)
    }

    pub fn mark_bot(&self, id: Snowflake) {
        self.inner.write().bots.insert(id);
    }

    pub fn is_bot(&self, id: Snowflake) -> bool {
        self.inner.read().bots.contains(&id)
    }
}
