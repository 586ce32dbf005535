use std::collections::BTreeSet;

use anyhow::{bail, Result};

use super::{Identity, IdentityId};

/// The set of users chosen as recipients.
///
/// Membership is all that matters; iteration is in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<IdentityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id` if absent, deselect it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: IdentityId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn insert(&mut self, id: IdentityId) {
        self.ids.insert(id);
    }

    pub fn contains(&self, id: IdentityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = IdentityId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<IdentityId> for Selection {
    fn from_iter<I: IntoIterator<Item = IdentityId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Roster snapshot plus the operator's current selection, owned by the front end
/// for the duration of one run.
#[derive(Debug, Default)]
pub struct Session {
    roster: Vec<Identity>,
    pub selection: Selection,
}

impl Session {
    pub fn new(mut roster: Vec<Identity>) -> Self {
        roster.sort_by(|a, b| a.username.cmp(&b.username));
        Self {
            roster,
            selection: Selection::new(),
        }
    }

    pub fn roster(&self) -> &[Identity] {
        &self.roster
    }

    /// Users whose username contains `query`, ignoring case. An empty query matches all.
    pub fn filter(&self, query: &str) -> Vec<&Identity> {
        let query = query.to_lowercase();
        self.roster
            .iter()
            .filter(|u| query.is_empty() || u.username.to_lowercase().contains(&query))
            .collect()
    }

    pub fn toggle(&mut self, id: IdentityId) -> bool {
        self.selection.toggle(id)
    }

    /// Select a user by username (case-insensitive) or numeric id.
    pub fn select_by_name(&mut self, name: &str) -> Result<&Identity> {
        let name = name.trim().trim_start_matches('@');
        let found = self
            .roster
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(name))
            .or_else(|| {
                name.parse::<IdentityId>()
                    .ok()
                    .and_then(|id| self.roster.iter().find(|u| u.id == id))
            });

        match found {
            Some(user) => {
                self.selection.insert(user.id);
                Ok(user)
            }
            None => bail!("unknown user '{}'", name),
        }
    }

    /// Selected users in roster (username) order.
    pub fn selected_identities(&self) -> Vec<&Identity> {
        self.roster
            .iter()
            .filter(|u| self.selection.contains(u.id))
            .collect()
    }

    pub fn username(&self, id: IdentityId) -> Option<&str> {
        self.roster
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.as_str())
    }
}

/// Mask a username for screen recordings: keep the first two characters.
pub fn censor(username: &str) -> String {
    let count = username.chars().count();
    if count <= 2 {
        return username.to_string();
    }
    let head: String = username.chars().take(2).collect();
    format!("{}{}", head, "*".repeat(count - 2))
}
