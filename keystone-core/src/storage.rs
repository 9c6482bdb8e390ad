//! In-memory session storage
//!
//! [`SessionStore`] owns every live [`Session`] and keeps three indexes next to
//! it: user id → session ids, access-token digest → session id, and
//! refresh-token digest → [`RefreshEntry`]. Index entries never outlive their
//! session.
//!
//! # Locking
//!
//! All tables sit behind a single `RwLock`. Every public method acquires the
//! lock exactly once and contains no await points, so each operation is atomic
//! with respect to all others and cannot be interrupted by the cancellation of
//! a calling future. In particular [`SessionStore::create_bounded`] inserts a
//! session and enforces the per-user cap in one critical section, so two
//! concurrent logins for the same user cannot both slip past the limit.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::{
    Error, Session, UserId,
    crypto::{constant_time_compare, hash_token},
    error::AuthenticationError,
    session::SessionId,
};

/// Back-reference from a refresh token to the session it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshEntry {
    pub user_id: UserId,
    pub session_id: SessionId,
}

/// Replacement tokens for [`SessionStore::replace_tokens`]
#[derive(Debug, Clone)]
pub struct TokenReplacement {
    pub access_token: String,
    /// New refresh token and its expiry, when rotating
    pub refresh_token: Option<(String, DateTime<Utc>)>,
}

struct StoredSession {
    session: Session,
    // Creation order, breaks ties between equal `last_activity` values
    seq: u64,
}

#[derive(Default)]
struct SessionTables {
    sessions: HashMap<SessionId, StoredSession>,
    by_user: HashMap<UserId, BTreeSet<SessionId>>,
    by_access_token: HashMap<String, SessionId>,
    refresh_index: HashMap<String, RefreshEntry>,
    next_seq: u64,
}

impl SessionTables {
    fn insert(&mut self, session: Session) {
        self.remove(&session.session_id);

        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_user
            .entry(session.user_id.clone())
            .or_default()
            .insert(session.session_id.clone());
        self.by_access_token
            .insert(hash_token(&session.access_token), session.session_id.clone());
        self.refresh_index.insert(
            hash_token(&session.refresh_token),
            RefreshEntry {
                user_id: session.user_id.clone(),
                session_id: session.session_id.clone(),
            },
        );
        self.sessions
            .insert(session.session_id.clone(), StoredSession { session, seq });
    }

    fn remove(&mut self, session_id: &SessionId) -> Option<Session> {
        let StoredSession { session, .. } = self.sessions.remove(session_id)?;

        if let Some(ids) = self.by_user.get_mut(&session.user_id) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.by_user.remove(&session.user_id);
            }
        }
        self.by_access_token.remove(&hash_token(&session.access_token));
        self.refresh_index.remove(&hash_token(&session.refresh_token));

        Some(session)
    }

    /// Evict down to `max_sessions`, never choosing `keep`
    fn enforce_bound(
        &mut self,
        user_id: &UserId,
        max_sessions: usize,
        keep: Option<&SessionId>,
    ) -> Vec<SessionId> {
        let Some(ids) = self.by_user.get(user_id) else {
            return Vec::new();
        };
        if ids.len() <= max_sessions {
            return Vec::new();
        }
        let excess = ids.len() - max_sessions;

        let mut candidates: Vec<(DateTime<Utc>, u64, SessionId)> = ids
            .iter()
            .filter(|id| Some(*id) != keep)
            .filter_map(|id| {
                self.sessions
                    .get(id)
                    .map(|stored| (stored.session.last_activity, stored.seq, id.clone()))
            })
            .collect();
        candidates.sort();

        candidates
            .into_iter()
            .take(excess)
            .map(|(_, _, id)| {
                self.remove(&id);
                tracing::info!(
                    user_id = %user_id,
                    session_id = %id,
                    "Evicted least recently active session"
                );
                id
            })
            .collect()
    }
}

/// Shared store of live sessions
#[derive(Default)]
pub struct SessionStore {
    tables: RwLock<SessionTables>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation leaves the tables consistent before it can panic, so a
    // poisoned lock still guards valid data.
    fn read(&self) -> RwLockReadGuard<'_, SessionTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a session and index its tokens
    pub fn create(&self, session: Session) {
        self.write().insert(session);
    }

    /// Store a session and evict the user's least recently active sessions
    /// until at most `max_sessions` remain, as one atomic step
    ///
    /// The new session itself is never evicted, even if another session of
    /// the same user recorded activity after it was built. Returns the ids of
    /// evicted sessions.
    pub fn create_bounded(&self, session: Session, max_sessions: usize) -> Vec<SessionId> {
        let user_id = session.user_id.clone();
        let session_id = session.session_id.clone();
        let mut tables = self.write();
        tables.insert(session);
        tables.enforce_bound(&user_id, max_sessions, Some(&session_id))
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Session> {
        self.read()
            .sessions
            .get(session_id)
            .map(|stored| stored.session.clone())
    }

    /// Any one session belonging to `user_id`
    ///
    /// Which session is returned when the user has several is unspecified;
    /// address sessions by [`SessionId`] when a specific one is needed.
    pub fn get_by_user_id(&self, user_id: &UserId) -> Option<Session> {
        let tables = self.read();
        tables
            .by_user
            .get(user_id)?
            .iter()
            .find_map(|id| tables.sessions.get(id))
            .map(|stored| stored.session.clone())
    }

    /// All sessions of a user, least recently active first
    pub fn list_for_user(&self, user_id: &UserId) -> Vec<Session> {
        let tables = self.read();
        let mut sessions: Vec<&StoredSession> = tables
            .by_user
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.sessions.get(id))
            .collect();
        sessions.sort_by_key(|stored| (stored.session.last_activity, stored.seq));
        sessions
            .into_iter()
            .map(|stored| stored.session.clone())
            .collect()
    }

    /// Look up the session whose current access token is `access_token`
    /// and record activity on it
    pub fn touch_by_access_token(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Option<Session> {
        let mut tables = self.write();
        let session_id = tables.by_access_token.get(&hash_token(access_token))?.clone();
        let stored = tables.sessions.get_mut(&session_id)?;
        if stored.session.last_activity < now {
            stored.session.last_activity = now;
        }
        Some(stored.session.clone())
    }

    pub fn find_by_refresh_token(&self, refresh_token: &str) -> Option<RefreshEntry> {
        self.read()
            .refresh_index
            .get(&hash_token(refresh_token))
            .cloned()
    }

    /// Swap in new tokens for the session owning `refresh_token`
    ///
    /// The previous access token stops resolving to the session. When the
    /// replacement carries a refresh token the old one is unindexed as well.
    pub fn replace_tokens(
        &self,
        refresh_token: &str,
        replacement: TokenReplacement,
        now: DateTime<Utc>,
    ) -> Result<Session, Error> {
        let mut guard = self.write();
        let tables = &mut *guard;

        let old_refresh_digest = hash_token(refresh_token);
        let entry = tables
            .refresh_index
            .get(&old_refresh_digest)
            .cloned()
            .ok_or(AuthenticationError::RefreshTokenNotFound)?;
        let stored = tables
            .sessions
            .get_mut(&entry.session_id)
            .ok_or(AuthenticationError::RefreshTokenNotFound)?;
        if !constant_time_compare(
            stored.session.refresh_token.as_bytes(),
            refresh_token.as_bytes(),
        ) {
            return Err(AuthenticationError::RefreshTokenNotFound.into());
        }

        let session = &mut stored.session;
        tables
            .by_access_token
            .remove(&hash_token(&session.access_token));
        tables.by_access_token.insert(
            hash_token(&replacement.access_token),
            session.session_id.clone(),
        );
        session.access_token = replacement.access_token;

        if let Some((new_refresh, expires_at)) = replacement.refresh_token {
            tables.refresh_index.remove(&old_refresh_digest);
            tables.refresh_index.insert(hash_token(&new_refresh), entry);
            session.refresh_token = new_refresh;
            session.refresh_expires_at = expires_at;
        }

        if session.last_activity < now {
            session.last_activity = now;
        }
        Ok(session.clone())
    }

    /// Remove a session together with its index entries
    pub fn invalidate(&self, session_id: &SessionId) -> Option<Session> {
        self.write().remove(session_id)
    }

    /// Remove every session of a user, returning how many were removed
    pub fn invalidate_all(&self, user_id: &UserId) -> usize {
        let mut tables = self.write();
        let ids: Vec<SessionId> = tables
            .by_user
            .get(user_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.iter()
            .filter(|id| tables.remove(id).is_some())
            .count()
    }

    /// Evict the user's least recently active sessions until at most
    /// `max_sessions` remain, returning the evicted ids
    pub fn enforce_bound(&self, user_id: &UserId, max_sessions: usize) -> Vec<SessionId> {
        self.write().enforce_bound(user_id, max_sessions, None)
    }

    /// Remove sessions whose refresh token has expired
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.write();
        let expired: Vec<SessionId> = tables
            .sessions
            .values()
            .filter(|stored| stored.session.is_expired_at(now))
            .map(|stored| stored.session.session_id.clone())
            .collect();
        for id in &expired {
            tables.remove(id);
        }
        expired.len()
    }

    pub fn count_for_user(&self, user_id: &UserId) -> usize {
        self.read().by_user.get(user_id).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
