use crate::errors::BotError;
use crate::modules::session::model::Session;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory per-conversation session slots plus the active-job set.
///
/// One slot per conversation with overwrite-on-put semantics: a second upload
/// before a selection discards the prior session, and `put` hands the
/// displaced record back so the caller can clean up its staged file. `get` on
/// an unknown or cleared conversation is simply `None` — a recoverable
/// user-facing condition, never a crash.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    sessions: HashMap<Uuid, Session>,
    active_jobs: HashSet<Uuid>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sessions: HashMap::new(),
                active_jobs: HashSet::new(),
            })),
        }
    }

    /// Insert or overwrite; returns the displaced session, if any.
    pub fn put(&self, conversation: Uuid, session: Session) -> Option<Session> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(conversation, session)
    }

    /// Like `put`, but refuses while a job is active for the conversation.
    /// Check and insert happen under one lock: a job claiming the slot
    /// concurrently can never have its session displaced.
    pub fn put_if_idle(
        &self,
        conversation: Uuid,
        session: Session,
    ) -> Result<Option<Session>, BotError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.active_jobs.contains(&conversation) {
            return Err(BotError::JobAlreadyRunning);
        }
        Ok(inner.sessions.insert(conversation, session))
    }

    pub fn get(&self, conversation: Uuid) -> Option<Session> {
        self.inner.lock().unwrap().sessions.get(&conversation).cloned()
    }

    pub fn clear(&self, conversation: Uuid) -> Option<Session> {
        self.inner.lock().unwrap().sessions.remove(&conversation)
    }

    /// Claim the single job slot for a conversation. `None` while another job
    /// for the same conversation is in flight; the returned guard releases the
    /// slot on drop.
    pub fn try_begin_job(&self, conversation: Uuid) -> Option<JobGuard> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.active_jobs.insert(conversation) {
            return None;
        }
        Some(JobGuard {
            store: self.clone(),
            conversation,
        })
    }

    pub fn is_job_active(&self, conversation: Uuid) -> bool {
        self.inner.lock().unwrap().active_jobs.contains(&conversation)
    }
}

/// Mutual-exclusion token: at most one active job per conversation identity.
pub struct JobGuard {
    store: SessionStore,
    conversation: Uuid,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.store
            .inner
            .lock()
            .unwrap()
            .active_jobs
            .remove(&self.conversation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::session::model::Resolution;
    use std::path::PathBuf;

    fn session(path: &str) -> Session {
        Session::new(
            PathBuf::from(path),
            Resolution {
                width: 1920,
                height: 1080,
            },
        )
    }

    #[test]
    fn get_on_unknown_conversation_is_none() {
        let store = SessionStore::new();
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn put_overwrites_and_returns_displaced_session() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();

        assert!(store.put(id, session("/tmp/first.mp4")).is_none());
        let displaced = store.put(id, session("/tmp/second.mp4")).unwrap();
        assert_eq!(displaced.input_path, PathBuf::from("/tmp/first.mp4"));
        assert_eq!(
            store.get(id).unwrap().input_path,
            PathBuf::from("/tmp/second.mp4")
        );
    }

    #[test]
    fn clear_empties_the_slot() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        store.put(id, session("/tmp/a.mp4"));
        assert!(store.clear(id).is_some());
        assert!(store.get(id).is_none());
        assert!(store.clear(id).is_none());
    }

    #[test]
    fn job_guard_is_exclusive_per_conversation() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();

        let guard = store.try_begin_job(id).unwrap();
        assert!(store.is_job_active(id));
        assert!(store.try_begin_job(id).is_none());

        drop(guard);
        assert!(!store.is_job_active(id));
        assert!(store.try_begin_job(id).is_some());
    }

    #[test]
    fn put_if_idle_refuses_while_a_job_holds_the_slot() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        store.put(id, session("/tmp/running.mp4"));

        let guard = store.try_begin_job(id).unwrap();
        assert!(matches!(
            store.put_if_idle(id, session("/tmp/new.mp4")),
            Err(BotError::JobAlreadyRunning)
        ));
        // The running job's session is untouched.
        assert_eq!(
            store.get(id).unwrap().input_path,
            PathBuf::from("/tmp/running.mp4")
        );

        drop(guard);
        let displaced = store.put_if_idle(id, session("/tmp/new.mp4")).unwrap();
        assert_eq!(displaced.unwrap().input_path, PathBuf::from("/tmp/running.mp4"));
    }

    #[test]
    fn job_guards_are_independent_across_conversations() {
        let store = SessionStore::new();
        let _a = store.try_begin_job(Uuid::new_v4()).unwrap();
        let _b = store.try_begin_job(Uuid::new_v4()).unwrap();
    }
}
