/*!
 * Session Coordinator
 * Pairs writer and reader opens into sessions and owns the single lock
 *
 * Every open, close, read and write on every session runs under one mutex.
 * One condition variable carries every wakeup and is always broadcast, so a
 * woken reader re-checks its predicate before it proceeds.
 */

use super::alloc::{BudgetAllocator, BufferAllocator, SystemAllocator};
use super::buffer::CircularBuffer;
use super::config::{PairingPolicy, PipeConfig};
use super::session::PipeSession;
use super::types::{CoordinatorStats, PipeError, PipeHandle, PipeResult, PipeStats, Role};
use crate::core::types::{HandleId, SessionId};
use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

static NEXT_COORDINATOR_ID: AtomicU64 = AtomicU64::new(1);

pub(super) struct CoordinatorState {
    pub sessions: HashMap<SessionId, PipeSession, RandomState>,
    /// The pending-or-active session new opens are matched against
    pub current: Option<SessionId>,
    /// `current` has only one side open
    pub awaiting_partner: bool,
    /// Pending interrupts, by handle, with the session they belong to
    pub interrupted: HashMap<HandleId, SessionId, RandomState>,
    next_session: SessionId,
    next_handle: HandleId,
    sessions_created: u64,
    pairings: u64,
    sessions_reclaimed: u64,
}

impl CoordinatorState {
    fn new() -> Self {
        Self {
            sessions: HashMap::with_hasher(RandomState::new()),
            current: None,
            awaiting_partner: false,
            interrupted: HashMap::with_hasher(RandomState::new()),
            next_session: 1,
            next_handle: 1,
            sessions_created: 0,
            pairings: 0,
            sessions_reclaimed: 0,
        }
    }

    pub fn session(&self, handle: &PipeHandle) -> PipeResult<&PipeSession> {
        self.sessions
            .get(&handle.session)
            .ok_or(PipeError::StaleHandle(handle.session))
    }

    pub fn session_mut(&mut self, handle: &PipeHandle) -> PipeResult<&mut PipeSession> {
        self.sessions
            .get_mut(&handle.session)
            .ok_or(PipeError::StaleHandle(handle.session))
    }

    fn is_awaiting(&self, id: SessionId) -> bool {
        self.awaiting_partner && self.current == Some(id)
    }

    /// Drop a session nobody can reach any more; returns its capacity if dropped
    fn reclaim_if_dead(&mut self, id: SessionId) -> Option<usize> {
        if self.current == Some(id) {
            return None;
        }
        let dead = self
            .sessions
            .get(&id)
            .map(|s| s.handles.is_empty())
            .unwrap_or(false);
        if !dead {
            return None;
        }

        let session = self.sessions.remove(&id)?;
        self.interrupted.retain(|_, session_id| *session_id != id);
        self.sessions_reclaimed += 1;
        info!(
            session = id,
            bytes_written = session.bytes_written,
            bytes_read = session.bytes_read,
            "reclaimed pipe session"
        );
        Some(session.buffer.capacity())
    }
}

pub(super) struct Shared {
    pub owner: u64,
    pub config: PipeConfig,
    pub state: Mutex<CoordinatorState>,
    /// Broadcast whenever a reader's predicate may have changed
    pub readable: Condvar,
    pub allocator: Arc<dyn BufferAllocator>,
}

/// Process-wide pipe coordinator
///
/// Holds at most one pending-or-active session as "current". Cloning is
/// cheap and every clone shares the same lock, sessions and allocator, so a
/// coordinator can be handed to as many threads as there are open handles.
///
/// # Examples
///
/// ```
/// use syncpipe::{PipeConfig, Role, SessionCoordinator};
///
/// let coordinator = SessionCoordinator::new(PipeConfig::default()).unwrap();
/// let writer = coordinator.open(Role::Writer).unwrap();
/// let reader = coordinator.open(Role::Reader).unwrap();
///
/// coordinator.write(&writer, b"ping").unwrap();
/// coordinator.close(writer).unwrap();
///
/// assert_eq!(coordinator.read(&reader, 64).unwrap(), b"ping");
/// assert!(coordinator.read(&reader, 64).unwrap().is_empty()); // end-of-stream
/// ```
#[derive(Clone)]
pub struct SessionCoordinator {
    pub(super) shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SessionCoordinator")
            .field("owner", &self.shared.owner)
            .field("config", &self.shared.config)
            .field("current", &state.current)
            .field("awaiting_partner", &state.awaiting_partner)
            .field("live_sessions", &state.sessions.len())
            .finish()
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::with_allocator(PipeConfig::default(), Arc::new(SystemAllocator))
    }
}

impl SessionCoordinator {
    /// Create a coordinator; a memory budget in `config` selects a `BudgetAllocator`
    pub fn new(config: PipeConfig) -> PipeResult<Self> {
        config.validate()?;
        let allocator: Arc<dyn BufferAllocator> = match config.memory_budget {
            Some(budget) => Arc::new(BudgetAllocator::new(budget)),
            None => Arc::new(SystemAllocator),
        };
        Ok(Self::with_allocator(config, allocator))
    }

    /// Create a coordinator that draws session storage from `allocator`
    ///
    /// `config` is trusted as given; `memory_budget` is ignored in favour of
    /// the allocator's own policy.
    pub fn with_allocator(config: PipeConfig, allocator: Arc<dyn BufferAllocator>) -> Self {
        let owner = NEXT_COORDINATOR_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            coordinator = owner,
            capacity = config.capacity,
            pairing = ?config.pairing,
            "pipe coordinator initialized"
        );
        Self {
            shared: Arc::new(Shared {
                owner,
                config,
                state: Mutex::new(CoordinatorState::new()),
                readable: Condvar::new(),
                allocator,
            }),
        }
    }

    pub fn config(&self) -> &PipeConfig {
        &self.shared.config
    }

    /// Open one end of the channel; never blocks
    ///
    /// Joins the session awaiting a partner if there is one, otherwise
    /// allocates a fresh session and installs it as current.
    #[instrument(level = "debug", skip(self), fields(coordinator = self.shared.owner))]
    pub fn open(&self, role: Role) -> PipeResult<PipeHandle> {
        let mut state = self.shared.state.lock();

        let pending = if state.awaiting_partner {
            state.current
        } else {
            None
        };

        let session_id = match pending {
            Some(id) => {
                if self.shared.config.pairing == PairingPolicy::MatchRole {
                    let held_by = state.sessions.get(&id).map(|s| s.created_by);
                    if held_by == Some(role) {
                        warn!(session = id, %role, "rejected open: role already pending");
                        return Err(PipeError::RoleInUse(role));
                    }
                }
                state.awaiting_partner = false;
                state.pairings += 1;
                info!(session = id, %role, "joined pending pipe session");
                id
            }
            None => {
                let storage = self.shared.allocator.allocate(self.shared.config.capacity)?;
                let id = state.next_session;
                state.next_session += 1;
                state
                    .sessions
                    .insert(id, PipeSession::new(id, CircularBuffer::new(storage), role));

                let superseded = state.current.replace(id);
                state.awaiting_partner = true;
                state.sessions_created += 1;
                if let Some(capacity) = superseded.and_then(|prev| state.reclaim_if_dead(prev)) {
                    self.shared.allocator.release(capacity);
                }

                info!(
                    session = id,
                    %role,
                    capacity = self.shared.config.capacity,
                    "created pipe session"
                );
                id
            }
        };

        let handle_id = state.next_handle;
        state.next_handle += 1;

        match state.sessions.get_mut(&session_id) {
            Some(session) => session.attach(handle_id, role),
            None => return Err(PipeError::StaleHandle(session_id)),
        }
        drop(state);

        self.shared.readable.notify_all();

        Ok(PipeHandle {
            owner: self.shared.owner,
            id: handle_id,
            session: session_id,
            role,
        })
    }

    pub fn open_writer(&self) -> PipeResult<PipeHandle> {
        self.open(Role::Writer)
    }

    pub fn open_reader(&self) -> PipeResult<PipeHandle> {
        self.open(Role::Reader)
    }

    /// Close one end; a writer close signals end-of-stream
    #[instrument(level = "debug", skip(self), fields(coordinator = self.shared.owner))]
    pub fn close(&self, handle: PipeHandle) -> PipeResult<()> {
        self.check_owner(&handle)?;
        let mut state = self.shared.state.lock();
        state.interrupted.remove(&handle.id);

        let session = state.session_mut(&handle)?;
        let idle = session.detach(handle.id, handle.role);
        info!(
            session = handle.session,
            role = %handle.role,
            buffered = session.buffer.len(),
            "closed pipe handle"
        );

        let reclaimed = if idle {
            state.reclaim_if_dead(handle.session)
        } else {
            None
        };
        drop(state);

        if let Some(capacity) = reclaimed {
            self.shared.allocator.release(capacity);
        }
        if handle.role == Role::Writer {
            self.shared.readable.notify_all();
        }
        Ok(())
    }

    pub fn close_writer(&self, handle: PipeHandle) -> PipeResult<()> {
        handle.expect_role(Role::Writer)?;
        self.close(handle)
    }

    pub fn close_reader(&self, handle: PipeHandle) -> PipeResult<()> {
        handle.expect_role(Role::Reader)?;
        self.close(handle)
    }

    /// Cancellation token for reads through `handle`
    ///
    /// Interrupting wakes a read blocked on the handle with `Interrupted`. If
    /// no read is waiting, the next read through the handle fails instead, but
    /// only if it has to wait; a read that finds data discards the interrupt.
    /// Interrupts for a closed handle are ignored.
    pub fn interrupter(&self, handle: &PipeHandle) -> Interrupter {
        Interrupter {
            shared: Arc::clone(&self.shared),
            handle: handle.id,
            session: handle.session,
        }
    }

    pub fn stats(&self, handle: &PipeHandle) -> PipeResult<PipeStats> {
        self.check_owner(handle)?;
        let state = self.shared.state.lock();
        let session = state.session(handle)?;
        Ok(session.stats(state.is_awaiting(session.id)))
    }

    /// Stats of the current session, if any
    pub fn current_stats(&self) -> Option<PipeStats> {
        let state = self.shared.state.lock();
        let id = state.current?;
        let session = state.sessions.get(&id)?;
        Some(session.stats(state.awaiting_partner))
    }

    pub fn coordinator_stats(&self) -> CoordinatorStats {
        let state = self.shared.state.lock();
        CoordinatorStats {
            sessions_created: state.sessions_created,
            pairings: state.pairings,
            sessions_reclaimed: state.sessions_reclaimed,
            live_sessions: state.sessions.len(),
            awaiting_partner: state.awaiting_partner,
        }
    }

    /// Tear down: every live session reaches end-of-stream and no session is current
    ///
    /// Blocked readers drain what is buffered and then see end-of-stream.
    /// Open handles stay valid until closed; later opens start a fresh session.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        for session in state.sessions.values_mut() {
            session.writer_closed = true;
            session.shut_down = true;
        }

        let released: Vec<usize> = match state.current.take() {
            Some(id) => state.reclaim_if_dead(id).into_iter().collect(),
            None => Vec::new(),
        };
        state.awaiting_partner = false;
        let live = state.sessions.len();
        drop(state);

        for capacity in released {
            self.shared.allocator.release(capacity);
        }
        self.shared.readable.notify_all();
        info!(coordinator = self.shared.owner, live_sessions = live, "pipe coordinator shut down");
    }

    pub(super) fn check_owner(&self, handle: &PipeHandle) -> PipeResult<()> {
        if handle.owner == self.shared.owner {
            Ok(())
        } else {
            debug!(
                handle_owner = handle.owner,
                coordinator = self.shared.owner,
                "handle used on foreign coordinator"
            );
            Err(PipeError::StaleHandle(handle.session))
        }
    }
}

/// Interrupts reads through one handle
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<Shared>,
    handle: HandleId,
    session: SessionId,
}

impl std::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupter")
            .field("handle", &self.handle)
            .field("session", &self.session)
            .finish()
    }
}

impl Interrupter {
    pub fn interrupt(&self) {
        let mut state = self.shared.state.lock();
        let open = state
            .sessions
            .get(&self.session)
            .map(|s| s.is_open(self.handle))
            .unwrap_or(false);
        if !open {
            debug!(handle = self.handle, "interrupt ignored: handle closed");
            return;
        }
        state.interrupted.insert(self.handle, self.session);
        drop(state);

        debug!(handle = self.handle, session = self.session, "interrupt requested");
        self.shared.readable.notify_all();
    }
}
