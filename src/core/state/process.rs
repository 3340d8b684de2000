// ─── Process Slot ───
// At most one launch is in flight. The slot moves Idle → Preparing → Running
// and back to Idle when the reservation is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::KillHandle;

#[derive(Debug)]
pub struct RunningGame {
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    kill: KillHandle,
}

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Idle,
    Preparing,
    Running(RunningGame),
}

#[derive(Debug, Clone, Default)]
pub struct ProcessSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl ProcessSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for a new launch.
    pub async fn try_acquire(&self) -> LauncherResult<SlotReservation> {
        let mut state = self.inner.lock().await;
        match *state {
            SlotState::Idle => {
                *state = SlotState::Preparing;
                Ok(SlotReservation {
                    inner: self.inner.clone(),
                })
            }
            _ => Err(LauncherError::AlreadyRunning),
        }
    }

    pub async fn is_busy(&self) -> bool {
        !matches!(*self.inner.lock().await, SlotState::Idle)
    }

    pub async fn running_pid(&self) -> Option<u32> {
        match &*self.inner.lock().await {
            SlotState::Running(game) => game.pid,
            _ => None,
        }
    }

    /// Hard-kill the running game. Nothing happens while a launch is still
    /// being prepared.
    pub async fn force_stop(&self) -> String {
        let state = self.inner.lock().await;
        let SlotState::Running(game) = &*state else {
            return "No game running.".into();
        };

        match game.kill.kill().await {
            Some(Ok(())) => {
                info!("Force stopped game (pid {:?})", game.pid);
                "Force stopped.".into()
            }
            Some(Err(e)) => format!("Error killing process: {}", e),
            None => "No game running.".into(),
        }
    }
}

/// Held by the launch worker for its whole lifetime; dropping it frees the slot.
#[derive(Debug)]
pub struct SlotReservation {
    inner: Arc<Mutex<SlotState>>,
}

impl SlotReservation {
    pub async fn mark_running(&self, pid: Option<u32>, kill: KillHandle) {
        *self.inner.lock().await = SlotState::Running(RunningGame {
            pid,
            started_at: Utc::now(),
            kill,
        });
    }
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_lock() {
            *state = SlotState::Idle;
            return;
        }

        // Contended: finish the release on the runtime.
        let inner = self.inner.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    *inner.lock().await = SlotState::Idle;
                });
            }
            Err(_) => warn!("Process slot released outside a runtime; state left as is"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::NullSink;
    use crate::core::launch::supervise;

    #[tokio::test]
    async fn second_acquire_is_rejected() {
        let slot = ProcessSlot::new();
        let guard = slot.try_acquire().await.unwrap();

        let err = slot.try_acquire().await.unwrap_err();
        assert_eq!(err.to_string(), "Game is already running!");

        drop(guard);
        assert!(!slot.is_busy().await);
        assert!(slot.try_acquire().await.is_ok());
    }

    #[tokio::test]
    async fn nothing_to_stop_while_idle_or_preparing() {
        let slot = ProcessSlot::new();
        assert_eq!(slot.force_stop().await, "No game running.");

        let _guard = slot.try_acquire().await.unwrap();
        assert_eq!(slot.force_stop().await, "No game running.");
    }

    #[tokio::test]
    async fn unsupervised_handle_reports_nothing_running() {
        let slot = ProcessSlot::new();
        let guard = slot.try_acquire().await.unwrap();
        let (kill, rx) = KillHandle::channel();
        drop(rx);

        guard.mark_running(Some(42), kill).await;
        assert_eq!(slot.running_pid().await, Some(42));
        assert_eq!(slot.force_stop().await, "No game running.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn force_stop_kills_running_game() {
        let slot = ProcessSlot::new();
        let guard = slot.try_acquire().await.unwrap();
        let child = tokio::process::Command::new("sleep").arg("30").spawn().unwrap();
        let (kill, rx) = KillHandle::channel();
        guard.mark_running(child.id(), kill).await;

        let worker = tokio::spawn(async move {
            let outcome = supervise(child, Arc::new(NullSink), rx).await;
            drop(guard);
            outcome
        });

        assert_eq!(slot.force_stop().await, "Force stopped.");
        assert_eq!(worker.await.unwrap(), crate::core::launch::LaunchStage::Crashed);
        // Release may be deferred to the runtime when contended.
        for _ in 0..10 {
            if !slot.is_busy().await {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(slot.try_acquire().await.is_ok());
    }
}
