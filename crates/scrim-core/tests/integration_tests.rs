//! Integration tests for Scrim Core

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use scrim_core::binder::should_resume;
use scrim_core::scheduler::TimerKind;
use scrim_core::sim::NativeCall;
use scrim_core::{
    CatalogProvider, DirectProvider, Event, Failure, MediaHandle, Message, NativeStatus,
    PlayerConfig, PlayerDelegate, PlayerRuntime, PlayerView, ResourceProvider, SimEngine,
    SimPlayer, SimProfile, Status, TimeControl, TimeRange,
};

// =============================================================================
// Helpers
// =============================================================================

#[derive(Default)]
struct Recorder {
    statuses: Mutex<Vec<Status>>,
}

impl PlayerDelegate for Recorder {
    fn on_status(&self, status: &Status) {
        if status.progress().is_none() {
            self.statuses.lock().push(status.clone());
        }
    }
}

struct Player {
    view: PlayerView,
    rx: mpsc::UnboundedReceiver<Message>,
    engine: Arc<SimEngine>,
    recorder: Arc<Recorder>,
}

impl Player {
    fn with_provider(engine: Arc<SimEngine>, provider: Arc<dyn ResourceProvider>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Recorder::default());
        let view = PlayerView::new(PlayerConfig::default(), provider, tx)
            .with_delegate(recorder.clone());
        Self {
            view,
            rx,
            engine,
            recorder,
        }
    }

    fn direct() -> Self {
        let engine = Arc::new(SimEngine::manual());
        let provider = Arc::new(DirectProvider::new(engine.clone()));
        Self::with_provider(engine, provider)
    }

    async fn settle(&mut self) {
        for _ in 0..4 {
            tokio::task::yield_now().await;
            while let Ok(message) = self.rx.try_recv() {
                self.view.dispatch(message);
            }
        }
    }

    async fn elapse(&mut self, millis: u64) {
        self.settle().await;
        tokio::time::advance(Duration::from_millis(millis)).await;
        self.settle().await;
    }

    fn statuses(&self) -> Vec<Status> {
        self.recorder.statuses.lock().clone()
    }
}

// =============================================================================
// Status Tests
// =============================================================================

#[test]
fn test_visibility_of_every_status() {
    assert!(!Status::Unknown.is_visible());
    assert!(!Status::Failed(Failure::new(-1000, "bad")).is_visible());
    assert!(Status::Stopped.is_visible());
    assert!(Status::Progress(0.0).is_visible());
}

#[test]
fn test_failed_equality_ignores_message() {
    assert_eq!(
        Status::Failed(Failure::new(-1100, "missing")),
        Status::Failed(Failure::new(-1100, "not implemented"))
    );
    assert_ne!(Status::Progress(1.0), Status::Progress(1.5));
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[tokio::test]
async fn test_provider_cancel_is_idempotent() {
    let provider = CatalogProvider::new(Arc::new(SimEngine::manual()));
    provider.cancel();
    provider.cancel();

    let direct = DirectProvider::new(Arc::new(SimEngine::manual()));
    direct.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_single_resolution_in_flight() {
    let engine = Arc::new(SimEngine::manual());
    let catalog =
        CatalogProvider::new(engine.clone()).with_lookup_delay(Duration::from_millis(100));
    for id in ["a", "b", "c"] {
        catalog.insert(id, format!("https://example.com/{}.mp4", id));
    }
    let mut player = Player::with_provider(engine, Arc::new(catalog));

    player.view.play(MediaHandle::id("a"), 0.0);
    player.settle().await;
    player.view.play(MediaHandle::id("b"), 0.0);
    player.settle().await;
    player.view.play(MediaHandle::id("c"), 0.0);
    player.elapse(500).await;

    let opened = player.engine.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].url().unwrap().path(), "/c.mp4");
    assert_eq!(
        player.statuses().iter().filter(|s| **s == Status::Loading).count(),
        3
    );
}

#[tokio::test]
async fn test_unknown_id_fails_and_retry_re_resolves() {
    let mut player = Player::direct();
    player.view.play(MediaHandle::id("42"), 0.0);
    player.settle().await;
    assert!(player.view.status().is_failed());

    player.view.ui_event(Event::Play);
    player.settle().await;
    assert_eq!(player.statuses().iter().filter(|s| s.is_failed()).count(), 2);
}

// =============================================================================
// Session Tests
// =============================================================================

#[tokio::test]
async fn test_attach_reports_state_immediately() {
    let mut player = Player::direct();
    let item = Arc::new(SimPlayer::manual(Some(12.0)));
    item.set_status(NativeStatus::ReadyToPlay);

    player.view.play_item(item, 0.0);
    assert_eq!(
        player.statuses(),
        vec![Status::Loading, Status::Waiting, Status::Ready, Status::Paused]
    );
}

// =============================================================================
// Seek Tests
// =============================================================================

#[tokio::test]
async fn test_seek_to_after_ready_exactly_once() {
    let mut player = Player::direct();
    player
        .view
        .play(MediaHandle::url("https://example.com/movie.mp4"), 30.0);
    player.settle().await;

    let item = player.engine.last_opened().unwrap();
    assert!(item.seeks().is_empty());

    item.set_status(NativeStatus::ReadyToPlay);
    player.settle().await;
    assert_eq!(item.seeks(), vec![30.0]);

    item.set_status(NativeStatus::ReadyToPlay);
    item.set_time_control(TimeControl::Playing);
    player.settle().await;
    assert_eq!(item.seeks(), vec![30.0]);
}

// =============================================================================
// Binder Policy Tests
// =============================================================================

#[test]
fn test_lookahead_scenarios() {
    assert!(should_resume(35.0, &[TimeRange::new(0.0, 40.0)], 5.0));
    assert!(!should_resume(35.0, &[TimeRange::new(0.0, 38.0)], 5.0));
}

#[tokio::test(start_paused = true)]
async fn test_window_detach_grace() {
    let mut player = Player::direct();
    let item = Arc::new(SimPlayer::manual(Some(60.0)));
    item.set_status(NativeStatus::ReadyToPlay);
    player.view.play_item(item.clone(), 0.0);
    player.settle().await;

    player.view.window_attached(false);
    assert!(player.view.is_timer_pending(TimerKind::DeferredPause));
    player.elapse(199).await;
    assert_eq!(item.count(&NativeCall::Pause), 0);
    player.elapse(2).await;
    assert_eq!(item.count(&NativeCall::Pause), 1);
    assert!(player.view.is_paused_by_env());
}

#[tokio::test(start_paused = true)]
async fn test_background_pauses_without_grace() {
    let mut player = Player::direct();
    let item = Arc::new(SimPlayer::manual(Some(60.0)));
    item.set_status(NativeStatus::ReadyToPlay);
    player.view.play_item(item.clone(), 0.0);
    player.settle().await;

    player.view.app_did_enter_background();
    assert_eq!(item.count(&NativeCall::Pause), 1);
    assert!(!player.view.is_timer_pending(TimerKind::DeferredPause));

    player.settle().await;
    player.view.app_did_become_active();
    assert_eq!(item.count(&NativeCall::PlayImmediately(1.0)), 2);
}

// =============================================================================
// Runtime Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_runtime_seek_on_start() {
    let engine = Arc::new(SimEngine::simulated(SimProfile {
        duration: 20.0,
        ..Default::default()
    }));
    let provider = Arc::new(DirectProvider::new(engine.clone()));
    let handle = PlayerRuntime::new(PlayerConfig::default(), provider).spawn();

    handle
        .play(MediaHandle::url("https://example.com/movie.mp4"), 8.0)
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let item = engine.last_opened().unwrap();
    assert_eq!(item.seeks(), vec![8.0]);
    assert!(*handle.position().borrow() >= 8.0);

    handle.shutdown().await.unwrap();
    assert_eq!(handle.current_status(), Status::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_owner_seek_before_ready() {
    let engine = Arc::new(SimEngine::simulated(SimProfile {
        duration: 20.0,
        ..Default::default()
    }));
    let provider = Arc::new(DirectProvider::new(engine.clone()));
    let handle = PlayerRuntime::new(PlayerConfig::default(), provider).spawn();

    handle
        .play(MediaHandle::url("https://example.com/movie.mp4"), 0.0)
        .unwrap();
    handle.send(Event::seek(8.0)).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let item = engine.last_opened().unwrap();
    assert_eq!(item.seeks(), vec![8.0]);

    handle.shutdown().await.unwrap();
}

struct Veto;

impl PlayerDelegate for Veto {
    fn should_play(&self) -> bool {
        false
    }
}

#[tokio::test(start_paused = true)]
async fn test_runtime_veto_blocks_autoplay() {
    let engine = Arc::new(SimEngine::simulated(SimProfile {
        duration: 20.0,
        ..Default::default()
    }));
    let provider = Arc::new(DirectProvider::new(engine.clone()));
    let handle = PlayerRuntime::new(PlayerConfig::default(), provider)
        .with_delegate(Arc::new(Veto))
        .spawn();

    handle
        .play(MediaHandle::url("https://example.com/movie.mp4"), 0.0)
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let item = engine.last_opened().unwrap();
    assert_eq!(item.count(&NativeCall::PlayImmediately(1.0)), 0);
    assert_ne!(handle.current_status(), Status::Playing);

    handle.shutdown().await.unwrap();
}
