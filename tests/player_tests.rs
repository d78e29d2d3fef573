//! Player controller integration tests (paused tokio time)

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{collector, FakeOutput};
use voicenote::application::ports::PlaybackError;
use voicenote::application::{
    ArbiterError, AudioOwner, AudioSessionArbiter, MediaCacheStore, PlayerConfig,
    PlayerController,
};
use voicenote::domain::cache::MediaType;
use voicenote::domain::playback::PlaybackState;
use voicenote::infrastructure::{LocalMediaFiles, ManualClock, MemoryStorage, NoOpRouting};

fn player(output: FakeOutput) -> PlayerController<FakeOutput> {
    PlayerController::new(
        output,
        AudioSessionArbiter::new(Arc::new(NoOpRouting)),
        PlayerConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn loading_second_source_resets_first_listener() {
    let player = player(FakeOutput::new(10_000));
    let (events_a, listener_a) = collector();
    let (events_b, listener_b) = collector();

    player.load("a.flac", listener_a).await.unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    player.load("b.flac", listener_b).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let a = events_a.lock().unwrap().clone();
    let last = a.last().unwrap();
    assert!(last.is_for("a.flac"));
    assert!(!last.is_playing);
    assert!(!last.is_loaded);
    let reset_at = a.iter().position(|s| !s.is_loaded).unwrap();
    assert_eq!(reset_at, a.len() - 1);
    assert!(a[..reset_at].iter().any(|s| s.is_playing));

    let b = events_b.lock().unwrap().clone();
    assert!(b.iter().all(|s| s.is_for("b.flac")));
    assert!(b.len() >= 4);
    assert!(b.last().unwrap().progress > b.first().unwrap().progress);

    player.unload().await;
}

#[tokio::test(start_paused = true)]
async fn slow_close_of_finished_session_keeps_new_session_held() {
    let mut output = FakeOutput::new(1_000);
    output.close_delay = Duration::from_millis(200);
    let arbiter = AudioSessionArbiter::new(Arc::new(NoOpRouting));
    let player = PlayerController::new(output, Arc::clone(&arbiter), PlayerConfig::default());

    let (_events_a, listener_a) = collector();
    player.load("a.flac", listener_a).await.unwrap();
    // "a" completes at 1000ms and is still closing at 1050ms
    tokio::time::sleep(Duration::from_millis(1_050)).await;

    let (_events_b, listener_b) = collector();
    player.load("b.flac", listener_b).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.current_source().as_deref(), Some("b.flac"));
    assert_eq!(arbiter.holder(), Some(player.owner()));
    let err = arbiter.acquire(AudioOwner::recorder()).await.unwrap_err();
    assert!(matches!(err, ArbiterError::Busy { holder } if holder == player.owner()));

    player.unload().await;
    assert_eq!(arbiter.holder(), None);
}

#[tokio::test(start_paused = true)]
async fn unload_is_idempotent() {
    let output = FakeOutput::new(10_000);
    let closed = Arc::clone(&output.closed);
    let player = player(output);

    player.unload().await;

    let (events, listener) = collector();
    player.load("a.flac", listener).await.unwrap();
    player.unload().await;
    player.unload().await;

    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(player.state(), PlaybackState::Unloaded);
    assert!(player.status().is_none());
    let received = events.lock().unwrap().clone();
    assert!(!received.last().unwrap().is_loaded);
}

#[tokio::test(start_paused = true)]
async fn playback_completes_and_unloads_itself() {
    let player = player(FakeOutput::new(1_000));
    let (events, listener) = collector();

    player.load("short.flac", listener).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    assert_eq!(player.state(), PlaybackState::Unloaded);
    let received = events.lock().unwrap().clone();
    assert!(!received.last().unwrap().is_loaded);
    assert_eq!(received.iter().filter(|s| !s.is_loaded).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_position() {
    let player = player(FakeOutput::new(10_000));
    let (_events, listener) = collector();

    player.load("a.flac", listener).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    player.pause().await;
    assert_eq!(player.state(), PlaybackState::Paused);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let before = player.status().unwrap().position_millis;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(player.status().unwrap().position_millis, before);

    player.resume().await;
    assert_eq!(player.state(), PlaybackState::Playing);
    player.unload().await;
}

#[tokio::test(start_paused = true)]
async fn missing_source_fails_with_single_reset() {
    let mut output = FakeOutput::new(1_000);
    output.missing.push("gone.flac".into());
    let player = player(output);
    let (events, listener) = collector();

    let err = player.load("gone.flac", listener).await.unwrap_err();
    assert!(matches!(err, PlaybackError::SourceUnavailable(_)));
    let received = events.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert!(!received[0].is_loaded);
    assert_eq!(player.state(), PlaybackState::Unloaded);
}

fn cache_with(clock: Arc<ManualClock>) -> Arc<MediaCacheStore> {
    Arc::new(MediaCacheStore::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(LocalMediaFiles::new()),
        clock,
    ))
}

#[tokio::test(start_paused = true)]
async fn cached_replica_is_preferred() {
    let output = FakeOutput::new(10_000);
    let opened = Arc::clone(&output.opened);
    let cache = cache_with(Arc::new(ManualClock::new(0)));
    cache
        .put("https://cdn/v.flac", "/cache/v.flac", MediaType::Voice)
        .await
        .unwrap();
    let player = player(output).with_cache(cache);

    let (_events, listener) = collector();
    let (outcome, _subscription) = player.load("https://cdn/v.flac", listener).await.unwrap();

    assert!(outcome.from_cache());
    assert_eq!(*opened.lock().unwrap(), vec!["/cache/v.flac".to_string()]);
    assert_eq!(player.current_source().as_deref(), Some("https://cdn/v.flac"));
    player.unload().await;
}

#[tokio::test(start_paused = true)]
async fn unusable_replica_falls_back_to_source() {
    let mut output = FakeOutput::new(10_000);
    output.missing.push("/cache/v.flac".into());
    let opened = Arc::clone(&output.opened);
    let cache = cache_with(Arc::new(ManualClock::new(0)));
    cache
        .put("https://cdn/v.flac", "/cache/v.flac", MediaType::Voice)
        .await
        .unwrap();
    let player = player(output).with_cache(cache);

    let (_events, listener) = collector();
    let (outcome, _subscription) = player.load("https://cdn/v.flac", listener).await.unwrap();

    assert!(!outcome.from_cache());
    assert_eq!(*opened.lock().unwrap(), vec!["https://cdn/v.flac".to_string()]);
    player.unload().await;
}
