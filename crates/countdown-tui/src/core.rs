/// PlayerCore — single-owner event loop for the presentation state.
///
/// Runs embedded in the TUI process. mpv events, fallback timers, play
/// results and the reload button all arrive as `CoreEvent` messages on one
/// channel, so `PresentationState` and the mpv handle are only ever touched
/// from this loop and need no locking.
///
/// Each event is turned into `PresentationEvent`s and fed through
/// `PresentationState::step`. The resulting effects are executed here:
/// surface changes are broadcast to the UI as `CoreBroadcast::Surface`, play
/// and seek go to mpv, and timers are spawned as one-shot sleeps that post
/// `TimerElapsed` back into the loop. A rejected play comes back as a
/// `PlayRejected` event and is processed before the next channel message.
use std::collections::VecDeque;
use std::path::PathBuf;

use countdown_proto::config::Config;
use countdown_proto::presentation::{
    Effect, FallbackTimer, PresentationEvent, PresentationState, RevealTiming,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::mpv::{
    MpvDriver, MpvEvent, MpvHandle, OBS_DURATION, OBS_EOF_REACHED, OBS_PAUSED_FOR_CACHE,
    OBS_TIME_POS,
};
use crate::CoreBroadcast;

const HEARTBEAT_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_secs(2);

/// All inputs into the PlayerCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    /// Already-translated input: reload button, timers, play results.
    Presentation(PresentationEvent),
    /// Raw mpv unsolicited event (forwarded from reader task).
    MpvEvent(MpvEvent),
    /// Check that mpv is still alive.
    HeartbeatTick,
    Shutdown,
}

/// State of the mpv process as seen by the core.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlayerHealth {
    #[default]
    Absent,
    Starting,
    Running,
    /// No video configured, or `--no-video`.
    Disabled,
    Failed(String),
}

impl PlayerHealth {
    /// Short badge for the status line, `None` when all is well.
    pub fn badge_label(&self) -> Option<&str> {
        match self {
            PlayerHealth::Absent | PlayerHealth::Running => None,
            PlayerHealth::Starting => Some("INIT"),
            PlayerHealth::Disabled => Some("OFF"),
            PlayerHealth::Failed(_) => Some("FAIL"),
        }
    }
}

pub struct PlayerCore {
    timing: RevealTiming,
    video: Option<PathBuf>,
    state: PresentationState,
    mpv_driver: MpvDriver,
    /// Live handle to the mpv IO tasks. `None` until connected or after death.
    mpv_handle: Option<MpvHandle>,
    /// Sender into our own loop, for timers, play results and mpv events.
    event_tx: mpsc::Sender<CoreEvent>,
    broadcast_tx: broadcast::Sender<CoreBroadcast>,
    health: PlayerHealth,
    obs_time_pos: Option<f64>,
    obs_duration: Option<f64>,
    obs_stalled: bool,
    obs_eof: bool,
}

impl PlayerCore {
    pub fn new(
        config: &Config,
        video: Option<PathBuf>,
        broadcast_tx: broadcast::Sender<CoreBroadcast>,
        event_tx: mpsc::Sender<CoreEvent>,
    ) -> Self {
        Self {
            timing: config.timing.reveal_timing(),
            video,
            state: PresentationState::default(),
            mpv_driver: MpvDriver::new(config.video.volume, config.video.muted),
            mpv_handle: None,
            event_tx,
            broadcast_tx,
            health: PlayerHealth::Absent,
            obs_time_pos: None,
            obs_duration: None,
            obs_stalled: false,
            obs_eof: false,
        }
    }

    /// Run until `Shutdown` or until every sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");

        let heartbeat_tx = self.event_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEARTBEAT_INTERVAL).await;
                if heartbeat_tx.send(CoreEvent::HeartbeatTick).await.is_err() {
                    break;
                }
            }
        });

        self.start().await;

        while let Some(evt) = event_rx.recv().await {
            if !self.handle_event(evt).await {
                break;
            }
        }

        info!("PlayerCore: shutting down");
        self.cleanup().await;
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    async fn handle_event(&mut self, evt: CoreEvent) -> bool {
        match evt {
            CoreEvent::Shutdown => return false,
            CoreEvent::Presentation(PresentationEvent::RestartRequested)
                if self.mpv_handle.is_none() =>
            {
                // nothing could replay; keep the static content on screen
                info!("PlayerCore: restart ignored, no video player running");
            }
            CoreEvent::Presentation(event) => self.dispatch(event).await,
            CoreEvent::MpvEvent(event) => self.handle_mpv_event(event).await,
            CoreEvent::HeartbeatTick => {
                if self.mpv_handle.is_some() && !self.mpv_driver.process_alive() {
                    warn!("PlayerCore: heartbeat: mpv process died");
                    self.mpv_handle = None;
                    self.set_health(PlayerHealth::Failed("mpv exited".to_string()));
                    self.dispatch(PresentationEvent::LoadFailed {
                        reason: "mpv exited".to_string(),
                    })
                    .await;
                }
            }
        }
        true
    }

    /// Boot the presentation and hand the video to mpv.
    async fn start(&mut self) {
        self.dispatch(PresentationEvent::Boot).await;

        let Some(video) = self.video.clone() else {
            info!("PlayerCore: no video, static content follows the load timeout");
            self.set_health(PlayerHealth::Disabled);
            return;
        };

        if !video.exists() {
            self.set_health(PlayerHealth::Failed("video missing".to_string()));
            self.dispatch(PresentationEvent::LoadFailed {
                reason: format!("{} not found", video.display()),
            })
            .await;
            return;
        }

        let handle = match self.connect_player().await {
            Ok(h) => h,
            Err(e) => {
                warn!("PlayerCore: failed to start mpv: {}", e);
                self.set_health(PlayerHealth::Failed(e.to_string()));
                self.dispatch(PresentationEvent::LoadFailed {
                    reason: e.to_string(),
                })
                .await;
                return;
            }
        };

        info!("PlayerCore: loading {}", video.display());
        if let Err(e) = handle.load_video(&video).await {
            self.dispatch(PresentationEvent::LoadFailed {
                reason: e.to_string(),
            })
            .await;
        }
    }

    async fn connect_player(&mut self) -> anyhow::Result<MpvHandle> {
        self.set_health(PlayerHealth::Starting);

        // one forwarder per connection: mpv events → our own loop
        let (mpv_tx, mut mpv_rx) = mpsc::channel::<MpvEvent>(64);
        let core_tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(evt) = mpv_rx.recv().await {
                if core_tx.send(CoreEvent::MpvEvent(evt)).await.is_err() {
                    break;
                }
            }
        });

        let handle = self.mpv_driver.spawn_and_connect(mpv_tx).await?;
        handle.observe_properties().await;
        self.set_health(PlayerHealth::Running);
        self.mpv_handle = Some(handle.clone());
        Ok(handle)
    }

    async fn handle_mpv_event(&mut self, evt: MpvEvent) {
        if let Some((obs_id, data)) = evt.as_property_change() {
            match obs_id {
                OBS_TIME_POS => {
                    self.obs_time_pos = data.as_f64();
                    self.broadcast_timeline();
                    if let Some(elapsed) = self.obs_time_pos {
                        self.dispatch(PresentationEvent::TimeProgress { elapsed })
                            .await;
                    }
                }
                OBS_DURATION => {
                    let val = data.as_f64();
                    if val != self.obs_duration {
                        debug!("mpv: duration → {:?}", val);
                        self.obs_duration = val;
                        self.broadcast_timeline();
                        self.dispatch(PresentationEvent::DurationChanged { duration: val })
                            .await;
                    }
                }
                OBS_PAUSED_FOR_CACHE => {
                    let stalled = data.as_bool().unwrap_or(false);
                    let was_stalled = std::mem::replace(&mut self.obs_stalled, stalled);
                    if stalled && !was_stalled {
                        self.dispatch(PresentationEvent::Stalled).await;
                    }
                }
                OBS_EOF_REACHED => {
                    let eof = data.as_bool().unwrap_or(false);
                    let was_eof = std::mem::replace(&mut self.obs_eof, eof);
                    if eof && !was_eof {
                        self.dispatch(PresentationEvent::Ended).await;
                    }
                }
                _ => {}
            }
            return;
        }

        match evt.event_name() {
            Some("file-loaded") => {
                info!("mpv: file-loaded");
                self.dispatch(PresentationEvent::DataLoaded).await;
            }
            Some("playback-restart") => {
                debug!("mpv: playback-restart");
                self.dispatch(PresentationEvent::Ready {
                    duration: self.obs_duration,
                })
                .await;
            }
            Some("end-file") => {
                let reason = evt.end_file_reason().unwrap_or("unknown");
                info!("mpv: end-file reason={}", reason);
                if reason == "error" {
                    let detail = evt
                        .raw
                        .get("file_error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error");
                    self.dispatch(PresentationEvent::LoadFailed {
                        reason: detail.to_string(),
                    })
                    .await;
                }
            }
            _ => {}
        }
    }

    /// Step the state machine and execute effects until nothing follows up.
    async fn dispatch(&mut self, event: PresentationEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let effects = self.state.step(&event, &self.timing);
            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<PresentationEvent> {
        match effect {
            Effect::Surface(change) => {
                debug!("surface: {:?}", change);
                let _ = self.broadcast_tx.send(CoreBroadcast::Surface {
                    change,
                    visibility: self.state.visibility,
                });
                None
            }
            Effect::Schedule { timer, after } => {
                self.arm_timer(timer, after);
                None
            }
            Effect::SeekToStart => {
                if let Some(h) = self.mpv_handle.clone() {
                    if let Err(e) = h.seek_to_start().await {
                        warn!("mpv: seek to start failed: {}", e);
                    }
                }
                None
            }
            Effect::Play(attempt) => {
                let result = match self.mpv_handle.clone() {
                    Some(h) => h.play().await,
                    None => Err(anyhow::anyhow!("no video player running")),
                };
                match result {
                    Ok(()) => {
                        info!("playback started ({:?})", attempt);
                        None
                    }
                    Err(e) => Some(PresentationEvent::PlayRejected {
                        attempt,
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    /// One-shot; never cancelled. The state machine ignores late firings.
    fn arm_timer(&self, timer: FallbackTimer, after: std::time::Duration) {
        debug!("arming {:?} for {:?}", timer, after);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx
                .send(CoreEvent::Presentation(PresentationEvent::TimerElapsed(
                    timer,
                )))
                .await;
        });
    }

    fn broadcast_timeline(&self) {
        let _ = self.broadcast_tx.send(CoreBroadcast::Timeline {
            time_pos: self.obs_time_pos,
            duration: self.obs_duration,
        });
    }

    fn set_health(&mut self, health: PlayerHealth) {
        if self.health != health {
            info!("PlayerCore: player health {:?} → {:?}", self.health, health);
            self.health = health.clone();
            let _ = self.broadcast_tx.send(CoreBroadcast::Health(health));
        }
    }

    async fn cleanup(&mut self) {
        if let Some(h) = self.mpv_handle.take() {
            h.quit().await;
        }
        self.mpv_driver.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countdown_proto::presentation::{Region, SurfaceChange};
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    struct Harness {
        core: PlayerCore,
        event_rx: mpsc::Receiver<CoreEvent>,
        broadcast_rx: broadcast::Receiver<CoreBroadcast>,
    }

    fn harness(video: Option<PathBuf>) -> Harness {
        let (broadcast_tx, broadcast_rx) = broadcast::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let core = PlayerCore::new(&Config::default(), video, broadcast_tx, event_tx);
        Harness {
            core,
            event_rx,
            broadcast_rx,
        }
    }

    /// Stand-in for mpv: answers every request, rejecting `pause=false` when
    /// asked to, and reports the commands it saw.
    fn attach_fake_mpv(core: &mut PlayerCore, reject_play: bool) -> mpsc::UnboundedReceiver<Value> {
        let (client, server) = tokio::io::duplex(8192);
        let (mpv_tx, _mpv_rx) = mpsc::channel(64);
        core.mpv_handle = Some(crate::mpv::start_io_tasks(client, mpv_tx));

        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(server);
            let mut lines = BufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let req: Value = serde_json::from_str(&line).unwrap();
                let command = req["command"].clone();
                let rejected = reject_play && command == json!(["set_property", "pause", false]);
                let error = if rejected { "not allowed" } else { "success" };
                let reply = json!({ "request_id": req["request_id"], "error": error });
                let _ = seen_tx.send(command);
                let mut out = reply.to_string();
                out.push('\n');
                if write_half.write_all(out.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
        seen_rx
    }

    fn mpv(raw: Value) -> CoreEvent {
        CoreEvent::MpvEvent(MpvEvent { raw })
    }

    fn surface_changes(rx: &mut broadcast::Receiver<CoreBroadcast>) -> Vec<SurfaceChange> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let CoreBroadcast::Surface { change, .. } = msg {
                out.push(change);
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_timeout_reveals_static_content() {
        let Harness {
            core,
            event_rx,
            mut broadcast_rx,
        } = harness(None);
        let event_tx = core.event_tx.clone();
        let started = tokio::time::Instant::now();
        let task = tokio::spawn(core.run(event_rx));

        let mut changes = Vec::new();
        while changes.len() < 4 {
            if let CoreBroadcast::Surface { change, .. } = broadcast_rx.recv().await.unwrap() {
                changes.push(change);
            }
        }
        assert!(started.elapsed() >= tokio::time::Duration::from_secs(5));
        assert_eq!(
            changes,
            vec![
                SurfaceChange::hide(Region::Loading),
                SurfaceChange::show(Region::Title),
                SurfaceChange::show(Region::Countdown),
                SurfaceChange::show(Region::Reload),
            ]
        );

        // a late ready-grace firing changes nothing
        event_tx
            .send(CoreEvent::Presentation(PresentationEvent::TimerElapsed(
                FallbackTimer::ReadyGrace,
            )))
            .await
            .unwrap();
        event_tx.send(CoreEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
        assert!(surface_changes(&mut broadcast_rx).is_empty());
    }

    #[tokio::test]
    async fn test_ready_without_player_forces_content() {
        let mut h = harness(None);
        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::Ready {
                duration: Some(10.0),
            }))
            .await;

        assert_eq!(
            surface_changes(&mut h.broadcast_rx),
            vec![
                SurfaceChange::hide(Region::Loading),
                SurfaceChange::show(Region::Title),
                SurfaceChange::show(Region::Countdown),
                SurfaceChange::show(Region::Reload),
            ]
        );
    }

    #[tokio::test]
    async fn test_full_playthrough_and_restart() {
        let mut h = harness(None);
        let mut seen = attach_fake_mpv(&mut h.core, false);

        for raw in [
            json!({"event": "file-loaded"}),
            json!({"event": "property-change", "id": OBS_DURATION, "name": "duration", "data": 10.0}),
            json!({"event": "playback-restart"}),
        ] {
            h.core.handle_event(mpv(raw)).await;
        }
        assert!(h.core.state.visibility.loading_hidden);
        assert_eq!(h.core.state.duration, Some(10.0));
        assert_eq!(
            seen.recv().await.unwrap(),
            json!(["set_property", "pause", false])
        );

        for t in [0.2, 0.6, 9.2] {
            h.core
                .handle_event(mpv(json!({"event": "property-change", "id": OBS_TIME_POS, "name": "time-pos", "data": t})))
                .await;
        }
        assert!(h.core.state.visibility.title_shown);
        assert!(h.core.state.visibility.countdown_shown);
        assert!(!h.core.state.visibility.reload_shown);

        h.core
            .handle_event(mpv(json!({"event": "property-change", "id": OBS_EOF_REACHED, "name": "eof-reached", "data": true})))
            .await;
        assert!(h.core.state.ended);
        assert!(h.core.state.visibility.reload_shown);

        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::RestartRequested))
            .await;
        assert_eq!(seen.recv().await.unwrap(), json!(["seek", 0, "absolute"]));
        assert_eq!(
            seen.recv().await.unwrap(),
            json!(["set_property", "pause", false])
        );
        assert!(!h.core.state.ended);
        assert!(!h.core.state.visibility.title_shown);
        assert!(!h.core.state.visibility.reload_shown);

        // the seek's playback-restart must not start a second play
        h.core.handle_event(mpv(json!({"event": "playback-restart"}))).await;
        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blocked_play_reveals_content() {
        let mut h = harness(None);
        let _seen = attach_fake_mpv(&mut h.core, true);

        h.core.handle_event(mpv(json!({"event": "playback-restart"}))).await;
        assert!(h.core.state.visibility.fully_revealed());
    }

    #[tokio::test]
    async fn test_load_error_reveals_content() {
        let mut h = harness(None);
        h.core
            .handle_event(mpv(json!({"event": "end-file", "reason": "error", "file_error": "unrecognized file format"})))
            .await;
        assert!(h.core.state.visibility.fully_revealed());

        // a normal end-file is not a failure
        let mut h = harness(None);
        h.core
            .handle_event(mpv(json!({"event": "end-file", "reason": "stop"})))
            .await;
        assert!(!h.core.state.visibility.loading_hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_grace_fires_once() {
        let mut h = harness(None);
        let stalled = json!({"event": "property-change", "id": OBS_PAUSED_FOR_CACHE, "name": "paused-for-cache", "data": true});
        h.core.handle_event(mpv(stalled.clone())).await;
        // repeated report while still stalled arms nothing new
        h.core.handle_event(mpv(stalled)).await;

        let evt = h.event_rx.recv().await.unwrap();
        assert!(matches!(
            evt,
            CoreEvent::Presentation(PresentationEvent::TimerElapsed(FallbackTimer::StallGrace))
        ));
        h.core.handle_event(evt).await;
        assert!(h.core.state.visibility.fully_revealed());
        assert_eq!(surface_changes(&mut h.broadcast_rx).len(), 4);
    }

    #[tokio::test]
    async fn test_restart_play_rejection_is_not_recovered() {
        let mut h = harness(None);
        let mut seen = attach_fake_mpv(&mut h.core, true);
        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::TimerElapsed(
                FallbackTimer::LoadTimeout,
            )))
            .await;
        assert!(h.core.state.visibility.fully_revealed());

        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::RestartRequested))
            .await;
        assert_eq!(seen.recv().await.unwrap(), json!(["seek", 0, "absolute"]));
        assert_eq!(
            seen.recv().await.unwrap(),
            json!(["set_property", "pause", false])
        );
        assert!(!h.core.state.visibility.title_shown);
        assert!(!h.core.state.visibility.reload_shown);
        // the rejected restart leaves the regions as the restart set them
        let changes = surface_changes(&mut h.broadcast_rx);
        assert_eq!(changes.last(), Some(&SurfaceChange::hide(Region::Reload)));
    }

    #[tokio::test]
    async fn test_restart_without_player_keeps_content() {
        // --no-video: content arrives through the load timeout
        let mut h = harness(None);
        h.core.start().await;
        assert_eq!(h.core.health, PlayerHealth::Disabled);
        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::TimerElapsed(
                FallbackTimer::LoadTimeout,
            )))
            .await;
        assert!(h.core.state.visibility.fully_revealed());
        surface_changes(&mut h.broadcast_rx);

        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::RestartRequested))
            .await;
        assert!(h.core.state.visibility.fully_revealed());
        assert!(surface_changes(&mut h.broadcast_rx).is_empty());
    }

    #[tokio::test]
    async fn test_surface_broadcast_carries_visibility() {
        let mut h = harness(None);
        h.core
            .handle_event(CoreEvent::Presentation(PresentationEvent::TimerElapsed(
                FallbackTimer::LoadTimeout,
            )))
            .await;

        let mut last = None;
        while let Ok(msg) = h.broadcast_rx.try_recv() {
            if let CoreBroadcast::Surface { visibility, .. } = msg {
                last = Some(visibility);
            }
        }
        assert_eq!(last, Some(h.core.state.visibility));
        assert!(last.is_some_and(|v| v.fully_revealed()));
    }

    #[test]
    fn test_health_badges() {
        assert_eq!(PlayerHealth::Running.badge_label(), None);
        assert_eq!(PlayerHealth::Disabled.badge_label(), Some("OFF"));
        assert_eq!(
            PlayerHealth::Failed("x".into()).badge_label(),
            Some("FAIL")
        );
    }
}
