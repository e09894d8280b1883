//! Presentation state machine for the landing page.
//!
//! The page has four regions (loading screen, title, countdown, reload
//! button) whose visibility is driven by player lifecycle events. All of it
//! lives in [`PresentationState`], and [`transition`] is a pure function from
//! `(state, event)` to `(state, effects)`. The host executes the effects:
//! it toggles regions, talks to the player and arms timers.
//!
//! Every reveal is guarded by its own flag, so the three fallback paths
//! (load error, stall grace, load timeout) can fire in any order and each
//! region still changes at most once. The loading screen is only ever
//! hidden; nothing shows it again.

use std::time::Duration;

use tracing::{debug, info, warn};

/// Reveal thresholds and fallback delays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealTiming {
    /// Playback position at which the title appears.
    pub title_delay_secs: f64,
    /// Remaining playback time at which the countdown appears.
    pub countdown_lead_secs: f64,
    /// Wait after `DataLoaded` before treating the video as ready.
    pub ready_grace: Duration,
    /// Wait after a stall before giving up on the video.
    pub stall_grace: Duration,
    /// Absolute wait from boot for any ready signal.
    pub load_timeout: Duration,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            title_delay_secs: 0.5,
            countdown_lead_secs: 1.0,
            ready_grace: Duration::from_millis(500),
            stall_grace: Duration::from_secs(3),
            load_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Loading,
    Title,
    Countdown,
    Reload,
}

/// One region toggle on the visual surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceChange {
    pub region: Region,
    pub visible: bool,
}

impl SurfaceChange {
    pub fn show(region: Region) -> Self {
        Self {
            region,
            visible: true,
        }
    }

    pub fn hide(region: Region) -> Self {
        Self {
            region,
            visible: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    pub loading_hidden: bool,
    pub title_shown: bool,
    pub countdown_shown: bool,
    pub reload_shown: bool,
}

impl Visibility {
    pub fn is_visible(&self, region: Region) -> bool {
        match region {
            Region::Loading => !self.loading_hidden,
            Region::Title => self.title_shown,
            Region::Countdown => self.countdown_shown,
            Region::Reload => self.reload_shown,
        }
    }

    /// Mirror a change emitted by [`transition`] onto a surface-side copy.
    pub fn apply(&mut self, change: SurfaceChange) {
        match change.region {
            Region::Loading => self.loading_hidden = !change.visible,
            Region::Title => self.title_shown = change.visible,
            Region::Countdown => self.countdown_shown = change.visible,
            Region::Reload => self.reload_shown = change.visible,
        }
    }

    /// Static content fully on screen: the end state of every fallback.
    pub fn fully_revealed(&self) -> bool {
        self.loading_hidden && self.title_shown && self.countdown_shown && self.reload_shown
    }
}

/// One-shot timers the host arms on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackTimer {
    /// Started on `DataLoaded`; stands in for a missing ready signal.
    ReadyGrace,
    /// Started on every stall.
    StallGrace,
    /// Started once at boot.
    LoadTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAttempt {
    /// First start after the video became ready.
    Initial,
    /// Resume from the reload button.
    Restart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// Host started; arms the load timeout.
    Boot,
    /// Player can start playing. Carries the duration when already known.
    Ready { duration: Option<f64> },
    /// Player has the first frame but has not signalled ready.
    DataLoaded,
    DurationChanged { duration: Option<f64> },
    TimeProgress { elapsed: f64 },
    /// Playback reached its natural end.
    Ended,
    LoadFailed { reason: String },
    Stalled,
    TimerElapsed(FallbackTimer),
    PlayRejected { attempt: PlayAttempt, reason: String },
    RestartRequested,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Surface(SurfaceChange),
    Play(PlayAttempt),
    SeekToStart,
    Schedule { timer: FallbackTimer, after: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PresentationState {
    pub visibility: Visibility,
    /// Natural end observed; progress ticks are ignored until restart.
    pub ended: bool,
    /// A ready signal already asked the player to start.
    pub playback_requested: bool,
    pub duration: Option<f64>,
}

impl PresentationState {
    /// Apply `event` in place and return the effects to execute, in order.
    pub fn step(&mut self, event: &PresentationEvent, timing: &RevealTiming) -> Vec<Effect> {
        let (next, effects) = transition(self, event, timing);
        *self = next;
        effects
    }

    /// Duration usable for the countdown threshold.
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}

pub fn transition(
    state: &PresentationState,
    event: &PresentationEvent,
    timing: &RevealTiming,
) -> (PresentationState, Vec<Effect>) {
    let mut step = Step {
        state: *state,
        effects: Vec::new(),
    };

    match event {
        PresentationEvent::Boot => step.schedule(FallbackTimer::LoadTimeout, timing.load_timeout),
        PresentationEvent::Ready { duration } => {
            step.record_duration(*duration);
            step.ready();
        }
        PresentationEvent::DataLoaded => {
            step.schedule(FallbackTimer::ReadyGrace, timing.ready_grace)
        }
        PresentationEvent::DurationChanged { duration } => step.record_duration(*duration),
        PresentationEvent::TimeProgress { elapsed } => step.progress(*elapsed, timing),
        PresentationEvent::Ended => step.ended(),
        PresentationEvent::LoadFailed { reason } => {
            warn!("video failed to load ({}), showing content", reason);
            step.force_show();
        }
        PresentationEvent::Stalled => {
            warn!("video stalled, possibly a slow source");
            step.schedule(FallbackTimer::StallGrace, timing.stall_grace);
        }
        PresentationEvent::TimerElapsed(timer) => step.timer_elapsed(*timer),
        PresentationEvent::PlayRejected {
            attempt: PlayAttempt::Initial,
            reason,
        } => {
            warn!("playback start rejected: {}", reason);
            step.force_show();
        }
        PresentationEvent::PlayRejected {
            attempt: PlayAttempt::Restart,
            reason,
        } => {
            // content was visible before the restart; nothing to recover
            warn!("restart playback rejected: {}", reason);
        }
        PresentationEvent::RestartRequested => step.restart(),
    }

    (step.state, step.effects)
}

struct Step {
    state: PresentationState,
    effects: Vec<Effect>,
}

impl Step {
    fn schedule(&mut self, timer: FallbackTimer, after: Duration) {
        self.effects.push(Effect::Schedule { timer, after });
    }

    fn record_duration(&mut self, duration: Option<f64>) {
        if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.state.duration = Some(d);
        }
    }

    fn ready(&mut self) {
        if self.state.playback_requested {
            debug!("ready signal ignored, playback already requested");
            return;
        }
        info!("video ready, duration={:?}", self.state.duration);
        self.state.playback_requested = true;
        self.hide_loading();
        self.effects.push(Effect::Play(PlayAttempt::Initial));
    }

    fn progress(&mut self, elapsed: f64, timing: &RevealTiming) {
        if self.state.ended || !elapsed.is_finite() {
            return;
        }

        let vis = self.state.visibility;
        if !vis.title_shown && elapsed >= timing.title_delay_secs {
            self.reveal_title();
        }

        if !vis.countdown_shown {
            if let Some(duration) = self.state.known_duration() {
                if duration - elapsed <= timing.countdown_lead_secs {
                    self.reveal_countdown();
                }
            }
        }
    }

    fn ended(&mut self) {
        info!("video ended");
        self.state.ended = true;
        self.reveal_title();
        self.reveal_countdown();
        self.reveal_reload();
    }

    fn timer_elapsed(&mut self, timer: FallbackTimer) {
        if self.state.visibility.loading_hidden {
            debug!("{:?} elapsed after loading finished, ignoring", timer);
            return;
        }
        match timer {
            FallbackTimer::ReadyGrace => self.ready(),
            FallbackTimer::StallGrace => {
                warn!("video still stalled after grace period, showing content");
                self.force_show();
            }
            FallbackTimer::LoadTimeout => {
                warn!("timeout: video did not load, showing content anyway");
                self.force_show();
            }
        }
    }

    fn restart(&mut self) {
        if !self.state.visibility.reload_shown {
            debug!("restart requested while reload control hidden, ignoring");
            return;
        }
        info!("restarting");

        let vis = &mut self.state.visibility;
        vis.title_shown = false;
        vis.countdown_shown = false;
        vis.reload_shown = false;
        self.state.ended = false;
        self.state.playback_requested = true;

        self.effects.extend([
            Effect::Surface(SurfaceChange::hide(Region::Title)),
            Effect::Surface(SurfaceChange::hide(Region::Countdown)),
            Effect::Surface(SurfaceChange::hide(Region::Reload)),
            Effect::SeekToStart,
            Effect::Play(PlayAttempt::Restart),
        ]);
    }

    /// Recovery path shared by every failure: everything static on screen.
    fn force_show(&mut self) {
        self.hide_loading();
        self.reveal_title();
        self.reveal_countdown();
        self.reveal_reload();
    }

    fn hide_loading(&mut self) {
        if self.state.visibility.loading_hidden {
            return;
        }
        self.state.visibility.loading_hidden = true;
        self.effects
            .push(Effect::Surface(SurfaceChange::hide(Region::Loading)));
    }

    fn reveal_title(&mut self) {
        if self.state.visibility.title_shown {
            return;
        }
        self.state.visibility.title_shown = true;
        self.effects
            .push(Effect::Surface(SurfaceChange::show(Region::Title)));
        info!("title revealed");
    }

    fn reveal_countdown(&mut self) {
        if self.state.visibility.countdown_shown {
            return;
        }
        // the title never trails the countdown
        self.reveal_title();
        self.state.visibility.countdown_shown = true;
        self.effects
            .push(Effect::Surface(SurfaceChange::show(Region::Countdown)));
        info!("countdown revealed");
    }

    fn reveal_reload(&mut self) {
        if self.state.visibility.reload_shown {
            return;
        }
        self.state.visibility.reload_shown = true;
        self.effects
            .push(Effect::Surface(SurfaceChange::show(Region::Reload)));
        info!("reload control revealed");
    }
}
