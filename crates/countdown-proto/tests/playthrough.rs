mod common;

use std::time::Duration;

use common::surface::FakeSurface;
use countdown_proto::presentation::{
    Effect, FallbackTimer, PlayAttempt, PresentationEvent, Region, SurfaceChange,
};

#[test]
fn title_appears_on_the_tick_that_crosses_the_delay() {
    let mut page = FakeSurface::new();
    page.send(PresentationEvent::Ready {
        duration: Some(10.0),
    });

    assert!(page.progress(0.2).is_empty());
    assert_eq!(page.progress(0.6), vec![SurfaceChange::show(Region::Title)]);
    assert!(page.progress(1.0).is_empty());

    assert!(page.shown.title_shown);
    assert!(!page.shown.countdown_shown);
}

#[test]
fn countdown_appears_inside_the_lead_window() {
    let mut page = FakeSurface::new();
    page.send(PresentationEvent::Ready {
        duration: Some(10.0),
    });

    // the first tick is already past the title delay
    assert_eq!(page.progress(8.5), vec![SurfaceChange::show(Region::Title)]);
    assert_eq!(page.progress(9.2), vec![SurfaceChange::show(Region::Countdown)]);
    assert!(page.progress(9.9).is_empty());
}

#[test]
fn load_timeout_reveals_everything_exactly_once() {
    let mut page = FakeSurface::new();
    page.send(PresentationEvent::Boot);
    assert_eq!(
        page.other,
        vec![Effect::Schedule {
            timer: FallbackTimer::LoadTimeout,
            after: Duration::from_secs(5),
        }]
    );

    page.send(PresentationEvent::TimerElapsed(FallbackTimer::LoadTimeout));
    page.send(PresentationEvent::TimerElapsed(FallbackTimer::LoadTimeout));
    page.send(PresentationEvent::LoadFailed {
        reason: "late error".into(),
    });

    assert!(page.shown.fully_revealed());
    for change in [
        SurfaceChange::hide(Region::Loading),
        SurfaceChange::show(Region::Title),
        SurfaceChange::show(Region::Countdown),
        SurfaceChange::show(Region::Reload),
    ] {
        assert_eq!(page.count(change), 1, "{:?}", change);
    }
}

#[test]
fn restart_after_end_clears_and_replays() {
    let mut page = FakeSurface::new();
    page.send(PresentationEvent::Ready {
        duration: Some(3.0),
    });
    page.progress(0.5);
    page.progress(2.5);
    page.send(PresentationEvent::Ended);
    assert!(page.shown.fully_revealed());

    page.other.clear();
    let changes = page.send(PresentationEvent::RestartRequested);
    assert_eq!(
        changes,
        vec![
            SurfaceChange::hide(Region::Title),
            SurfaceChange::hide(Region::Countdown),
            SurfaceChange::hide(Region::Reload),
        ]
    );
    assert_eq!(
        page.other,
        vec![Effect::SeekToStart, Effect::Play(PlayAttempt::Restart)]
    );

    assert!(!page.state.ended);
    assert!(!page.shown.title_shown);
    assert!(!page.shown.countdown_shown);
    assert!(!page.shown.reload_shown);
    // the loading screen stays gone across restarts
    assert!(page.shown.loading_hidden);

    // the second play-through reveals again
    assert_eq!(page.progress(0.5), vec![SurfaceChange::show(Region::Title)]);
}

#[test]
fn title_never_trails_countdown() {
    let durations = [0.3, 0.8, 1.0, 1.4, 2.0, 10.0];
    let steps = [0.05, 0.1, 0.25, 0.4, 1.0];

    for duration in durations {
        for step in steps {
            let mut page = FakeSurface::new();
            page.send(PresentationEvent::Ready {
                duration: Some(duration),
            });
            let mut elapsed = 0.0;
            while elapsed <= duration {
                page.progress(elapsed);
                if page.shown.countdown_shown {
                    assert!(
                        page.shown.title_shown,
                        "duration={} step={} elapsed={}",
                        duration, step, elapsed
                    );
                }
                elapsed += step;
            }
            page.send(PresentationEvent::Ended);

            let title_at = page
                .changes
                .iter()
                .position(|c| *c == SurfaceChange::show(Region::Title));
            let countdown_at = page
                .changes
                .iter()
                .position(|c| *c == SurfaceChange::show(Region::Countdown));
            assert!(title_at < countdown_at);
        }
    }
}

#[test]
fn blocked_autoplay_leaves_content_visible() {
    let mut page = FakeSurface::new();
    page.send(PresentationEvent::Boot);
    page.send(PresentationEvent::DataLoaded);
    page.send(PresentationEvent::TimerElapsed(FallbackTimer::ReadyGrace));
    assert!(page.other.contains(&Effect::Play(PlayAttempt::Initial)));

    page.send(PresentationEvent::PlayRejected {
        attempt: PlayAttempt::Initial,
        reason: "not allowed".into(),
    });
    assert!(page.shown.fully_revealed());

    // the absolute timeout fires later and finds nothing to do
    assert!(page
        .send(PresentationEvent::TimerElapsed(FallbackTimer::LoadTimeout))
        .is_empty());
}
