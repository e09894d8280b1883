//! Smooth Unicode progress bar for the intro video timeline.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::Timeline;
use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Render the timeline bar in `area`. Draws nothing until the duration is known.
pub fn draw_progress(frame: &mut Frame, area: Rect, timeline: &Timeline) {
    if area.width < 4 || area.height == 0 {
        return;
    }
    let Some(progress) = timeline.progress() else {
        return;
    };

    let left_label = fmt_time(timeline.time_pos.unwrap_or(0.0));
    let right_label = timeline.duration.map(fmt_time).unwrap_or_default();
    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let spans = vec![
        Span::styled(format!("{} ", left_label), Style::default().fg(C_SECONDARY)),
        Span::styled(bar(progress, bar_w), Style::default().fg(C_PLAYING)),
        Span::styled(format!(" {}", right_label), Style::default().fg(C_MUTED)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// `width` cells filled to `progress` (0.0..=1.0) in eighths of a cell.
fn bar(progress: f64, width: usize) -> String {
    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    let mut out = String::with_capacity(width * 3);
    for _ in 0..full_blocks {
        out.push('█');
    }
    if full_blocks < width {
        out.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..width {
            out.push(' ');
        }
    }
    out
}

fn fmt_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let s = secs as u64;
    format!("{}:{:02}", s / 60, s % 60)
}
