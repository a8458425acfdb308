//! Keyframe interpolation contract.
//!
//! The engines only consume `Interpolator`; hosts can plug in eased curves.
//! `LinearInterpolator` is the default used when nothing else is provided.

use log::trace;

use crate::model::keyframe::{Color, Keyframe, KeyframeValue};

pub trait Interpolator: Send + Sync {
    /// Value at `time` for one property group. `track` holds that group's
    /// keyframes sorted by time; an empty track yields `base`.
    fn interpolate(&self, base: KeyframeValue, track: &[&Keyframe], time: f64) -> KeyframeValue;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LinearInterpolator;

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, base: KeyframeValue, track: &[&Keyframe], time: f64) -> KeyframeValue {
        let (Some(first), Some(last)) = (track.first(), track.last()) else {
            return base;
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let next_index = track.iter().position(|k| k.time > time).unwrap_or(track.len() - 1);
        let current = track[next_index.saturating_sub(1)];
        let next = track[next_index];
        let span = next.time - current.time;
        let t = if span > 0.0 { (time - current.time) / span } else { 1.0 };
        let value = lerp_value(current.value, next.value, t);
        trace!("interpolated {:?} at {} (t = {})", value, time, t);
        value
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    lerp(a as f64, b as f64, t).round().clamp(0.0, 255.0) as u8
}

/// Mismatched variants cannot happen within one group track; the start value
/// is held if they do.
pub fn lerp_value(start: KeyframeValue, end: KeyframeValue, t: f64) -> KeyframeValue {
    match (start, end) {
        (KeyframeValue::Pos { x: sx, y: sy }, KeyframeValue::Pos { x: ex, y: ey }) => {
            KeyframeValue::Pos {
                x: lerp(sx, ex, t),
                y: lerp(sy, ey, t),
            }
        }
        (KeyframeValue::Scale { x: sx, y: sy }, KeyframeValue::Scale { x: ex, y: ey }) => {
            KeyframeValue::Scale {
                x: lerp(sx, ex, t),
                y: lerp(sy, ey, t),
            }
        }
        (KeyframeValue::Rotation(s), KeyframeValue::Rotation(e)) => {
            KeyframeValue::Rotation(lerp(s, e, t))
        }
        (KeyframeValue::Opacity(s), KeyframeValue::Opacity(e)) => {
            KeyframeValue::Opacity(lerp(s, e, t))
        }
        (KeyframeValue::Blur(s), KeyframeValue::Blur(e)) => KeyframeValue::Blur(lerp(s, e, t)),
        (KeyframeValue::Color(s), KeyframeValue::Color(e)) => KeyframeValue::Color(Color {
            r: lerp_channel(s.r, e.r, t),
            g: lerp_channel(s.g, e.g, t),
            b: lerp_channel(s.b, e.b, t),
            a: lerp_channel(s.a, e.a, t),
        }),
        (start, _) => start,
    }
}
