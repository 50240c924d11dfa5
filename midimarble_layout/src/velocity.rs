// Per-group travel speed from local note density.
//
// For each group, count the notes whose onsets fall inside a window of
// `density_window_s` seconds centred on the group's timestamp (two binary
// searches over the sorted onset times), convert to notes per second, and
// map through a smoothstep ease into a speed between `max_speed` (sparse)
// and `min_speed` (dense). Dense passages move slower so the walls stay
// readable on screen.
//
// The raw curve is then smoothed with a 3-point centred moving average,
// leaving both endpoints unchanged.

use crate::config::SpeedParams;
use crate::grouper::Group;
use crate::note::NoteEvent;

/// Smoothstep ease `3t^2 - 2t^3` on `[0, 1]`.
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Speed (px/s) for a given density in notes per second.
pub fn speed_for_density(nps: f64, params: &SpeedParams) -> f64 {
    let t = (nps / params.max_density_nps).min(1.0);
    params.max_speed - (params.max_speed - params.min_speed) * smoothstep(t)
}

/// Smoothed speed for every group. `notes` is the full sorted note list the
/// groups were built from.
pub fn group_speed_curve(groups: &[Group], notes: &[NoteEvent], params: &SpeedParams) -> Vec<f64> {
    let times: Vec<f64> = notes.iter().map(|n| n.time_ms).collect();
    let half_window_ms = params.density_window_s * 500.0;

    let raw: Vec<f64> = groups
        .iter()
        .map(|g| {
            let center = g.time_ms();
            let lo = times.partition_point(|&t| t < center - half_window_ms);
            let hi = times.partition_point(|&t| t <= center + half_window_ms);
            let nps = (hi - lo) as f64 / params.density_window_s;
            speed_for_density(nps, params)
        })
        .collect();

    smooth3(&raw)
}

/// 3-point centred moving average with fixed endpoints.
fn smooth3(raw: &[f64]) -> Vec<f64> {
    if raw.len() <= 2 {
        return raw.to_vec();
    }
    let mut out = Vec::with_capacity(raw.len());
    out.push(raw[0]);
    out.extend(raw.windows(3).map(|w| (w[0] + w[1] + w[2]) / 3.0));
    out.push(raw[raw.len() - 1]);
    out
}
