//! Display formatting for fares, clock times, ETAs and distances.

use chrono::NaiveDateTime;

/// `$12.75`
pub fn format_fare(fare: f64) -> String {
    format!("${:.2}", fare)
}

/// 12-hour clock without a leading zero, e.g. `11:44 PM`.
pub fn format_clock_time(time: NaiveDateTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// `7 min`, or `1h 5m` / `2h` past the hour.
pub fn format_eta(seconds: u64) -> String {
    let minutes = seconds.div_ceil(60);
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining > 0 {
        format!("{}h {}m", hours, remaining)
    } else {
        format!("{}h", hours)
    }
}

/// ETA shown to the rider next to the ETA the accelerated demo actually takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalDisplay {
    pub display_eta: String,
    pub demo_eta: String,
    pub away_time: String,
}

pub fn format_arrival_time(eta_seconds: u64, speed_multiplier: u32) -> ArrivalDisplay {
    let display_minutes = eta_seconds.div_ceil(60);
    let demo_minutes = display_minutes.div_ceil(u64::from(speed_multiplier.max(1)));
    ArrivalDisplay {
        display_eta: format!("{} min", display_minutes),
        demo_eta: format!("{} min", demo_minutes),
        away_time: format!("{} min away", demo_minutes),
    }
}

/// `850 m` below a kilometre, `1.2 km` above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// `12 min` or `1h 5m`, rounding to the nearest minute.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).round() as u64;
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Minutes left on a leg given the minutes it started with; never below one.
pub fn remaining_minutes(initial_minutes: u64, progress: f64) -> u64 {
    let left = (initial_minutes as f64 * (1.0 - progress.clamp(0.0, 1.0))).ceil();
    (left as u64).max(1)
}
