use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// KMA Lambert conformal conic grid parameters (5 km grid).
const EARTH_RADIUS_KM: f64 = 6371.00877;
const GRID_KM: f64 = 5.0;
const STANDARD_LAT1: f64 = 30.0;
const STANDARD_LAT2: f64 = 60.0;
const ORIGIN_LON: f64 = 126.0;
const ORIGIN_LAT: f64 = 38.0;
const ORIGIN_X: f64 = 43.0;
const ORIGIN_Y: f64 = 136.0;

/// Minutes past the hour after which that hour's observation is published.
const NOWCAST_PUBLISH_MINUTE: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    pub nx: i32,
    pub ny: i32,
}

pub fn to_grid(latitude: f64, longitude: f64) -> GridPoint {
    let degrad = PI / 180.0;
    let re = EARTH_RADIUS_KM / GRID_KM;
    let slat1 = STANDARD_LAT1 * degrad;
    let slat2 = STANDARD_LAT2 * degrad;
    let olon = ORIGIN_LON * degrad;
    let olat = ORIGIN_LAT * degrad;

    let sn = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
    let sn = (slat1.cos() / slat2.cos()).ln() / sn.ln();
    let sf = (PI * 0.25 + slat1 * 0.5).tan();
    let sf = sf.powf(sn) * slat1.cos() / sn;
    let ro = (PI * 0.25 + olat * 0.5).tan();
    let ro = re * sf / ro.powf(sn);

    let ra = (PI * 0.25 + latitude * degrad * 0.5).tan();
    let ra = re * sf / ra.powf(sn);
    let mut theta = longitude * degrad - olon;
    if theta > PI {
        theta -= 2.0 * PI;
    }
    if theta < -PI {
        theta += 2.0 * PI;
    }
    theta *= sn;

    GridPoint {
        nx: (ra * theta.sin() + ORIGIN_X + 0.5).floor() as i32,
        ny: (ro - ra * theta.cos() + ORIGIN_Y + 0.5).floor() as i32,
    }
}

/// `(base_date, base_time)` of the latest published ultra-short-term observation.
pub fn nowcast_base(now: DateTime<FixedOffset>) -> (String, String) {
    let base = if now.minute() < NOWCAST_PUBLISH_MINUTE {
        now - Duration::hours(1)
    } else {
        now
    };
    (
        base.format("%Y%m%d").to_string(),
        format!("{:02}00", base.hour()),
    )
}
