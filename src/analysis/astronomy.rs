//! Astronomical arguments for tidal constituents.
//!
//! Evaluates the mean longitudes and lunar-orbit quantities that drive the
//! equilibrium arguments (V) and nodal corrections (f, u) of every tidal
//! constituent. There are no fitted parameters here; everything is a
//! deterministic function of the instant.
//!
//! # Mathematical Background
//!
//! Time is measured in Julian centuries from 1899-12-31 12:00 UT:
//! ```text
//! t = (JD − 2415020.0) / 36525
//! ```
//!
//! Mean longitudes (degrees), Schureman (1958) Table 1:
//! ```text
//! s  = 270.434164 + 481267.8831 t − 0.001133 t² + 0.0000019 t³   (moon)
//! h  = 279.696678 +  36000.768925 t + 0.000303 t²               (sun)
//! p  = 334.329556 +   4069.0340329 t − 0.010325 t² − 0.0000125 t³ (lunar perigee)
//! N  = 259.183275 −   1934.142008 t + 0.002078 t² + 0.0000022 t³ (lunar node)
//! p₁ = 281.220844 +      1.719175 t + 0.000453 t² + 0.000003 t³  (solar perigee)
//! T  = 180 + 15·(UT hours)                                      (hour angle of mean sun)
//! ```
//!
//! The inclination of the lunar orbit to the equator follows from the
//! obliquity ω and the lunar inclination i:
//! ```text
//! cos I = cos ω cos i − sin ω sin i cos N
//! ```
//! with ν (right ascension of the intersection) and ξ (longitude in the
//! moon's orbit of the intersection) from Napier's analogies.

use chrono::{DateTime, Utc};

/// Obliquity of the ecliptic (degrees).
const OBLIQUITY: f64 = 23.452;

/// Inclination of the lunar orbit to the ecliptic (degrees).
const LUNAR_INCLINATION: f64 = 5.145;

/// Julian date of the Unix epoch.
const JD_UNIX_EPOCH: f64 = 2_440_587.5;

/// Julian date of the reference epoch (1899-12-31 12:00 UT).
const JD_1900: f64 = 2_415_020.0;

const DAYS_PER_CENTURY: f64 = 36_525.0;
const HOURS_PER_CENTURY: f64 = DAYS_PER_CENTURY * 24.0;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Rates of change of (T, s, h, p, p₁) in degrees per hour.
///
/// Constituent speeds are integer combinations of these.
pub const ELEMENT_RATES: [f64; 5] = [
    15.0,
    481_267.883_1 / HOURS_PER_CENTURY,
    36_000.768_925 / HOURS_PER_CENTURY,
    4_069.034_032_9 / HOURS_PER_CENTURY,
    1.719_175 / HOURS_PER_CENTURY,
];

/// Orbital elements at one instant.
///
/// All angles in degrees. `hour_angle`, the mean longitudes and the node
/// are reduced to [0, 360); the derived quantities are signed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitalElements {
    /// Julian date
    pub julian_date: f64,
    /// Julian centuries since 1899-12-31 12:00 UT
    pub centuries: f64,
    /// T: hour angle of the mean sun
    pub hour_angle: f64,
    /// s: mean longitude of the moon
    pub moon_longitude: f64,
    /// h: mean longitude of the sun
    pub sun_longitude: f64,
    /// p: longitude of the lunar perigee
    pub lunar_perigee: f64,
    /// N: longitude of the moon's ascending node
    pub lunar_node: f64,
    /// p₁: longitude of the solar perigee
    pub solar_perigee: f64,
    /// I: inclination of the moon's orbit to the equator
    pub inclination: f64,
    /// ν: right ascension of the lunar intersection
    pub nu: f64,
    /// ξ: longitude in the moon's orbit of the lunar intersection
    pub xi: f64,
    /// ν′: K1 phase term
    pub nu_prime: f64,
    /// 2ν″: K2 phase term
    pub two_nu_second: f64,
    /// Q: M1 phase term
    pub m1_phase: f64,
    /// 1/Qa: M1 amplitude term
    pub m1_inverse_amplitude: f64,
    /// R: L2 phase term
    pub l2_phase: f64,
    /// 1/Ra: L2 amplitude term
    pub l2_inverse_amplitude: f64,
}

impl OrbitalElements {
    /// Evaluate the orbital elements at a UTC instant.
    pub fn at(time: DateTime<Utc>) -> Self {
        let millis = time.timestamp_millis();
        let julian_date = millis as f64 / MILLIS_PER_DAY as f64 + JD_UNIX_EPOCH;
        let t = (julian_date - JD_1900) / DAYS_PER_CENTURY;
        let t2 = t * t;
        let t3 = t2 * t;

        let day_hours = millis.rem_euclid(MILLIS_PER_DAY) as f64 / 3_600_000.0;
        let hour_angle = reduce(180.0 + 15.0 * day_hours);

        let s = reduce(270.434_164 + 481_267.883_1 * t - 0.001_133 * t2 + 0.000_001_9 * t3);
        let h = reduce(279.696_678 + 36_000.768_925 * t + 0.000_303 * t2);
        let p = reduce(334.329_556 + 4_069.034_032_9 * t - 0.010_325 * t2 - 0.000_012_5 * t3);
        let n = reduce(259.183_275 - 1_934.142_008 * t + 0.002_078 * t2 + 0.000_002_2 * t3);
        let p1 = reduce(281.220_844 + 1.719_175 * t + 0.000_453 * t2 + 0.000_003 * t3);

        let omega = OBLIQUITY.to_radians();
        let i = LUNAR_INCLINATION.to_radians();

        // Napier's analogies need N in (-180, 180]
        let n_signed = if n > 180.0 { n - 360.0 } else { n };
        let n_rad = n_signed.to_radians();

        let cos_inc = omega.cos() * i.cos() - omega.sin() * i.sin() * n_rad.cos();
        let inc = cos_inc.acos();

        let tan_half_n = (0.5 * n_rad).tan();
        let a = 2.0 * ((0.5 * (omega - i)).cos() / (0.5 * (omega + i)).cos() * tan_half_n).atan();
        let b = 2.0 * ((0.5 * (omega - i)).sin() / (0.5 * (omega + i)).sin() * tan_half_n).atan();
        let nu = 0.5 * (a - b);
        let xi = n_rad - 0.5 * (a + b);

        let sin_2inc = (2.0 * inc).sin();
        let nu_prime = (sin_2inc * nu.sin()).atan2(sin_2inc * nu.cos() + 0.3347);

        let sin_sq_inc = inc.sin().powi(2);
        let two_nu_second =
            (sin_sq_inc * (2.0 * nu).sin()).atan2(sin_sq_inc * (2.0 * nu).cos() + 0.0727);

        // P: longitude of lunar perigee reckoned from the intersection
        let big_p = (p - xi.to_degrees()).to_radians();
        let cos_half_sq = (0.5 * inc).cos().powi(2);
        let tan_half_sq = (0.5 * inc).tan().powi(2);

        let m1_phase =
            ((5.0 * cos_inc - 1.0) * big_p.sin()).atan2((7.0 * cos_inc + 1.0) * big_p.cos());
        let m1_inverse_amplitude = (0.25
            + 1.5 * cos_inc / cos_half_sq * (2.0 * big_p).cos()
            + 2.25 * cos_inc.powi(2) / cos_half_sq.powi(2))
        .sqrt();

        let l2_phase = (2.0 * big_p)
            .sin()
            .atan2(1.0 / (6.0 * tan_half_sq) - (2.0 * big_p).cos());
        let l2_inverse_amplitude =
            (1.0 - 12.0 * tan_half_sq * (2.0 * big_p).cos() + 36.0 * tan_half_sq.powi(2)).sqrt();

        Self {
            julian_date,
            centuries: t,
            hour_angle,
            moon_longitude: s,
            sun_longitude: h,
            lunar_perigee: p,
            lunar_node: n,
            solar_perigee: p1,
            inclination: inc.to_degrees(),
            nu: nu.to_degrees(),
            xi: xi.to_degrees(),
            nu_prime: nu_prime.to_degrees(),
            two_nu_second: two_nu_second.to_degrees(),
            m1_phase: m1_phase.to_degrees(),
            m1_inverse_amplitude,
            l2_phase: l2_phase.to_degrees(),
            l2_inverse_amplitude,
        }
    }

    /// The five fundamental arguments (T, s, h, p, p₁) in degrees.
    pub fn arguments(&self) -> [f64; 5] {
        [
            self.hour_angle,
            self.moon_longitude,
            self.sun_longitude,
            self.lunar_perigee,
            self.solar_perigee,
        ]
    }
}

fn reduce(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const TOL: f64 = 1e-6;

    #[test]
    fn test_reference_epoch() {
        // 1899-12-31 12:00 UT is t = 0
        let epoch = Utc.with_ymd_and_hms(1899, 12, 31, 12, 0, 0).unwrap();
        let el = OrbitalElements::at(epoch);

        assert!(el.centuries.abs() < 1e-12);
        assert!((el.moon_longitude - 270.434164).abs() < TOL);
        assert!((el.sun_longitude - 279.696678).abs() < TOL);
        assert!((el.lunar_node - 259.183275).abs() < TOL);
        // Noon: T = 180 + 15*12
        assert!((el.hour_angle - 0.0).abs() < TOL);
    }

    #[test]
    fn test_inclination_bounds() {
        // I ranges between ω − i and ω + i over a nodal cycle
        let t0 = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        for k in 0..40 {
            let el = OrbitalElements::at(t0 + Duration::days(170 * k));
            assert!(el.inclination >= OBLIQUITY - LUNAR_INCLINATION - 1e-9);
            assert!(el.inclination <= OBLIQUITY + LUNAR_INCLINATION + 1e-9);
            assert!(el.nu.abs() < 13.1, "nu out of range: {}", el.nu);
            assert!(el.xi.abs() < 12.5, "xi out of range: {}", el.xi);
        }
    }

    #[test]
    fn test_node_at_vernal_equinox_maximizes_inclination() {
        // Ascending node at 0 degrees gives I = ω + i and ν = ξ = 0.
        // The node passed 0 degrees around 2006-06.
        let mut best = (f64::MAX, 0.0, 0.0, 0.0);
        let t0 = Utc.with_ymd_and_hms(2005, 6, 1, 0, 0, 0).unwrap();
        for d in 0..800 {
            let el = OrbitalElements::at(t0 + Duration::days(d));
            let dist = el.lunar_node.min(360.0 - el.lunar_node);
            if dist < best.0 {
                best = (dist, el.inclination, el.nu, el.xi);
            }
        }
        assert!(best.0 < 0.1);
        assert!((best.1 - (OBLIQUITY + LUNAR_INCLINATION)).abs() < 0.01);
        assert!(best.2.abs() < 0.05);
        assert!(best.3.abs() < 0.05);
    }

    #[test]
    fn test_hour_angle_advances_15_degrees_per_hour() {
        let t = Utc.with_ymd_and_hms(2018, 3, 1, 6, 0, 0).unwrap();
        let a = OrbitalElements::at(t);
        let b = OrbitalElements::at(t + Duration::hours(1));
        assert!(((b.hour_angle - a.hour_angle).rem_euclid(360.0) - 15.0).abs() < 1e-9);
        assert!((a.hour_angle - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_rates_match_longitudes() {
        let t = Utc.with_ymd_and_hms(2018, 3, 1, 0, 0, 0).unwrap();
        let a = OrbitalElements::at(t);
        let b = OrbitalElements::at(t + Duration::hours(10));
        let ds = (b.moon_longitude - a.moon_longitude).rem_euclid(360.0);
        assert!((ds - 10.0 * ELEMENT_RATES[1]).abs() < 1e-6);
    }
}
