//! Tidal constituent catalog with nodal corrections.
//!
//! Each constituent is described by its Doodson-style multipliers of the
//! fundamental arguments (T, s, h, p, p₁), a phase offset, and the nodal
//! terms whose factors and phase corrections it inherits.
//!
//! # Mathematical Background
//!
//! Equilibrium argument and speed:
//! ```text
//! V(t) = n_T T + n_s s + n_h h + n_p p + n_p₁ p₁ + offset
//! ω    = n_T Ṫ + n_s ṡ + n_h ḣ + n_p ṗ + n_p₁ ṗ₁      (degrees/hour)
//! ```
//!
//! Compound constituents combine the nodal corrections of their parents:
//! ```text
//! f = Π f_k^|m_k|      u = Σ m_k u_k
//! ```
//!
//! The base terms follow Schureman (1958), Table 2 (formulas 73–78, 141,
//! 144, 149, 197, 207, 213, 215, 227, 235).

use super::astronomy::{ELEMENT_RATES, OrbitalElements};
use super::wrap_degrees;

/// Base nodal terms from which every constituent's f and u are composed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodalTerm {
    /// Principal lunar semidiurnal (formula 78)
    M2,
    /// Lunar diurnal (formula 75)
    O1,
    /// Lunisolar diurnal (formula 227)
    K1,
    /// Lunisolar semidiurnal (formula 235)
    K2,
    /// Smaller lunar elliptic diurnal (formula 76)
    J1,
    /// Lunar diurnal, second order (formula 77)
    OO1,
    /// Lunar terdiurnal (formula 149)
    M3,
    /// Lunar monthly (formula 73)
    Mm,
    /// Lunisolar fortnightly (formula 74)
    Mf,
    /// Smaller lunar elliptic semidiurnal (formula 215)
    L2,
    /// Smaller lunar elliptic diurnal (formula 207)
    M1,
}

impl NodalTerm {
    /// Nodal amplitude factor f.
    pub fn factor(self, el: &OrbitalElements) -> f64 {
        let inc = el.inclination.to_radians();
        let nu = el.nu.to_radians();
        let sin_i = inc.sin();
        let cos_half = (0.5 * inc).cos();
        let sin_half = (0.5 * inc).sin();

        match self {
            NodalTerm::M2 => cos_half.powi(4) / 0.9154,
            NodalTerm::O1 => sin_i * cos_half.powi(2) / 0.3800,
            NodalTerm::K1 => {
                let s2i = (2.0 * inc).sin();
                (0.8965 * s2i * s2i + 0.6001 * s2i * nu.cos() + 0.1006).sqrt()
            }
            NodalTerm::K2 => (19.0444 * sin_i.powi(4)
                + 2.7702 * sin_i.powi(2) * (2.0 * nu).cos()
                + 0.0981)
                .sqrt(),
            NodalTerm::J1 => (2.0 * inc).sin() / 0.7214,
            NodalTerm::OO1 => sin_i * sin_half.powi(2) / 0.0164,
            NodalTerm::M3 => cos_half.powi(6) / 0.8758,
            NodalTerm::Mm => (2.0 / 3.0 - sin_i.powi(2)) / 0.5021,
            NodalTerm::Mf => sin_i.powi(2) / 0.1578,
            NodalTerm::L2 => NodalTerm::M2.factor(el) * el.l2_inverse_amplitude,
            NodalTerm::M1 => NodalTerm::O1.factor(el) * el.m1_inverse_amplitude,
        }
    }

    /// Nodal phase correction u in degrees.
    pub fn phase(self, el: &OrbitalElements) -> f64 {
        let (xi, nu) = (el.xi, el.nu);

        match self {
            NodalTerm::M2 => 2.0 * xi - 2.0 * nu,
            NodalTerm::O1 => 2.0 * xi - nu,
            NodalTerm::K1 => -el.nu_prime,
            NodalTerm::K2 => -el.two_nu_second,
            NodalTerm::J1 => -nu,
            NodalTerm::OO1 => -2.0 * xi - nu,
            NodalTerm::M3 => 3.0 * xi - 3.0 * nu,
            NodalTerm::Mm => 0.0,
            NodalTerm::Mf => -2.0 * xi,
            NodalTerm::L2 => 2.0 * xi - 2.0 * nu - el.l2_phase,
            NodalTerm::M1 => xi - nu + el.m1_phase,
        }
    }
}

/// Static description of one tidal constituent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstituentDef {
    /// Name (e.g., "M2")
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Multipliers of (T, s, h, p, p₁)
    pub doodson: [i32; 5],
    /// Phase offset in degrees
    pub offset: f64,
    /// Nodal terms and their exponents
    pub nodal: &'static [(NodalTerm, i32)],
}

impl ConstituentDef {
    /// Angular speed in degrees per hour.
    pub fn speed(&self) -> f64 {
        self.doodson
            .iter()
            .zip(ELEMENT_RATES.iter())
            .map(|(&n, &rate)| n as f64 * rate)
            .sum()
    }

    /// Period in hours (infinite for a zero-speed term).
    pub fn period_hours(&self) -> f64 {
        360.0 / self.speed()
    }

    /// Equilibrium argument V (degrees, unwrapped).
    pub fn equilibrium_phase(&self, el: &OrbitalElements) -> f64 {
        self.doodson
            .iter()
            .zip(el.arguments().iter())
            .map(|(&n, &arg)| n as f64 * arg)
            .sum::<f64>()
            + self.offset
    }

    /// Nodal phase correction u (degrees).
    pub fn nodal_phase(&self, el: &OrbitalElements) -> f64 {
        self.nodal
            .iter()
            .map(|&(term, m)| m as f64 * term.phase(el))
            .sum()
    }

    /// Equilibrium argument plus nodal correction, V+u, wrapped to [0, 360).
    pub fn equilibrium_argument(&self, el: &OrbitalElements) -> f64 {
        wrap_degrees(self.equilibrium_phase(el) + self.nodal_phase(el))
    }

    /// Nodal amplitude factor f.
    pub fn node_factor(&self, el: &OrbitalElements) -> f64 {
        self.nodal
            .iter()
            .map(|&(term, m)| term.factor(el).powi(m.abs()))
            .product()
    }
}

use NodalTerm::*;

macro_rules! constituent {
    (
        $name:expr,
        $desc:expr,
        [$t:expr, $s:expr, $h:expr, $p:expr, $p1:expr],
        $offset:expr,
        [$($term:expr => $m:expr),*]
    ) => {
        ConstituentDef {
            name: $name,
            description: $desc,
            doodson: [$t, $s, $h, $p, $p1],
            offset: $offset,
            nodal: &[$(($term, $m)),*],
        }
    };
}

/// Catalog in priority order: when two constituents cannot be resolved from
/// each other, the one listed first is kept.
static CATALOG: [ConstituentDef; 42] = [
    constituent!("M2", "principal lunar semidiurnal", [2, -2, 2, 0, 0], 0.0, [M2 => 1]),
    constituent!("S2", "principal solar semidiurnal", [2, 0, 0, 0, 0], 0.0, []),
    constituent!("N2", "larger lunar elliptic semidiurnal", [2, -3, 2, 1, 0], 0.0, [M2 => 1]),
    constituent!("K1", "lunisolar diurnal", [1, 0, 1, 0, 0], -90.0, [K1 => 1]),
    constituent!("M4", "shallow water overtide of lunar", [4, -4, 4, 0, 0], 0.0, [M2 => 2]),
    constituent!("O1", "lunar diurnal", [1, -2, 1, 0, 0], 90.0, [O1 => 1]),
    constituent!("M6", "shallow water overtide of lunar", [6, -6, 6, 0, 0], 0.0, [M2 => 3]),
    constituent!("MK3", "shallow water terdiurnal", [3, -2, 3, 0, 0], -90.0, [M2 => 1, K1 => 1]),
    constituent!("S4", "shallow water overtide of principal solar", [4, 0, 0, 0, 0], 0.0, []),
    constituent!("MN4", "shallow water quarter diurnal", [4, -5, 4, 1, 0], 0.0, [M2 => 2]),
    constituent!("NU2", "larger lunar evectional", [2, -3, 4, -1, 0], 0.0, [M2 => 1]),
    constituent!("S6", "shallow water overtide of principal solar", [6, 0, 0, 0, 0], 0.0, []),
    constituent!("MU2", "variational", [2, -4, 4, 0, 0], 0.0, [M2 => 1]),
    constituent!("2N2", "second-order lunar elliptic", [2, -4, 2, 2, 0], 0.0, [M2 => 1]),
    constituent!("OO1", "lunar diurnal", [1, 2, 1, 0, 0], -90.0, [OO1 => 1]),
    constituent!("LAM2", "smaller lunar evectional", [2, -1, 0, 1, 0], 180.0, [M2 => 1]),
    constituent!("S1", "solar diurnal", [1, 0, 0, 0, 0], 0.0, []),
    constituent!("M1", "smaller lunar elliptic diurnal", [1, -1, 1, 0, 0], -90.0, [M1 => 1]),
    constituent!("J1", "smaller lunar elliptic diurnal", [1, 1, 1, -1, 0], -90.0, [J1 => 1]),
    constituent!("MM", "lunar monthly", [0, 1, 0, -1, 0], 0.0, [Mm => 1]),
    constituent!("SSA", "solar semiannual", [0, 0, 2, 0, 0], 0.0, []),
    constituent!("SA", "solar annual", [0, 0, 1, 0, 0], 0.0, []),
    constituent!("MSF", "lunisolar synodic fortnightly", [0, 2, -2, 0, 0], 0.0, [M2 => -1]),
    constituent!("MF", "lunisolar fortnightly", [0, 2, 0, 0, 0], 0.0, [Mf => 1]),
    constituent!("RHO", "larger lunar evectional diurnal", [1, -3, 3, -1, 0], 90.0, [O1 => 1]),
    constituent!("Q1", "larger lunar elliptic diurnal", [1, -3, 1, 1, 0], 90.0, [O1 => 1]),
    constituent!("T2", "larger solar elliptic", [2, 0, -1, 0, 1], 0.0, []),
    constituent!("R2", "smaller solar elliptic", [2, 0, 1, 0, -1], 180.0, []),
    constituent!("2Q1", "larger elliptic diurnal", [1, -4, 1, 2, 0], 90.0, [O1 => 1]),
    constituent!("P1", "solar diurnal", [1, 0, -1, 0, 0], 90.0, []),
    constituent!("2SM2", "shallow water semidiurnal", [2, 2, -2, 0, 0], 0.0, [M2 => -1]),
    constituent!("M3", "lunar terdiurnal", [3, -3, 3, 0, 0], 0.0, [M3 => 1]),
    constituent!("L2", "smaller lunar elliptic semidiurnal", [2, -1, 2, -1, 0], 180.0, [L2 => 1]),
    constituent!("2MK3", "shallow water terdiurnal", [3, -4, 3, 0, 0], 90.0, [M2 => 2, K1 => -1]),
    constituent!("K2", "lunisolar semidiurnal", [2, 0, 2, 0, 0], 0.0, [K2 => 1]),
    constituent!("M8", "shallow water eighth diurnal", [8, -8, 8, 0, 0], 0.0, [M2 => 4]),
    constituent!("MS4", "shallow water quarter diurnal", [4, -2, 2, 0, 0], 0.0, [M2 => 1]),
    constituent!("SK3", "shallow water terdiurnal", [3, 0, 1, 0, 0], -90.0, [K1 => 1]),
    constituent!("MK4", "shallow water quarter diurnal", [4, -2, 4, 0, 0], 0.0, [M2 => 1, K2 => 1]),
    constituent!("SN4", "shallow water quarter diurnal", [4, -3, 2, 1, 0], 0.0, [M2 => 1]),
    constituent!("2MN6", "shallow water sixth diurnal", [6, -7, 6, 1, 0], 0.0, [M2 => 3]),
    constituent!("2MS6", "shallow water sixth diurnal", [6, -4, 4, 0, 0], 0.0, [M2 => 2]),
];

/// All known constituents in priority order.
pub fn catalog() -> &'static [ConstituentDef] {
    &CATALOG
}

/// Look up a constituent by name (case-insensitive).
pub fn lookup(name: &str) -> Option<&'static ConstituentDef> {
    CATALOG.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}
