//! ADSR power envelope with optional wave modulation during sustain.
//!
//! An appliance unit that is switched on ramps linearly from 0 to full power
//! over the attack time, falls linearly to the sustain level over the decay
//! time and then holds the sustain level, modulated by a periodic wave. A
//! unit that is switched off ramps linearly from full power to 0 over the
//! release time.
//!
//! The release ramp always starts at 1.0, whatever the multiplier was when
//! the unit was switched off. A unit released during sustain therefore jumps
//! up to full power before ramping down.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Periodic modulation applied to the sustain level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveKind {
    #[default]
    None,
    Sine,
    Square,
    /// Stepwise noise: one seeded draw per wave period, so the value holds
    /// constant within a period and jumps between periods.
    Random,
}

impl WaveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for WaveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaveKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "sine" => Ok(Self::Sine),
            "square" => Ok(Self::Square),
            "random" => Ok(Self::Random),
            other => Err(SimError::InvalidConfiguration(format!(
                "unknown wave kind \"{other}\", expected none, sine, square or random"
            ))),
        }
    }
}

/// Envelope parameters of one appliance type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeParams {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level as a fraction of base wattage (0–1).
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
    #[serde(default)]
    pub wave: WaveKind,
    /// Wave period in seconds; must be > 0 unless `wave` is `None`.
    #[serde(default)]
    pub wave_period: f64,
    /// Wave amplitude as a fraction of the sustain level (0–1).
    #[serde(default)]
    pub wave_amplitude: f64,
}

impl EnvelopeParams {
    /// Creates parameters without wave modulation.
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            wave: WaveKind::None,
            wave_period: 0.0,
            wave_amplitude: 0.0,
        }
    }

    /// Adds wave modulation to the sustain phase.
    pub fn with_wave(mut self, wave: WaveKind, period: f64, amplitude: f64) -> Self {
        self.wave = wave;
        self.wave_period = period;
        self.wave_amplitude = amplitude;
        self
    }

    /// Checks every parameter and returns the first violation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for negative or non-finite durations,
    /// a sustain level or wave amplitude outside `[0, 1]`, or a non-positive
    /// wave period while a wave is set.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("release", self.release),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidConfiguration(format!(
                    "{name} must be a finite duration >= 0, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(SimError::InvalidConfiguration(format!(
                "sustain must be in [0, 1], got {}",
                self.sustain
            )));
        }
        if !(0.0..=1.0).contains(&self.wave_amplitude) {
            return Err(SimError::InvalidConfiguration(format!(
                "wave amplitude must be in [0, 1], got {}",
                self.wave_amplitude
            )));
        }
        check_wave_period(self)
    }
}

fn check_wave_period(params: &EnvelopeParams) -> Result<(), SimError> {
    if params.wave != WaveKind::None && !(params.wave_period.is_finite() && params.wave_period > 0.0)
    {
        return Err(SimError::InvalidConfiguration(format!(
            "{} wave needs a period > 0, got {}",
            params.wave, params.wave_period
        )));
    }
    Ok(())
}

/// On/off history of one tracked appliance unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeRecord {
    /// Simulation seconds at which the current phase began.
    pub start_time: f64,
    /// `true` while attacking/decaying/sustaining, `false` once released.
    pub is_active: bool,
}

impl EnvelopeRecord {
    /// A unit switched on at `now`.
    pub fn on(now: f64) -> Self {
        Self {
            start_time: now,
            is_active: true,
        }
    }

    /// A unit switched off at `now`.
    pub fn off(now: f64) -> Self {
        Self {
            start_time: now,
            is_active: false,
        }
    }

    /// Seconds spent in the current phase, never negative.
    pub fn phase_elapsed(&self, now: f64) -> f64 {
        (now - self.start_time).max(0.0)
    }

    /// `true` once a released unit has fully ramped down.
    pub fn is_expired(&self, release: f64, now: f64) -> bool {
        !self.is_active && now - self.start_time > release
    }
}

/// Power multiplier of one unit at simulation time `now`.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if `params` fails
/// [`EnvelopeParams::validate`], whatever phase the record is in.
///
/// # Examples
///
/// ```
/// use houseload_sim::sim::envelope::{EnvelopeParams, EnvelopeRecord, multiplier};
///
/// let params = EnvelopeParams::new(1.0, 1.0, 0.5, 1.0);
/// let record = EnvelopeRecord::on(0.0);
/// assert_eq!(multiplier(&params, &record, 0.5), Ok(0.5));
/// assert_eq!(multiplier(&params, &record, 1.5), Ok(0.75));
/// assert_eq!(multiplier(&params, &record, 3.0), Ok(0.5));
/// ```
pub fn multiplier(
    params: &EnvelopeParams,
    record: &EnvelopeRecord,
    now: f64,
) -> Result<f64, SimError> {
    params.validate()?;
    let dt = record.phase_elapsed(now);

    if !record.is_active {
        return Ok(release_multiplier(params.release, dt));
    }

    if params.attack > 0.0 && dt <= params.attack {
        return Ok(dt / params.attack);
    }

    let decay_end = params.attack + params.decay;
    if params.decay > 0.0 && dt <= decay_end {
        let progress = (dt - params.attack) / params.decay;
        return Ok(1.0 - (1.0 - params.sustain) * progress);
    }

    Ok(params.sustain * wave_multiplier(params, dt)?)
}

fn release_multiplier(release: f64, dt: f64) -> f64 {
    if release > 0.0 && dt <= release {
        1.0 - dt / release
    } else {
        0.0
    }
}

/// Wave modulation factor at `dt` seconds into the phase.
///
/// # Errors
///
/// Returns `InvalidConfiguration` if a wave is set without a positive period.
pub fn wave_multiplier(params: &EnvelopeParams, dt: f64) -> Result<f64, SimError> {
    check_wave_period(params)?;
    let amplitude = params.wave_amplitude;
    let period = params.wave_period;

    let factor = match params.wave {
        WaveKind::None => 1.0,
        WaveKind::Sine => {
            let phase = dt.rem_euclid(period) / period;
            1.0 + amplitude * (2.0 * PI * phase).sin()
        }
        WaveKind::Square => {
            let phase = dt.rem_euclid(period) / period;
            if phase < 0.5 {
                1.0 + amplitude
            } else {
                1.0 - amplitude
            }
        }
        WaveKind::Random => {
            let bucket = (dt / period).floor().max(0.0) as u64;
            let mut rng = StdRng::seed_from_u64(bucket);
            1.0 + amplitude * rng.random_range(-1.0..=1.0)
        }
    };
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn adsr() -> EnvelopeParams {
        EnvelopeParams::new(1.0, 1.0, 0.5, 1.0)
    }

    fn at(params: &EnvelopeParams, record: &EnvelopeRecord, now: f64) -> f64 {
        multiplier(params, record, now).expect("valid params")
    }

    #[test]
    fn attack_ramps_linearly() {
        let p = adsr();
        let r = EnvelopeRecord::on(0.0);
        assert!((at(&p, &r, 0.0)).abs() < EPS);
        assert!((at(&p, &r, 0.25) - 0.25).abs() < EPS);
        assert!((at(&p, &r, 1.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn decay_ramps_to_sustain() {
        let p = adsr();
        let r = EnvelopeRecord::on(0.0);
        assert!((at(&p, &r, 1.5) - 0.75).abs() < EPS);
        assert!((at(&p, &r, 2.0) - 0.5).abs() < EPS);
        assert!((at(&p, &r, 10.0) - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_attack_starts_at_full_power() {
        let p = EnvelopeParams::new(0.0, 2.0, 0.5, 1.0);
        let r = EnvelopeRecord::on(0.0);
        assert!((at(&p, &r, 0.0) - 1.0).abs() < EPS);
        assert!((at(&p, &r, 1.0) - 0.75).abs() < EPS);
    }

    #[test]
    fn zero_attack_and_decay_go_straight_to_sustain() {
        let p = EnvelopeParams::new(0.0, 0.0, 0.3, 1.0);
        let r = EnvelopeRecord::on(5.0);
        assert!((at(&p, &r, 5.0) - 0.3).abs() < EPS);
    }

    #[test]
    fn release_ramps_from_full_regardless_of_sustain() {
        let p = adsr();
        let r = EnvelopeRecord::off(3.0);
        assert!((at(&p, &r, 3.0) - 1.0).abs() < EPS);
        assert!((at(&p, &r, 3.5) - 0.5).abs() < EPS);
        assert!(at(&p, &r, 4.0).abs() < EPS);
        assert_eq!(at(&p, &r, 9.0), 0.0);
    }

    #[test]
    fn zero_release_cuts_immediately() {
        let p = EnvelopeParams::new(1.0, 1.0, 0.5, 0.0);
        let r = EnvelopeRecord::off(0.0);
        assert_eq!(at(&p, &r, 0.0), 0.0);
    }

    #[test]
    fn clock_behind_start_time_is_clamped() {
        let p = adsr();
        let r = EnvelopeRecord::on(2.0);
        assert_eq!(at(&p, &r, 1.0), 0.0);
    }

    #[test]
    fn sine_wave_modulates_sustain() {
        let p = adsr().with_wave(WaveKind::Sine, 4.0, 0.1);
        // quarter period: sin = 1
        let m = wave_multiplier(&p, 1.0).expect("valid");
        assert!((m - 1.1).abs() < EPS);
        let m = wave_multiplier(&p, 3.0).expect("valid");
        assert!((m - 0.9).abs() < EPS);
        let r = EnvelopeRecord::on(0.0);
        // dt = 5.0 is a quarter into the second period
        assert!((at(&p, &r, 5.0) - 0.55).abs() < EPS);
    }

    #[test]
    fn square_wave_alternates_halves() {
        let p = adsr().with_wave(WaveKind::Square, 2.0, 0.06);
        assert!((wave_multiplier(&p, 0.5).expect("valid") - 1.06).abs() < EPS);
        assert!((wave_multiplier(&p, 1.0).expect("valid") - 0.94).abs() < EPS);
        assert!((wave_multiplier(&p, 2.2).expect("valid") - 1.06).abs() < EPS);
    }

    #[test]
    fn random_wave_is_stable_within_a_period() {
        let p = adsr().with_wave(WaveKind::Random, 2.0, 0.2);
        let a = wave_multiplier(&p, 4.1).expect("valid");
        let b = wave_multiplier(&p, 5.9).expect("valid");
        assert_eq!(a, b);
        assert!((0.8..=1.2).contains(&a));
    }

    #[test]
    fn random_wave_is_reproducible() {
        let p = adsr().with_wave(WaveKind::Random, 1.0, 0.5);
        for k in 0..20 {
            let dt = k as f64 + 0.5;
            assert_eq!(wave_multiplier(&p, dt), wave_multiplier(&p, dt));
        }
    }

    #[test]
    fn wave_without_period_is_invalid() {
        let p = adsr().with_wave(WaveKind::Sine, 0.0, 0.1);
        assert!(matches!(
            wave_multiplier(&p, 1.0),
            Err(SimError::InvalidConfiguration(_))
        ));
        let r = EnvelopeRecord::on(0.0);
        assert!(multiplier(&p, &r, 0.5).is_err());
        assert!(multiplier(&p, &r, 5.0).is_err());
    }

    #[test]
    fn invalid_params_fail_in_every_phase() {
        let nan_sustain = EnvelopeParams::new(1.0, 1.0, f64::NAN, 1.0);
        let negative_attack = EnvelopeParams::new(-1.0, 1.0, 0.5, 1.0);
        for p in [nan_sustain, negative_attack] {
            assert!(multiplier(&p, &EnvelopeRecord::on(0.0), 0.5).is_err());
            assert!(multiplier(&p, &EnvelopeRecord::on(0.0), 5.0).is_err());
            assert!(multiplier(&p, &EnvelopeRecord::off(0.0), 0.5).is_err());
        }
    }

    #[test]
    fn unknown_wave_tag_is_rejected() {
        assert_eq!("sine".parse::<WaveKind>(), Ok(WaveKind::Sine));
        assert!(matches!(
            "triangle".parse::<WaveKind>(),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_params() {
        assert!(adsr().validate().is_ok());
        assert!(EnvelopeParams::new(-1.0, 1.0, 0.5, 1.0).validate().is_err());
        assert!(EnvelopeParams::new(1.0, 1.0, 1.5, 1.0).validate().is_err());
        assert!(EnvelopeParams::new(1.0, f64::NAN, 0.5, 1.0).validate().is_err());
        assert!(adsr().with_wave(WaveKind::Square, -2.0, 0.1).validate().is_err());
        assert!(adsr().with_wave(WaveKind::Sine, 1.0, 1.5).validate().is_err());
    }

    #[test]
    fn expired_only_after_release_elapsed() {
        let r = EnvelopeRecord::off(1.0);
        assert!(!r.is_expired(1.0, 2.0));
        assert!(r.is_expired(1.0, 2.01));
        assert!(!EnvelopeRecord::on(0.0).is_expired(1.0, 100.0));
    }

    proptest! {
        #[test]
        fn active_envelope_rises_then_falls(
            attack in 0.01f64..10.0,
            decay in 0.01f64..10.0,
            sustain in 0.0f64..=1.0,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
        ) {
            let p = EnvelopeParams::new(attack, decay, sustain, 1.0);
            let r = EnvelopeRecord::on(0.0);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

            let m_lo = at(&p, &r, lo * attack);
            let m_hi = at(&p, &r, hi * attack);
            prop_assert!(m_lo <= m_hi + EPS);
            prop_assert!((0.0..=1.0 + EPS).contains(&m_hi));

            let d_lo = at(&p, &r, attack + lo * decay);
            let d_hi = at(&p, &r, attack + hi * decay);
            prop_assert!(d_hi <= d_lo + EPS);
            prop_assert!(d_hi >= sustain - EPS);
        }

        #[test]
        fn release_is_linear_from_one_to_zero(
            release in 0.01f64..10.0,
            start in 0.0f64..100.0,
            frac in 0.0f64..=1.0,
        ) {
            let p = EnvelopeParams::new(1.0, 1.0, 0.4, release);
            let r = EnvelopeRecord::off(start);
            let m = at(&p, &r, start + frac * release);
            prop_assert!((m - (1.0 - frac)).abs() < 1e-6);
            prop_assert!(at(&p, &r, start + release).abs() < 1e-6);
        }
    }
}
