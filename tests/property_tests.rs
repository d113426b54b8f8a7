//! Property tests for the numeric and timing cores.
//!
//! Runs on host (x86_64) only: proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use growbox::control::pid::{OutputLimits, PidController, PidGains};
use growbox::drivers::dimmer::{DimmerState, phase_delay};
use growbox::drivers::phase_table::PhaseTable;
use growbox::fixed::Fixed;
use growbox::schedule::TimeOfDay;
use growbox::sensors::am2302::{FrameDecoder, Packet, Reading};
use growbox::sensors::capture::CaptureSample;
use proptest::prelude::*;

// ── AM2302 decoder ────────────────────────────────────────────

/// Per-bit timing jitter, kept inside the tolerance windows.
#[derive(Debug, Clone)]
struct Jitter {
    start_low: u32,
    start_high: u32,
    lows: Vec<u32>,
    one_highs: Vec<u32>,
    zero_highs: Vec<u32>,
}

fn jitter() -> impl Strategy<Value = Jitter> {
    (
        40u32..120,
        40u32..120,
        prop::collection::vec(25u32..75, 40),
        prop::collection::vec(35u32..105, 40),
        // The zero window overlaps the one window above 35 µs.
        prop::collection::vec(14u32..35, 40),
    )
        .prop_map(|(start_low, start_high, lows, one_highs, zero_highs)| Jitter {
            start_low,
            start_high,
            lows,
            one_highs,
            zero_highs,
        })
}

fn jittered_train(packet: &Packet, j: &Jitter) -> Vec<CaptureSample> {
    let mut samples = vec![
        CaptureSample::new(30, 0),
        CaptureSample::new(j.start_low + j.start_high, j.start_low),
    ];
    for n in 0..40 {
        let bit = packet.0[n / 8] & (0x80 >> (n % 8)) != 0;
        let high = if bit { j.one_highs[n] } else { j.zero_highs[n] };
        samples.push(CaptureSample::new(j.lows[n] + high, j.lows[n]));
    }
    samples
}

proptest! {
    /// Any in-window timing decodes to exactly the transmitted reading.
    #[test]
    fn decoder_accepts_jittered_frames(
        temperature in -400i16..=800,
        humidity in 0u16..=1000,
        j in jitter(),
    ) {
        let reading = Reading { temperature, humidity };
        let packet = Packet::from_reading(reading);
        let mut decoder = FrameDecoder::new();

        let mut decoded = None;
        for sample in jittered_train(&packet, &j) {
            prop_assert!(decoded.is_none(), "samples after a completed frame");
            decoded = decoder.feed(sample).map_err(|e| TestCaseError::fail(format!("{e:?}")))?;
        }
        prop_assert_eq!(decoded.map(|p| p.reading()), Some(reading));
        prop_assert_eq!(decoder.bits_received(), 0);
    }

    /// Arbitrary samples never produce a frame with a bad checksum, and the
    /// decoder always rewinds after a result.
    #[test]
    fn decoder_output_is_always_checksummed(
        samples in prop::collection::vec((0u32..400, 0u32..200), 0..120),
    ) {
        let mut decoder = FrameDecoder::new();
        for (period, sub) in samples {
            match decoder.feed(CaptureSample::new(period, sub)) {
                Ok(Some(packet)) => {
                    prop_assert!(packet.checksum_ok());
                    prop_assert_eq!(decoder.bits_received(), 0);
                }
                Ok(None) => prop_assert!(decoder.bits_received() < 40),
                Err(_) => prop_assert_eq!(decoder.bits_received(), 0),
            }
        }
    }
}

// ── Phase control ─────────────────────────────────────────────

static PERCENT_DIMMER: DimmerState = DimmerState::new(&PhaseTable::PERCENT);

proptest! {
    /// More power never fires later, and every delay lands inside the
    /// half cycle when the detector offset is below it.
    #[test]
    fn phase_delay_is_monotonic_and_bounded(
        period in 16_000u32..=25_000,
        offset in 0u32..2_000,
        level in 1u16..99,
    ) {
        let table = &PhaseTable::PERCENT;
        let sample = CaptureSample::new(period, offset);
        let lo = table.entry(level).ok_or_else(|| TestCaseError::fail("no entry"))?;
        let hi = table.entry(level + 1).ok_or_else(|| TestCaseError::fail("no entry"))?;

        let d_lo = phase_delay(sample, lo, table.shift());
        let d_hi = phase_delay(sample, hi, table.shift());
        prop_assert!(d_hi <= d_lo, "level {} fired at {} after level {} at {}", level + 1, d_hi, level, d_lo);
        prop_assert!(u32::from(d_lo) < period / 2);
    }

    /// Any request is accepted and reads back clamped to the table range.
    #[test]
    fn dimmer_level_reads_back_clamped(level in any::<u16>()) {
        PERCENT_DIMMER.set(level);
        prop_assert_eq!(PERCENT_DIMMER.level(), level.min(100));
    }
}

// ── PID ───────────────────────────────────────────────────────

fn fixed(range: core::ops::Range<i32>) -> impl Strategy<Value = Fixed> {
    range.prop_map(Fixed::from_bits)
}

proptest! {
    /// With `Ki = Kd = 0` the output is exactly the clamped proportional term.
    #[test]
    fn p_only_output_is_clamped_proportional(
        kp in fixed(-20_480..20_480),
        input in fixed(-102_400..102_400),
        setpoint in fixed(-102_400..102_400),
        steps in prop::collection::vec(0u32..5_000, 1..8),
    ) {
        let limits = OutputLimits::new(Fixed::ZERO, Fixed::from_int(100));
        let gains = PidGains { kp, ki: Fixed::ZERO, kd: Fixed::ZERO };
        let mut pid = PidController::new(gains, limits);
        let expected = kp.mul(setpoint.saturating_sub(input)).clamp(limits.low, limits.high);

        let mut t = 0u32;
        for dt in steps {
            t = t.wrapping_add(dt);
            prop_assert_eq!(pid.compute(input, setpoint, t), expected);
            prop_assert_eq!(pid.integral(), Fixed::ZERO);
        }
    }

    /// The integral term never leaves the output limits.
    #[test]
    fn integral_term_stays_within_limits(
        ki in fixed(1..10_240),
        errors in prop::collection::vec(-51_200i32..51_200, 1..40),
    ) {
        let limits = OutputLimits::new(Fixed::ZERO, Fixed::from_int(100));
        let gains = PidGains { kp: Fixed::ZERO, ki, kd: Fixed::ZERO };
        let mut pid = PidController::new(gains, limits);

        for (n, e) in errors.into_iter().enumerate() {
            let out = pid.compute(Fixed::ZERO, Fixed::from_bits(e), n as u32 * 2_000);
            prop_assert!(out >= limits.low && out <= limits.high);
            let term = ki.mul(pid.integral());
            // One unit of slack for the truncating divide in the clamp.
            prop_assert!(term >= limits.low.saturating_sub(ki) && term <= limits.high.saturating_add(ki));
        }
    }
}

// ── Fixed-point text ──────────────────────────────────────────

proptest! {
    /// Four decimals are finer than one fractional unit, so the default
    /// rendering always parses back to the same value.
    #[test]
    fn fixed_display_parses_back(bits in any::<i32>()) {
        let v = Fixed::from_bits(bits);
        let text = v.to_string();
        prop_assert_eq!(text.parse::<Fixed>(), Ok(v), "{}", text);
    }

    #[test]
    fn fixed_parses_integers_exactly(n in -2_000_000i32..2_000_000) {
        prop_assert_eq!(n.to_string().parse::<Fixed>(), Ok(Fixed::from_int(n)));
    }
}

// ── Time of day ───────────────────────────────────────────────

proptest! {
    #[test]
    fn time_of_day_wraps_modulo_one_day(secs in any::<u32>()) {
        let t = TimeOfDay::from_seconds(secs);
        prop_assert_eq!(t.seconds(), secs % 86_400);
        prop_assert_eq!(t.to_string().parse::<TimeOfDay>(), Ok(t));
    }
}
