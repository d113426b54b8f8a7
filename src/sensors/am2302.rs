//! AM2302 single-wire humidity/temperature protocol decoder.
//!
//! ```text
//!  host        sensor start      bit "0"         bit "1"
//!  ──┐  2 ms ┌──┐     ┌────┐     ┌──┐   ┌──┐     ┌──────┐   ┌─ ...
//!    └───────┘  └─────┘    └─────┘  └───┘  └─────┘      └───┘
//!               80 µs  80 µs    50 µs 27 µs    50 µs  70 µs
//! ```
//!
//! The capture hardware reports one [`CaptureSample`] per falling edge:
//! `period` is falling-to-falling, `sub` is the low time.  The first sample
//! after arming spans the host release and is discarded; the second must be
//! the 80/80 start sequence; the next 40 carry the data bits MSB first.
//!
//! Every nominal duration `v` accepts `[v - v/2, v + v/2)` (integer
//! arithmetic).  The "1" window is tested before the "0" window, so a high
//! phase in the overlap `[35, 40)` decodes as 1.

use embassy_time::{Duration, Timer, with_timeout};

use super::capture::CaptureSample;
use crate::error::SensorError;

// ── Protocol timing ───────────────────────────────────────────

/// Host start pulse (line held low).
pub const START_PULSE: Duration = Duration::from_millis(2);
/// Task-side wait for each captured edge.
pub const BIT_DEADLINE: Duration = Duration::from_millis(2);
/// Caller-side deadline for a whole exchange.
pub const READ_DEADLINE: Duration = Duration::from_millis(10);
/// Hardware silence timeout programmed into the capture timer.
pub const EDGE_TIMEOUT_US: u32 = 320;
/// Minimum spacing between two exchanges recommended by the datasheet.
pub const COLLECTION_PERIOD_MS: u32 = 2000;

pub const PACKET_LEN: usize = 5;
const DATA_BITS: u8 = (PACKET_LEN as u8) * 8;

// ── Tolerance windows ─────────────────────────────────────────

/// `[nominal - nominal/2, nominal + nominal/2)` in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    low: u32,
    high: u32,
}

impl Window {
    pub const fn around(nominal: u32) -> Self {
        Self {
            low: nominal - nominal / 2,
            high: nominal + nominal / 2,
        }
    }

    pub const fn contains(&self, us: u32) -> bool {
        us >= self.low && us < self.high
    }

    pub const fn bounds(&self) -> (u32, u32) {
        (self.low, self.high)
    }
}

pub const START_LOW: Window = Window::around(80);
pub const START_HIGH: Window = Window::around(80);
pub const BIT_LOW: Window = Window::around(50);
pub const ONE_HIGH: Window = Window::around(70);
pub const ZERO_HIGH: Window = Window::around(27);

/// Classify one data-bit sample.
pub fn classify_bit(sample: CaptureSample) -> Result<bool, SensorError> {
    if sample.is_timeout() {
        return Err(SensorError::Timeout);
    }
    if !BIT_LOW.contains(sample.sub) {
        return Err(SensorError::DecodeError);
    }
    let high = sample.rest();
    if ONE_HIGH.contains(high) {
        Ok(true)
    } else if ZERO_HIGH.contains(high) {
        Ok(false)
    } else {
        Err(SensorError::DecodeError)
    }
}

fn is_start(sample: CaptureSample) -> bool {
    START_LOW.contains(sample.sub) && START_HIGH.contains(sample.rest())
}

// ── Packet / reading ──────────────────────────────────────────

/// Raw 5-byte frame: humidity (2), temperature (2), checksum (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet(pub [u8; PACKET_LEN]);

impl Packet {
    /// Build a frame with a correct checksum byte.
    pub fn from_reading(reading: Reading) -> Self {
        let [h0, h1] = reading.humidity.to_be_bytes();
        let mag = reading.temperature.unsigned_abs() & 0x7fff;
        let raw_t = if reading.temperature < 0 { mag | 0x8000 } else { mag };
        let [t0, t1] = raw_t.to_be_bytes();
        let mut bytes = [h0, h1, t0, t1, 0];
        bytes[4] = Self::checksum_of(&bytes);
        Self(bytes)
    }

    fn checksum_of(bytes: &[u8; PACKET_LEN]) -> u8 {
        bytes[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    pub fn checksum_ok(&self) -> bool {
        self.0[4] == Self::checksum_of(&self.0)
    }

    pub fn reading(&self) -> Reading {
        let humidity = u16::from_be_bytes([self.0[0], self.0[1]]);
        let raw_t = u16::from_be_bytes([self.0[2], self.0[3]]);
        let mag = (raw_t & 0x7fff) as i16;
        let temperature = if raw_t & 0x8000 != 0 { -mag } else { mag };
        Reading { temperature, humidity }
    }
}

/// Decoded values in tenths (°C and %RH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reading {
    pub temperature: i16,
    pub humidity: u16,
}

// ── Frame decoder ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Preamble,
    Start,
    Data,
}

/// Streaming decoder: one call per captured edge.
///
/// Returns `Ok(Some(packet))` once 40 bits are in and the checksum holds.
/// Any error, and any completed packet, rewinds the decoder to expect a
/// fresh exchange.
#[derive(Debug)]
pub struct FrameDecoder {
    stage: Stage,
    bits: u8,
    bytes: [u8; PACKET_LEN],
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            stage: Stage::Preamble,
            bits: 0,
            bytes: [0; PACKET_LEN],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of data bits decoded so far.
    pub fn bits_received(&self) -> u8 {
        self.bits
    }

    pub fn feed(&mut self, sample: CaptureSample) -> Result<Option<Packet>, SensorError> {
        let out = self.step(sample);
        if !matches!(out, Ok(None)) {
            self.reset();
        }
        out
    }

    fn step(&mut self, sample: CaptureSample) -> Result<Option<Packet>, SensorError> {
        if sample.is_timeout() {
            return Err(SensorError::Timeout);
        }
        match self.stage {
            Stage::Preamble => {
                self.stage = Stage::Start;
                Ok(None)
            }
            Stage::Start => {
                if !is_start(sample) {
                    return Err(SensorError::DecodeError);
                }
                self.stage = Stage::Data;
                Ok(None)
            }
            Stage::Data => {
                let bit = classify_bit(sample)?;
                let idx = usize::from(self.bits / 8);
                self.bytes[idx] = (self.bytes[idx] << 1) | u8::from(bit);
                self.bits += 1;
                if self.bits < DATA_BITS {
                    return Ok(None);
                }
                let packet = Packet(self.bytes);
                if packet.checksum_ok() {
                    Ok(Some(packet))
                } else {
                    Err(SensorError::ChecksumError)
                }
            }
        }
    }
}

// ── Line access + one exchange ────────────────────────────────

/// The pin and capture peripheral behind one sensor.
#[allow(async_fn_in_trait)]
pub trait SensorLine {
    /// Configure the pin as open-drain output, driven low.
    fn drive_low(&mut self);
    /// Return the pin to floating input.
    fn release(&mut self);
    /// Enable capture and silence-timeout interrupts; drop stale samples.
    fn arm_capture(&mut self);
    fn disarm_capture(&mut self);
    /// Next captured sample.  Never completes if no edge ever arrives.
    async fn next_edge(&mut self) -> CaptureSample;
}

/// Run one request/response exchange on `line`.
pub async fn exchange<L: SensorLine>(line: &mut L) -> Result<Packet, SensorError> {
    line.drive_low();
    Timer::after(START_PULSE).await;
    line.arm_capture();
    line.release();
    let result = receive(line).await;
    line.disarm_capture();
    result
}

async fn receive<L: SensorLine>(line: &mut L) -> Result<Packet, SensorError> {
    let mut decoder = FrameDecoder::new();
    loop {
        let sample = with_timeout(BIT_DEADLINE, line.next_edge())
            .await
            .map_err(|_| SensorError::IrqTimeout)?;
        if let Some(packet) = decoder.feed(sample)? {
            return Ok(packet);
        }
    }
}

/// Nominal capture samples a healthy sensor produces for `packet`,
/// including the discarded first sample.
pub fn pulse_train(packet: &Packet) -> impl Iterator<Item = CaptureSample> + '_ {
    let lead = [CaptureSample::new(30, 0), CaptureSample::new(160, 80)];
    let bits = packet.0.iter().flat_map(|byte| {
        (0..8).rev().map(move |i| {
            if byte & (1 << i) != 0 {
                CaptureSample::new(120, 50)
            } else {
                CaptureSample::new(77, 50)
            }
        })
    });
    lead.into_iter().chain(bits)
}
