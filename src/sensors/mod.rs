//! Sensor subsystem.
//!
//! ```text
//!   poller ── read(timeout) ──▶ [ request slot (depth 1) ] ──▶ decode task
//!      ▲                                                          │
//!      └──────────── reply signal {seq, result} ◀─────────────────┘
//! ```
//!
//! One decode task owns the sensor line and serves requests from a single
//! in-flight slot.  Every request carries a sequence number and the reply
//! echoes it, so a reply for a request whose caller already gave up is
//! recognised and dropped instead of satisfying a later read.

pub mod am2302;
pub mod capture;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, with_deadline};
use log::debug;

use crate::error::SensorError;
use am2302::{Packet, Reading, SensorLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadRequest {
    seq: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadReply {
    seq: u32,
    result: Result<Packet, SensorError>,
}

/// Request/reply rendezvous between callers and the decode task.
pub struct SensorLink {
    requests: Channel<CriticalSectionRawMutex, ReadRequest, 1>,
    replies: Signal<CriticalSectionRawMutex, ReadReply>,
    /// Serialises callers; holds the last issued sequence number.
    client: Mutex<CriticalSectionRawMutex, u32>,
}

impl Default for SensorLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorLink {
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            replies: Signal::new(),
            client: Mutex::new(0),
        }
    }

    /// Submit one read and wait for its reply, all within `timeout`.
    ///
    /// On expiry an unserved request is withdrawn from the slot and
    /// [`SensorError::RcvTimeout`] is returned; a request already taken by
    /// the decode task finishes there and its reply is discarded later.
    pub async fn read(&self, timeout: Duration) -> Result<Reading, SensorError> {
        let deadline = Instant::now() + timeout;
        let mut last_seq = with_deadline(deadline, self.client.lock())
            .await
            .map_err(|_| SensorError::RcvTimeout)?;

        *last_seq = last_seq.wrapping_add(1);
        let seq = *last_seq;

        self.replies.reset();
        if self.requests.try_send(ReadRequest { seq }).is_err() {
            // A withdrawn-too-late request can only linger if the decode task
            // stalled; replace it rather than queueing behind it.
            if let Ok(stale) = self.requests.try_receive() {
                debug!("sensor: replaced lingering request #{} with #{}", stale.seq, seq);
            }
            if self.requests.try_send(ReadRequest { seq }).is_err() {
                debug!("sensor: request slot still busy, #{} not queued", seq);
            }
        }

        let reply = with_deadline(deadline, async {
            loop {
                let reply = self.replies.wait().await;
                if reply.seq == seq {
                    break reply.result;
                }
                debug!("sensor: dropped stale reply #{} (waiting for #{})", reply.seq, seq);
            }
        })
        .await;

        match reply {
            Ok(result) => result.map(|packet| packet.reading()),
            Err(_) => {
                if self.requests.try_receive().is_ok() {
                    debug!("sensor: withdrew unserved request #{}", seq);
                }
                Err(SensorError::RcvTimeout)
            }
        }
    }

    /// True when no request is queued and no caller holds the slot.
    pub fn is_idle(&self) -> bool {
        self.requests.is_empty() && self.client.try_lock().is_ok()
    }

    /// Decode-task body: serve requests forever.
    pub async fn serve<L: SensorLine>(&self, line: &mut L) -> ! {
        loop {
            self.serve_one(line).await;
        }
    }

    /// Wait for one request, run the exchange and post the reply.
    pub async fn serve_one<L: SensorLine>(&self, line: &mut L) {
        let request = self.requests.receive().await;
        let result = am2302::exchange(line).await;
        if let Err(e) = result {
            debug!("sensor: exchange #{} failed: {}", request.seq, e);
        }
        self.replies.signal(ReadReply {
            seq: request.seq,
            result,
        });
    }
}

/// The link shared by the decode task and the control loop.
pub static SENSOR_LINK: SensorLink = SensorLink::new();

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::future::{block_on, zip};

    #[test]
    fn read_without_decoder_times_out_and_frees_slot() {
        let link = SensorLink::new();
        let r = block_on(link.read(Duration::from_millis(10)));
        assert_eq!(r, Err(SensorError::RcvTimeout));
        assert!(link.is_idle());

        let r = block_on(link.read(Duration::from_millis(5)));
        assert_eq!(r, Err(SensorError::RcvTimeout));
        assert!(link.is_idle());
    }

    #[test]
    fn late_reply_for_abandoned_request_is_dropped() {
        use embassy_time::Timer;

        let link = SensorLink::new();
        assert_eq!(
            block_on(link.read(Duration::from_millis(5))),
            Err(SensorError::RcvTimeout)
        );

        let stale = Packet::from_reading(Reading { temperature: 1, humidity: 1 });
        let fresh = Packet::from_reading(Reading { temperature: 250, humidity: 600 });
        let late_decoder = async {
            // Reply to request #1, which timed out above.
            link.replies.signal(ReadReply { seq: 1, result: Ok(stale) });
            Timer::after(Duration::from_millis(1)).await;
            let request = link.requests.receive().await;
            link.replies.signal(ReadReply { seq: request.seq, result: Ok(fresh) });
        };
        let (r, ()) = block_on(zip(link.read(Duration::from_millis(200)), late_decoder));
        assert_eq!(r, Ok(fresh.reading()));
    }

    #[test]
    fn lingering_request_is_replaced_by_the_new_one() {
        let link = SensorLink::new();
        assert!(link.requests.try_send(ReadRequest { seq: 99 }).is_ok());

        let reading = Reading { temperature: 215, humidity: 480 };
        let decoder = async {
            let request = link.requests.receive().await;
            assert_eq!(request.seq, 1);
            link.replies.signal(ReadReply {
                seq: request.seq,
                result: Ok(Packet::from_reading(reading)),
            });
        };
        let (r, ()) = block_on(zip(link.read(Duration::from_millis(200)), decoder));
        assert_eq!(r, Ok(reading));
        assert!(link.is_idle());
    }

    struct Silent;

    impl SensorLine for Silent {
        fn drive_low(&mut self) {}
        fn release(&mut self) {}
        fn arm_capture(&mut self) {}
        fn disarm_capture(&mut self) {}
        async fn next_edge(&mut self) -> capture::CaptureSample {
            core::future::pending().await
        }
    }

    #[test]
    fn decoder_error_reaches_caller() {
        let link = SensorLink::new();
        let mut line = Silent;
        let (r, ()) = block_on(zip(
            link.read(Duration::from_millis(200)),
            link.serve_one(&mut line),
        ));
        assert_eq!(r, Err(SensorError::IrqTimeout));
        assert!(link.is_idle());
    }
}
