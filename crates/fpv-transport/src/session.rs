//! Receiver session state machine: INIT -> STUN_GATHER -> WAIT_SENDER ->
//! PUNCHING -> STREAMING, with an ERROR sink. Also owns the IDR rate limit
//! and the idle-shutdown timer.

use fpv_core::types::{IdrReason, SessionState};
use fpv_proto::{KEEPALIVE_INTERVAL_MS, SESSION_IDLE_TIMEOUT_MS};
use tracing::info;

const IDR_REQUEST_MIN_INTERVAL_US: u64 = 1_000_000;

pub struct SessionDriver {
    state: SessionState,
    state_entered_us: u64,
    last_idr_request_us: Option<u64>,
    last_keepalive_sent_us: Option<u64>,
}

impl SessionDriver {
    pub fn new(now_us: u64) -> Self {
        Self {
            state: SessionState::Init,
            state_entered_us: now_us,
            last_idr_request_us: None,
            last_keepalive_sent_us: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, to: SessionState, now_us: u64) {
        if self.state != to {
            info!(from = %self.state, to = %to, "session state transition");
            self.state = to;
            self.state_entered_us = now_us;
        }
    }

    /// The process has started local STUN discovery.
    pub fn start_stun_gather(&mut self, now_us: u64) {
        if self.state == SessionState::Init {
            self.transition(SessionState::StunGather, now_us);
        }
    }

    /// STUN discovery finished (success or exhausted retries); either way we
    /// move on to waiting for the sender to appear.
    pub fn stun_done(&mut self, now_us: u64) {
        if self.state == SessionState::StunGather {
            self.transition(SessionState::WaitSender, now_us);
        }
    }

    /// The first datagram from a peer arrived (keepalive or probe), or the
    /// remote address was supplied out of band: begin NAT punching.
    pub fn peer_discovered(&mut self, now_us: u64) {
        if matches!(self.state, SessionState::WaitSender | SessionState::Init | SessionState::StunGather) {
            self.transition(SessionState::Punching, now_us);
        }
    }

    /// A video fragment arrived: the link is confirmed end to end.
    pub fn video_received(&mut self, now_us: u64) {
        if self.state == SessionState::Punching {
            self.transition(SessionState::Streaming, now_us);
        }
    }

    pub fn enter_error(&mut self, now_us: u64) {
        self.transition(SessionState::Error, now_us);
    }

    /// Testable property #12: shut down if no datagram at all has arrived
    /// for `SESSION_IDLE_TIMEOUT_MS` while streaming.
    pub fn is_idle(&self, now_us: u64, last_any_packet_us: Option<u64>) -> bool {
        if self.state != SessionState::Streaming {
            return false;
        }
        match last_any_packet_us {
            Some(last) => now_us.saturating_sub(last) > SESSION_IDLE_TIMEOUT_MS * 1000,
            None => now_us.saturating_sub(self.state_entered_us) > SESSION_IDLE_TIMEOUT_MS * 1000,
        }
    }

    /// Testable property #11: at most one IDR_REQUEST per second regardless
    /// of how many callers ask.
    pub fn may_request_idr(&self, now_us: u64) -> bool {
        match self.last_idr_request_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) >= IDR_REQUEST_MIN_INTERVAL_US,
        }
    }

    pub fn record_idr_request(&mut self, now_us: u64) {
        self.last_idr_request_us = Some(now_us);
    }

    pub fn should_send_keepalive(&self, now_us: u64) -> bool {
        match self.last_keepalive_sent_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) >= KEEPALIVE_INTERVAL_MS * 1000,
        }
    }

    pub fn record_keepalive_sent(&mut self, now_us: u64) {
        self.last_keepalive_sent_us = Some(now_us);
    }
}

/// Picks the reason code to attach to the next IDR_REQUEST, honoring the
/// rate limit. Returns `None` if no request is due or the limiter blocks it.
pub fn idr_reason_for(driver: &mut SessionDriver, now_us: u64, assembler_needs_idr: bool, decode_failed: bool) -> Option<IdrReason> {
    if !assembler_needs_idr && !decode_failed {
        return None;
    }
    if !driver.may_request_idr(now_us) {
        return None;
    }
    driver.record_idr_request(now_us);
    Some(if decode_failed { IdrReason::DecodeError } else { IdrReason::Loss })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_through_the_full_lifecycle() {
        let mut d = SessionDriver::new(0);
        assert_eq!(d.state(), SessionState::Init);

        d.start_stun_gather(1);
        assert_eq!(d.state(), SessionState::StunGather);

        d.stun_done(2);
        assert_eq!(d.state(), SessionState::WaitSender);

        d.peer_discovered(3);
        assert_eq!(d.state(), SessionState::Punching);

        d.video_received(4);
        assert_eq!(d.state(), SessionState::Streaming);
    }

    #[test]
    fn idr_requests_are_rate_limited_to_once_per_second() {
        let mut d = SessionDriver::new(0);
        assert!(d.may_request_idr(0));
        d.record_idr_request(0);
        assert!(!d.may_request_idr(500_000));
        assert!(d.may_request_idr(1_000_000));
    }

    #[test]
    fn idle_shutdown_fires_after_three_seconds_of_silence_while_streaming() {
        let mut d = SessionDriver::new(0);
        d.start_stun_gather(0);
        d.stun_done(0);
        d.peer_discovered(0);
        d.video_received(0);

        assert!(!d.is_idle(2_000_000, Some(0)));
        assert!(d.is_idle(3_000_001, Some(0)));
    }

    #[test]
    fn idle_check_is_a_no_op_outside_streaming() {
        let d = SessionDriver::new(0);
        assert!(!d.is_idle(10_000_000, None));
    }

    #[test]
    fn idr_reason_for_prefers_decode_error_and_respects_limiter() {
        let mut d = SessionDriver::new(0);
        assert_eq!(idr_reason_for(&mut d, 0, false, true), Some(IdrReason::DecodeError));
        assert_eq!(idr_reason_for(&mut d, 100, true, false), None);
        assert_eq!(idr_reason_for(&mut d, 1_000_000, true, false), Some(IdrReason::Loss));
    }
}
