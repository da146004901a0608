//! Shaper profile parameters as declared by the caller.

use sonic_tm_device::{ProfileId, ShaperProfile};

use crate::error::{TmError, TmResult};

/// Bits per byte, applied to byte-mode declarations.
pub const BITS_PER_BYTE: u64 = 8;

/// Shaper profile create request.
///
/// When `pkt_mode` is false the rates are declared in bytes per second and
/// the bursts in bytes; they are stored in bits. In packet mode the values
/// are stored unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaperParams {
    /// Caller-assigned profile id.
    pub id: ProfileId,
    /// Committed rate.
    pub commit_rate: u64,
    /// Committed burst size.
    pub commit_burst: u64,
    /// Peak rate, 0 for a single-rate shaper.
    pub peak_rate: u64,
    /// Peak burst size.
    pub peak_burst: u64,
    /// Signed packet length adjustment.
    pub pkt_len_adj: i32,
    /// Packet mode flag.
    pub pkt_mode: bool,
}

impl ShaperParams {
    /// Creates a byte-mode single-rate request.
    pub fn new(id: ProfileId, commit_rate: u64, commit_burst: u64) -> Self {
        Self {
            id,
            commit_rate,
            commit_burst,
            peak_rate: 0,
            peak_burst: 0,
            pkt_len_adj: 0,
            pkt_mode: false,
        }
    }

    /// Sets the peak rate and burst.
    pub fn with_peak(mut self, peak_rate: u64, peak_burst: u64) -> Self {
        self.peak_rate = peak_rate;
        self.peak_burst = peak_burst;
        self
    }

    /// Switches the request to packet mode.
    pub fn in_packets(mut self) -> Self {
        self.pkt_mode = true;
        self
    }

    /// Sets the packet length adjustment.
    pub fn with_pkt_len_adj(mut self, adj: i32) -> Self {
        self.pkt_len_adj = adj;
        self
    }

    /// Converts the request into a profile in canonical units.
    pub fn normalize(&self) -> TmResult<ShaperProfile> {
        if !self.id.is_valid() {
            return Err(TmError::invalid_argument(
                "shaper_id",
                "reserved invalid id cannot name a profile",
            ));
        }

        let scale = |field: &str, value: u64| -> TmResult<u64> {
            if self.pkt_mode {
                return Ok(value);
            }
            value.checked_mul(BITS_PER_BYTE).ok_or_else(|| {
                TmError::invalid_argument(field, format!("{} overflows when scaled to bits", value))
            })
        };

        Ok(ShaperProfile {
            id: self.id,
            commit_rate: scale("commit_rate", self.commit_rate)?,
            commit_burst: scale("commit_burst", self.commit_burst)?,
            peak_rate: scale("peak_rate", self.peak_rate)?,
            peak_burst: scale("peak_burst", self.peak_burst)?,
            pkt_len_adj: self.pkt_len_adj,
            pkt_mode: self.pkt_mode,
        })
    }
}
