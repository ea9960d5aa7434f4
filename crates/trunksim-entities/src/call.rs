use std::collections::HashMap;

use trunksim_core::{CallId, EventPriority, SiteId, TalkgroupId, VirtualTime};

use crate::messages::{CallInitiator, VoiceChannel};
use trunksim_config::TalkgroupMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Idle,
    Requested,
    Active,
    Queued,
    Preempted,
    Ended,
}

/// Voice channel requirement a `GroupVoiceServiceRequest` resolves to.
/// `Mixed` downgrades to `Fdma` if any affiliated unit is not TDMA-capable,
/// otherwise it resolves to `Tdma` (spec.md §4.7 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    Fdma,
    Tdma,
}

pub fn resolve_mode(talkgroup_mode: TalkgroupMode, all_affiliated_units_tdma_capable: bool) -> CallMode {
    match talkgroup_mode {
        TalkgroupMode::Fdma => CallMode::Fdma,
        TalkgroupMode::Tdma => CallMode::Tdma,
        TalkgroupMode::Mixed => {
            if all_affiliated_units_tdma_capable {
                CallMode::Tdma
            } else {
                CallMode::Fdma
            }
        }
    }
}

/// A group voice call in progress or pending, keyed by a monotonic id
/// (spec.md §3). Created at grant-or-queue; released at teardown; never
/// revived once `Ended`.
#[derive(Debug, Clone)]
pub struct RadioCall {
    pub id: CallId,
    pub initiating_unit: CallInitiator,
    pub talkgroup_id: TalkgroupId,
    pub mode: CallMode,
    pub priority: EventPriority,
    pub status: CallStatus,
    pub assigned_channels_by_site: HashMap<SiteId, VoiceChannel>,
    pub enqueued_at: Option<VirtualTime>,
    /// Set when a new transmission starts on this talkgroup while this call
    /// is in its hangtime window, so a previously scheduled teardown can
    /// recognize it must not tear down a re-keyed call (spec.md §9, resolving
    /// the "hangtime re-key" open question; exercised in Scenario E).
    pub transmission_restarted: bool,
}

impl RadioCall {
    pub fn new(id: CallId, initiating_unit: CallInitiator, talkgroup_id: TalkgroupId, mode: CallMode, priority: EventPriority) -> Self {
        RadioCall {
            id,
            initiating_unit,
            talkgroup_id,
            mode,
            priority,
            status: CallStatus::Requested,
            assigned_channels_by_site: HashMap::new(),
            enqueued_at: None,
            transmission_restarted: false,
        }
    }

    pub fn mark_active(&mut self) {
        self.status = CallStatus::Active;
    }

    pub fn mark_queued(&mut self, at: VirtualTime) {
        self.status = CallStatus::Queued;
        self.enqueued_at = Some(at);
    }

    pub fn mark_ended(&mut self) {
        self.status = CallStatus::Ended;
    }

    pub fn rekey(&mut self, new_initiator: CallInitiator) {
        self.initiating_unit = new_initiator;
        self.transmission_restarted = true;
    }

    pub fn fdma_channel_for(&self, site_id: SiteId) -> Option<VoiceChannel> {
        self.assigned_channels_by_site.get(&site_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_mode_downgrades_when_any_unit_not_tdma_capable() {
        assert_eq!(resolve_mode(TalkgroupMode::Mixed, true), CallMode::Tdma);
        assert_eq!(resolve_mode(TalkgroupMode::Mixed, false), CallMode::Fdma);
    }

    #[test]
    fn rekey_sets_restarted_flag() {
        use trunksim_core::UnitId;
        let mut call = RadioCall::new(CallId(1), CallInitiator::Unit(UnitId(1)), TalkgroupId(100), CallMode::Fdma, EventPriority::Normal);
        call.mark_active();
        call.rekey(CallInitiator::Unit(UnitId(2)));
        assert!(call.transmission_restarted);
        assert_eq!(call.initiating_unit, CallInitiator::Unit(UnitId(2)));
    }
}
