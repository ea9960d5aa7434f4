use std::collections::{HashMap, HashSet};

use trunksim_core::{CallId, GroupId, Location, SiteId, TalkgroupId, UnitId, ZoneId};

use crate::messages::{AffiliationStatus, RegistrationStatus};

/// Caps how many `GroupAffiliationRequest`s a unit will send for the same
/// talkgroup without an intervening `ACCEPTED` or power-on (spec.md §4.3,
/// invariant 7 of §8).
pub const MAX_AFFILIATION_ATTEMPTS: u8 = 3;

/// Default duration a `(zone_id, site_id)` stays in a unit's `banned_sites`
/// after a registration failure, in milliseconds (spec.md §5, "default 30
/// virtual seconds").
pub const DEFAULT_BAN_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    PoweredOff,
    SearchingForSite,
    Registering,
    IdleRegistered,
    Affiliating,
    IdleAffiliated,
    CallRequested,
    InCall,
    Failed,
}

/// Action a handler must take as a consequence of a unit-state transition.
/// Kept separate from the transition functions so they stay pure: they
/// mutate `Unit` and return what follow-up event to raise, and the caller
/// (the zone controller) does the actual scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitEffect {
    None,
    EmitScanForSites,
    EmitGroupAffiliationRequest { talkgroup_id: TalkgroupId },
}

/// A subscriber radio. Lifecycle: created at config load, mutated only by
/// the zone controller that owns its home zone, destroyed at process end
/// (spec.md §3).
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub tdma_capable: bool,
    pub state: UnitState,
    pub location: Option<Location>,
    pub current_site: Option<(ZoneId, SiteId)>,
    pub selected_talkgroup: Option<TalkgroupId>,
    pub affiliated_talkgroup: Option<TalkgroupId>,
    pub group_memberships: Vec<GroupId>,
    pub banned_sites: HashSet<(ZoneId, SiteId)>,
    pub banned_talkgroups: HashSet<TalkgroupId>,
    pub affiliation_attempts: HashMap<TalkgroupId, u8>,
    pub current_call: Option<CallId>,
}

impl Unit {
    pub fn new(id: UnitId, tdma_capable: bool) -> Self {
        Unit {
            id,
            tdma_capable,
            state: UnitState::PoweredOff,
            location: None,
            current_site: None,
            selected_talkgroup: None,
            affiliated_talkgroup: None,
            group_memberships: Vec::new(),
            banned_sites: HashSet::new(),
            banned_talkgroups: HashSet::new(),
            affiliation_attempts: HashMap::new(),
            current_call: None,
        }
    }

    /// power-on: POWERED_OFF -> SEARCHING_FOR_SITE, clearing everything
    /// transient (spec.md §4.3).
    pub fn power_on(&mut self) {
        self.state = UnitState::SearchingForSite;
        self.banned_sites.clear();
        self.banned_talkgroups.clear();
        self.affiliation_attempts.clear();
        self.current_site = None;
        self.affiliated_talkgroup = None;
        self.current_call = None;
    }

    /// REG_ACCEPT / REG_DENY / REG_REFUSED / REG_FAIL / FAILED_SYSTEM_FULL.
    pub fn apply_registration_response(
        &mut self,
        zone_id: ZoneId,
        site_id: SiteId,
        status: RegistrationStatus,
    ) -> UnitEffect {
        match status {
            RegistrationStatus::RegAccept => {
                self.state = UnitState::IdleRegistered;
                self.current_site = Some((zone_id, site_id));
                if let Some(tg) = self.selected_talkgroup {
                    self.state = UnitState::Affiliating;
                    UnitEffect::EmitGroupAffiliationRequest { talkgroup_id: tg }
                } else {
                    UnitEffect::None
                }
            }
            RegistrationStatus::RegDeny | RegistrationStatus::RegFail | RegistrationStatus::FailedSystemFull => {
                self.state = UnitState::SearchingForSite;
                self.banned_sites.insert((zone_id, site_id));
                UnitEffect::None
            }
            RegistrationStatus::RegRefused => {
                self.state = UnitState::Failed;
                UnitEffect::None
            }
        }
    }

    /// ACCEPTED / DENIED / FAILED / REFUSED.
    pub fn apply_affiliation_response(
        &mut self,
        talkgroup_id: TalkgroupId,
        status: AffiliationStatus,
    ) -> UnitEffect {
        match status {
            AffiliationStatus::Accepted => {
                self.state = UnitState::IdleAffiliated;
                self.affiliated_talkgroup = Some(talkgroup_id);
                self.affiliation_attempts.remove(&talkgroup_id);
                UnitEffect::None
            }
            AffiliationStatus::Denied => {
                self.state = UnitState::SearchingForSite;
                if let Some((zone_id, site_id)) = self.current_site {
                    self.banned_sites.insert((zone_id, site_id));
                }
                UnitEffect::EmitScanForSites
            }
            AffiliationStatus::Failed => {
                self.state = UnitState::IdleRegistered;
                let attempts = self.affiliation_attempts.entry(talkgroup_id).or_insert(0);
                *attempts += 1;
                // At the cap we simply stop retrying; no further automatic
                // affiliation attempt is raised until the next user action.
                UnitEffect::None
            }
            AffiliationStatus::Refused => {
                self.state = UnitState::IdleRegistered;
                self.banned_talkgroups.insert(talkgroup_id);
                UnitEffect::None
            }
        }
    }

    pub fn affiliation_attempts_for(&self, talkgroup_id: TalkgroupId) -> u8 {
        self.affiliation_attempts.get(&talkgroup_id).copied().unwrap_or(0)
    }

    pub fn can_retry_affiliation(&self, talkgroup_id: TalkgroupId) -> bool {
        self.affiliation_attempts_for(talkgroup_id) < MAX_AFFILIATION_ATTEMPTS
    }

    /// Voice channel grant: accepted only from `CALL_REQUESTED` or
    /// `IDLE_AFFILIATED`; otherwise the unit is busy and the grant is
    /// dropped (spec.md §4.3).
    pub fn apply_voice_channel_grant(&mut self, call_id: CallId) -> bool {
        match self.state {
            UnitState::CallRequested | UnitState::IdleAffiliated => {
                self.state = UnitState::InCall;
                self.current_call = Some(call_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_banned_from(&self, zone_id: ZoneId, site_id: SiteId) -> bool {
        self.banned_sites.contains(&(zone_id, site_id))
    }
}
