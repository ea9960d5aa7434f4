use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use trunksim_config::{Console as ConsoleConfig, Group, Talkgroup, TalkgroupMode, Unit as UnitConfig, Zone};
use trunksim_core::{
    CallId, ConsoleId, Counter, EventPriority, GroupId, OperationalArea, SiteId, TalkgroupId, UnitId, VirtualTime, ZoneId,
};

use crate::call::{resolve_mode, CallMode, CallStatus, RadioCall};
use crate::call_queue::CallQueue;
use crate::clock::Clock;
use crate::console::Console;
use crate::event_bus::EventBus;
use crate::messages::{AffiliationStatus, CallInitiator, Event, EventKind, RegistrationStatus};
use crate::rf_scan::{self, SiteSnapshot};
use crate::site::{RequiredMode, SiteRuntime, SiteStatus};
use crate::unit::{Unit, UnitEffect, UnitState, DEFAULT_BAN_MS};

/// Maximum registrations a single site's control channel will accept before
/// responding `FAILED_SYSTEM_FULL` (spec.md §4.6).
const MAX_REGISTRATIONS_PER_SITE: usize = 1000;

const REGISTRATION_RESPONSE_DELAY_MS: i64 = 100; // 0.1 virtual seconds
const AFFILIATION_RESPONSE_DELAY_MS: i64 = 100; // 0.1 virtual seconds
const VOICE_GRANT_DELAY_MS: i64 = 50; // 0.05 virtual seconds

/// The per-zone actor: owns the event queue, the active_calls map, the
/// call_busy_queue, and the arenas of runtime entities for this zone
/// (spec.md §4.6).
pub struct ZoneController {
    pub zone_id: ZoneId,
    pub wacn_area: Option<OperationalArea>,
    pub zone_area: Option<OperationalArea>,
    pub sites: HashMap<SiteId, SiteRuntime>,
    pub talkgroups: HashMap<TalkgroupId, Talkgroup>,
    pub units: HashMap<UnitId, Unit>,
    pub consoles: HashMap<ConsoleId, Console>,
    pub groups: HashMap<GroupId, Group>,
    pub active_calls: HashMap<CallId, RadioCall>,
    pub call_busy_queue: CallQueue,

    clock: Clock,
    event_bus: EventBus,
    call_ids: Counter,
    rng: StdRng,

    /// Every event as it's dispatched, for host/test observation
    /// (spec.md §7: "the host observes outcomes via the scheduled events").
    pub sent_messages: Vec<Event>,

    /// Most recent full site table seen by each unit's scan, strongest
    /// first (SPEC_FULL.md §4.9, mirroring `tool_subscriber_update_site_table`).
    last_scan_results: HashMap<UnitId, Vec<rf_scan::ScanResult>>,
}

impl ZoneController {
    pub fn new(zone: Zone, wacn_area: Option<OperationalArea>, rng_seed: u64) -> Self {
        let sites = zone
            .sites
            .into_iter()
            .map(|(id, cfg)| (id, SiteRuntime::new(cfg)))
            .collect();
        let units = zone
            .units
            .into_iter()
            .map(|(id, cfg): (UnitId, UnitConfig)| (id, Unit::new(id, cfg.tdma_capable)))
            .collect();
        let consoles = zone
            .consoles
            .into_iter()
            .map(|(id, cfg): (ConsoleId, ConsoleConfig)| (id, Console::new(id, cfg.affiliated_talkgroup_ids)))
            .collect();

        let mut controller = ZoneController {
            zone_id: zone.id,
            wacn_area,
            zone_area: zone.area,
            sites,
            talkgroups: zone.talkgroups,
            units,
            consoles,
            groups: zone.groups,
            active_calls: HashMap::new(),
            call_busy_queue: CallQueue::new(),
            clock: Clock::new(),
            event_bus: EventBus::new(),
            call_ids: Counter::new(),
            rng: StdRng::seed_from_u64(rng_seed),
            sent_messages: Vec::new(),
            last_scan_results: HashMap::new(),
        };
        controller.register_handlers();
        controller
    }

    fn register_handlers(&mut self) {
        self.event_bus.subscribe(EventKind::UnitPowerOnCommand, Self::handle_unit_power_on);
        self.event_bus
            .subscribe(EventKind::UnitUpdateLocationCommand, Self::handle_unit_update_location);
        self.event_bus
            .subscribe(EventKind::UnitInitiateCallCommand, Self::handle_unit_initiate_call);
        self.event_bus
            .subscribe(EventKind::UnitEndTransmissionCommand, Self::handle_unit_end_transmission);
        self.event_bus
            .subscribe(EventKind::ConsoleInitiateCallCommand, Self::handle_console_initiate_call);
        self.event_bus
            .subscribe(EventKind::UnitUnbanFromSiteCommand, Self::handle_unban_from_site);
        self.event_bus
            .subscribe(EventKind::UnitRegistrationRequest, Self::handle_unit_registration_request);
        self.event_bus
            .subscribe(EventKind::UnitRegistrationResponse, Self::handle_unit_registration_response);
        self.event_bus
            .subscribe(EventKind::GroupAffiliationRequest, Self::handle_group_affiliation_request);
        self.event_bus
            .subscribe(EventKind::GroupAffiliationResponse, Self::handle_group_affiliation_response);
        self.event_bus
            .subscribe(EventKind::GroupVoiceServiceRequest, Self::handle_group_voice_service_request);
        self.event_bus
            .subscribe(EventKind::GroupVoiceChannelGrant, Self::handle_group_voice_channel_grant);
        self.event_bus
            .subscribe(EventKind::CallTeardownCommand, Self::handle_call_teardown);
        self.event_bus
            .subscribe(EventKind::ControlChannelEstablishRequest, Self::handle_control_channel_established);
        self.event_bus
            .subscribe(EventKind::QueuedResponse, Self::handle_queued_response);
        self.event_bus
            .subscribe(EventKind::ServiceBlockedQueueSweep, Self::handle_service_blocked_queue_sweep);
    }

    pub fn now(&self) -> VirtualTime {
        self.clock.now()
    }

    pub fn schedule(&mut self, delay_ms: i64, priority: EventPriority, event: Event) {
        if self.clock.schedule(delay_ms, priority, event).is_err() {
            tracing::warn!("rejected schedule with negative delay");
        }
    }

    pub fn publish(&mut self, priority: EventPriority, event: Event) {
        self.clock.publish(priority, event);
    }

    /// `initialize_system` (spec.md §4.6): bring every site online (or
    /// failed), then register every console on every site that came up.
    pub fn initialize_system(&mut self) {
        let mut site_ids: Vec<SiteId> = self.sites.keys().copied().collect();
        site_ids.sort();
        for site_id in site_ids {
            let site = self.sites.get_mut(&site_id).unwrap();
            if site.initialize() {
                let channel_id = site.control_channel.unwrap();
                self.publish(
                    EventPriority::System,
                    Event::ControlChannelEstablishRequest {
                        site_id,
                        zone_id: self.zone_id,
                        channel_id,
                    },
                );
            }
        }

        let online_sites: Vec<SiteId> = self
            .sites
            .values()
            .filter(|s| s.status == SiteStatus::Online)
            .map(|s| s.id())
            .collect();
        for console in self.consoles.values_mut() {
            for &site_id in &online_sites {
                console.register_at(site_id);
            }
        }
    }

    /// Advances virtual time by `delta_ms`, dispatching every event due by
    /// the new `now`, then runs the once-per-tick blocked-queue sweep
    /// (spec.md §4.1, §4.7).
    pub fn tick(&mut self, delta_ms: i64, world_sites: &[SiteSnapshot]) {
        self.clock.advance(delta_ms);
        self.clock.publish(EventPriority::Low, Event::ServiceBlockedQueueSweep);
        while let Some(event) = self.clock.pop_due() {
            self.dispatch(event, world_sites);
        }
    }

    pub fn site_snapshots(&self) -> Vec<SiteSnapshot> {
        self.sites.values().map(|s| s.snapshot(self.zone_id)).collect()
    }

    fn dispatch(&mut self, event: Event, world_sites: &[SiteSnapshot]) {
        self.sent_messages.push(event.clone());
        if let Event::UnitScanForSitesCommand { unit_id } = event {
            self.handle_unit_scan(unit_id, world_sites);
            return;
        }
        let handlers = self.event_bus.handlers_for(event.kind());
        for handler in handlers {
            handler(self, &event);
        }
    }

    // ---- Unit lifecycle commands --------------------------------------

    fn handle_unit_power_on(&mut self, event: &Event) {
        let Event::UnitPowerOnCommand { unit_id } = event else { return };
        let unit_id = *unit_id;

        if self.units.get(&unit_id).map(|u| u.location).flatten().is_none() {
            let area = self.group_area_for(unit_id).or(self.zone_area).or(self.wacn_area);
            if let Some(area) = area {
                let loc = area.random_point(&mut self.rng);
                if let Some(unit) = self.units.get_mut(&unit_id) {
                    unit.location = Some(loc);
                }
            }
        }

        if let Some(unit) = self.units.get(&unit_id) {
            if unit.selected_talkgroup.is_none() {
                let mut tg_ids: Vec<TalkgroupId> = self.talkgroups.keys().copied().collect();
                tg_ids.sort();
                if let Some(&first) = tg_ids.first() {
                    self.units.get_mut(&unit_id).unwrap().selected_talkgroup = Some(first);
                }
            }
        } else {
            tracing::warn!(%unit_id, "power-on for unknown unit");
            return;
        }

        self.units.get_mut(&unit_id).unwrap().power_on();
        self.publish(EventPriority::Default, Event::UnitScanForSitesCommand { unit_id });
    }

    fn group_area_for(&self, unit_id: UnitId) -> Option<OperationalArea> {
        let mut group_ids: Vec<GroupId> = self.groups.keys().copied().collect();
        group_ids.sort();
        for gid in group_ids {
            let group = &self.groups[&gid];
            if group.members.units.contains(&unit_id) {
                if let Some(area) = group.area {
                    return Some(area);
                }
            }
        }
        None
    }

    fn handle_unit_update_location(&mut self, event: &Event) {
        let Event::UnitUpdateLocationCommand { unit_id, new_location } = event else { return };
        let Some(unit) = self.units.get_mut(unit_id) else {
            tracing::warn!(unit_id = %unit_id, "location update for unknown unit");
            return;
        };
        unit.location = Some(*new_location);
        self.publish(EventPriority::Default, Event::UnitScanForSitesCommand { unit_id: *unit_id });
    }

    fn handle_unit_scan(&mut self, unit_id: UnitId, world_sites: &[SiteSnapshot]) {
        let Some(location) = self.units.get(&unit_id).and_then(|u| u.location) else {
            tracing::warn!(%unit_id, "scan for unit with no location or unknown unit");
            return;
        };
        let Some(unit) = self.units.get(&unit_id) else { return };
        let banned = unit.banned_sites.clone();
        let table = rf_scan::scan_all(location, world_sites, &|z, s| banned.contains(&(z, s)), &mut self.rng);
        let result = table.first().copied().filter(|r| r.report.level > 0);
        self.last_scan_results.insert(unit_id, table);

        match result {
            Some(r) if r.report.level > 0 => {
                let unit = self.units.get_mut(&unit_id).unwrap();
                if unit.state == UnitState::SearchingForSite {
                    if r.zone_id != self.zone_id {
                        tracing::warn!(%unit_id, target_zone = %r.zone_id, "cross-zone registration is not routed by this controller");
                        return;
                    }
                    unit.current_site = Some((r.zone_id, r.site_id));
                    self.schedule(
                        REGISTRATION_RESPONSE_DELAY_MS,
                        EventPriority::Default,
                        Event::UnitRegistrationRequest { unit_id, site_id: r.site_id },
                    );
                }
            }
            _ => {
                if let Some(unit) = self.units.get_mut(&unit_id) {
                    if unit.state == UnitState::SearchingForSite {
                        unit.state = UnitState::Failed;
                    }
                }
            }
        }
    }

    // ---- Registration & affiliation ------------------------------------

    fn handle_unit_registration_request(&mut self, event: &Event) {
        let Event::UnitRegistrationRequest { unit_id, site_id } = event else { return };
        let (unit_id, site_id) = (*unit_id, *site_id);
        let Some(site) = self.sites.get_mut(&site_id) else {
            tracing::warn!(%site_id, "registration request for unknown site");
            return;
        };

        let status = if site.registrations.len() < MAX_REGISTRATIONS_PER_SITE {
            site.register(unit_id);
            RegistrationStatus::RegAccept
        } else {
            RegistrationStatus::FailedSystemFull
        };

        self.schedule(
            REGISTRATION_RESPONSE_DELAY_MS,
            EventPriority::Default,
            Event::UnitRegistrationResponse { unit_id, site_id, zone_id: self.zone_id, status },
        );
    }

    fn handle_unit_registration_response(&mut self, event: &Event) {
        let Event::UnitRegistrationResponse { unit_id, site_id, zone_id, status } = event else { return };
        let (unit_id, site_id, zone_id, status) = (*unit_id, *site_id, *zone_id, *status);

        let is_denial = matches!(
            status,
            RegistrationStatus::RegDeny | RegistrationStatus::RegFail | RegistrationStatus::FailedSystemFull
        );

        let Some(unit) = self.units.get_mut(&unit_id) else {
            tracing::warn!(%unit_id, "registration response for unknown unit");
            return;
        };
        let effect = unit.apply_registration_response(zone_id, site_id, status);

        if is_denial {
            self.schedule(
                DEFAULT_BAN_MS,
                EventPriority::System,
                Event::UnitUnbanFromSiteCommand { unit_id, zone_id, site_id },
            );
        }

        match effect {
            UnitEffect::EmitGroupAffiliationRequest { talkgroup_id } => {
                self.schedule(
                    AFFILIATION_RESPONSE_DELAY_MS,
                    EventPriority::Default,
                    Event::GroupAffiliationRequest { unit_id, talkgroup_id },
                );
            }
            UnitEffect::EmitScanForSites => {
                self.publish(EventPriority::Default, Event::UnitScanForSitesCommand { unit_id });
            }
            UnitEffect::None => {
                if self.units[&unit_id].state == UnitState::SearchingForSite {
                    self.publish(EventPriority::Default, Event::UnitScanForSitesCommand { unit_id });
                }
            }
        }
    }

    fn handle_group_affiliation_request(&mut self, event: &Event) {
        let Event::GroupAffiliationRequest { unit_id, talkgroup_id } = event else { return };
        let (unit_id, talkgroup_id) = (*unit_id, *talkgroup_id);

        let Some(unit) = self.units.get(&unit_id) else {
            tracing::warn!(%unit_id, "affiliation request for unknown unit");
            return;
        };

        let status = match self.talkgroups.get(&talkgroup_id) {
            None => AffiliationStatus::Refused,
            Some(tg) if tg.mode == TalkgroupMode::Tdma && !unit.tdma_capable => AffiliationStatus::Failed,
            Some(tg) => match (&tg.valid_sites, unit.current_site) {
                (Some(valid), Some((_, site_id))) if !valid.contains(&site_id) => AffiliationStatus::Denied,
                (Some(_), None) => AffiliationStatus::Denied,
                _ => AffiliationStatus::Accepted,
            },
        };

        self.schedule(
            AFFILIATION_RESPONSE_DELAY_MS,
            EventPriority::Default,
            Event::GroupAffiliationResponse { unit_id, talkgroup_id, zone_id: self.zone_id, status },
        );
    }

    fn handle_group_affiliation_response(&mut self, event: &Event) {
        let Event::GroupAffiliationResponse { unit_id, talkgroup_id, status, .. } = event else { return };
        let (unit_id, talkgroup_id, status) = (*unit_id, *talkgroup_id, *status);

        let Some(unit) = self.units.get_mut(&unit_id) else {
            tracing::warn!(%unit_id, "affiliation response for unknown unit");
            return;
        };
        let effect = unit.apply_affiliation_response(talkgroup_id, status);
        if effect == UnitEffect::EmitScanForSites {
            self.publish(EventPriority::Default, Event::UnitScanForSitesCommand { unit_id });
        }
    }

    // ---- Call setup, queueing, teardown, preemption --------------------

    fn handle_unit_initiate_call(&mut self, event: &Event) {
        let Event::UnitInitiateCallCommand { unit_id, talkgroup_id } = event else { return };
        let (unit_id, talkgroup_id) = (*unit_id, *talkgroup_id);

        let Some(unit) = self.units.get(&unit_id) else { return };
        if unit.state != UnitState::IdleAffiliated {
            return;
        }
        let Some(talkgroup) = self.talkgroups.get(&talkgroup_id) else { return };

        let mut priority = talkgroup.priority;
        if priority == EventPriority::Normal {
            if let Some(group_priority) = self.group_priority_for(unit_id) {
                if group_priority != EventPriority::Normal {
                    priority = group_priority;
                }
            }
        }

        self.publish(
            priority,
            Event::GroupVoiceServiceRequest { initiator: CallInitiator::Unit(unit_id), talkgroup_id, priority },
        );
    }

    fn group_priority_for(&self, unit_id: UnitId) -> Option<EventPriority> {
        let mut group_ids: Vec<GroupId> = self.groups.keys().copied().collect();
        group_ids.sort();
        for gid in group_ids {
            let group = &self.groups[&gid];
            if group.members.units.contains(&unit_id) {
                return Some(group.priority);
            }
        }
        None
    }

    fn handle_console_initiate_call(&mut self, event: &Event) {
        let Event::ConsoleInitiateCallCommand { console_id, talkgroup_id } = event else { return };
        let (console_id, talkgroup_id) = (*console_id, *talkgroup_id);
        if !self.consoles.contains_key(&console_id) {
            tracing::warn!(%console_id, "initiate-call for unknown console");
            return;
        }
        self.publish(
            EventPriority::Preempt,
            Event::GroupVoiceServiceRequest {
                initiator: CallInitiator::Console(console_id),
                talkgroup_id,
                priority: EventPriority::Preempt,
            },
        );
    }

    fn handle_group_voice_service_request(&mut self, event: &Event) {
        let Event::GroupVoiceServiceRequest { initiator, talkgroup_id, priority } = event else { return };
        let (initiator, talkgroup_id, priority) = (*initiator, *talkgroup_id, *priority);

        // Re-key / console preemption: an Active call already exists for this
        // talkgroup. Logical takeover only; channels and allocation are
        // untouched (spec.md §4.7 "Console preemption"; generalized to any
        // initiator to cover the unit-to-unit re-key of Scenario E).
        if let Some(existing_id) = self.active_call_id_for_talkgroup(talkgroup_id) {
            let call = self.active_calls.get_mut(&existing_id).unwrap();
            call.rekey(initiator);
            if let CallInitiator::Unit(uid) = initiator {
                if let Some(unit) = self.units.get_mut(&uid) {
                    unit.current_call = Some(existing_id);
                    unit.state = UnitState::InCall;
                }
            }
            return;
        }

        let required_sites = self.sites_with_affiliated_unit(talkgroup_id);
        if required_sites.is_empty() {
            return;
        }

        let all_tdma_capable = required_sites.iter().all(|&site_id| {
            self.sites[&site_id]
                .registrations
                .iter()
                .filter_map(|uid| self.units.get(uid))
                .filter(|u| u.affiliated_talkgroup == Some(talkgroup_id))
                .all(|u| u.tdma_capable)
        });

        let talkgroup_mode = self.talkgroups[&talkgroup_id].mode;
        let mode = resolve_mode(talkgroup_mode, all_tdma_capable);
        let required_mode = match mode {
            CallMode::Fdma => RequiredMode::Fdma,
            CallMode::Tdma => RequiredMode::Tdma,
        };

        let call_id = self.call_ids.next_call_id();
        let mut call = RadioCall::new(call_id, initiator, talkgroup_id, mode, priority);
        if let CallInitiator::Unit(uid) = initiator {
            if let Some(unit) = self.units.get_mut(&uid) {
                unit.current_call = Some(call_id);
                unit.state = UnitState::CallRequested;
            }
        }
        self.active_calls.insert(call_id, call.clone());

        let mut allocations: HashMap<SiteId, crate::messages::VoiceChannel> = HashMap::new();
        let mut all_ok = true;
        for &site_id in &required_sites {
            let site = self.sites.get_mut(&site_id).unwrap();
            match site.allocate(call_id, required_mode, &mut self.rng) {
                Some(key) => {
                    allocations.insert(site_id, key);
                }
                None => {
                    all_ok = false;
                    break;
                }
            }
        }

        if !all_ok {
            for (site_id, key) in allocations {
                self.sites.get_mut(&site_id).unwrap().release(key);
            }
            let now = self.now();
            call.mark_queued(now);
            self.active_calls.insert(call_id, call);
            self.call_busy_queue.push(call_id, priority, now);
            if let CallInitiator::Unit(unit_id) = initiator {
                self.publish(EventPriority::Default, Event::QueuedResponse { unit_id, talkgroup_id });
            }
            return;
        }

        call.mark_active();
        call.assigned_channels_by_site = allocations.clone();
        self.active_calls.insert(call_id, call);

        for (&site_id, &vc) in &allocations {
            let site = &self.sites[&site_id];
            let recipients: Vec<UnitId> = site
                .registrations
                .iter()
                .copied()
                .filter(|uid| self.units.get(uid).map(|u| u.affiliated_talkgroup == Some(talkgroup_id)).unwrap_or(false))
                .collect();
            for unit_id in recipients {
                self.schedule(
                    VOICE_GRANT_DELAY_MS,
                    priority,
                    Event::GroupVoiceChannelGrant {
                        unit_id,
                        talkgroup_id,
                        call_id,
                        channel_id: vc.channel_id,
                        tdma_slot: vc.tdma_slot,
                    },
                );
            }
        }
    }

    fn active_call_id_for_talkgroup(&self, talkgroup_id: TalkgroupId) -> Option<CallId> {
        self.active_calls
            .values()
            .find(|c| c.talkgroup_id == talkgroup_id && c.status == CallStatus::Active)
            .map(|c| c.id)
    }

    fn sites_with_affiliated_unit(&self, talkgroup_id: TalkgroupId) -> Vec<SiteId> {
        let mut ids: Vec<SiteId> = self
            .sites
            .values()
            .filter(|s| s.status == SiteStatus::Online)
            .filter(|s| {
                s.registrations
                    .iter()
                    .filter_map(|uid| self.units.get(uid))
                    .any(|u| u.affiliated_talkgroup == Some(talkgroup_id))
            })
            .map(|s| s.id())
            .collect();
        ids.sort();
        ids
    }

    fn handle_group_voice_channel_grant(&mut self, event: &Event) {
        let Event::GroupVoiceChannelGrant { unit_id, call_id, .. } = event else { return };
        let (unit_id, call_id) = (*unit_id, *call_id);
        if let Some(unit) = self.units.get_mut(&unit_id) {
            if !unit.apply_voice_channel_grant(call_id) {
                tracing::warn!(%unit_id, %call_id, "voice channel grant ignored, unit busy");
            }
        }
    }

    fn handle_queued_response(&mut self, _event: &Event) {
        // Observational only; recorded in `sent_messages` for the host/tests.
    }

    fn handle_control_channel_established(&mut self, event: &Event) {
        let Event::ControlChannelEstablishRequest { site_id, channel_id, .. } = event else { return };
        tracing::info!(%site_id, %channel_id, "control channel established");
    }

    fn handle_unit_end_transmission(&mut self, event: &Event) {
        let Event::UnitEndTransmissionCommand { call_id, .. } = event else { return };
        let call_id = *call_id;
        let Some(call) = self.active_calls.get_mut(&call_id) else {
            tracing::warn!(%call_id, "end-transmission for unknown call");
            return;
        };
        if call.status != CallStatus::Active {
            return;
        }
        // A fresh teardown supersedes any rekey recorded before this
        // end-transmission; only a rekey *after* this point should cancel it.
        call.transmission_restarted = false;
        let talkgroup = &self.talkgroups[&call.talkgroup_id];
        let delay_ms = if talkgroup.ptt_id && talkgroup.hangtime_ms > 0 {
            talkgroup.hangtime_ms as i64
        } else {
            0
        };
        self.schedule(delay_ms, EventPriority::Default, Event::CallTeardownCommand { call_id });
    }

    fn handle_call_teardown(&mut self, event: &Event) {
        let Event::CallTeardownCommand { call_id } = event else { return };
        let call_id = *call_id;
        let Some(call) = self.active_calls.get_mut(&call_id) else {
            tracing::warn!(%call_id, "teardown for call not in active_calls");
            return;
        };
        if call.status != CallStatus::Active {
            return;
        }
        if call.transmission_restarted {
            // Stale teardown: a newer transmission has since keyed up under
            // this same call. Consume the flag and cancel (spec.md §9, §8
            // Scenario E).
            call.transmission_restarted = false;
            return;
        }

        call.mark_ended();
        let assignments: Vec<(SiteId, crate::messages::VoiceChannel)> =
            call.assigned_channels_by_site.iter().map(|(s, v)| (*s, *v)).collect();
        for (site_id, vc) in assignments {
            if let Some(site) = self.sites.get_mut(&site_id) {
                site.release(vc);
            }
        }
        self.active_calls.remove(&call_id);
        self.service_blocked_queue_once();
    }

    fn handle_unban_from_site(&mut self, event: &Event) {
        let Event::UnitUnbanFromSiteCommand { unit_id, zone_id, site_id } = event else { return };
        if let Some(unit) = self.units.get_mut(unit_id) {
            unit.banned_sites.remove(&(*zone_id, *site_id));
        }
    }

    fn handle_service_blocked_queue_sweep(&mut self, _event: &Event) {
        self.service_blocked_queue_once();
    }

    /// Re-dispatches the head of `call_busy_queue` as a fresh
    /// `GroupVoiceServiceRequest`. If allocation still fails, the handler
    /// re-queues it at the back among equal-priority entries (spec.md §4.7).
    fn service_blocked_queue_once(&mut self) {
        let Some(call_id) = self.call_busy_queue.pop() else { return };
        let Some(call) = self.active_calls.get(&call_id) else { return };
        if call.status != CallStatus::Queued {
            return;
        }
        let (initiator, talkgroup_id, priority) = (call.initiating_unit, call.talkgroup_id, call.priority);
        // Drop the stale Queued entry: the retry mints a fresh RadioCall id on
        // success, so leaving this one behind would orphan it in active_calls.
        self.active_calls.remove(&call_id);
        self.publish(priority, Event::GroupVoiceServiceRequest { initiator, talkgroup_id, priority });
    }

    // ---- Site lifecycle (SPEC_FULL.md §4.9) ----------------------------

    pub fn stop_site(&mut self, site_id: SiteId) {
        if let Some(site) = self.sites.get_mut(&site_id) {
            site.stop();
        }
    }

    pub fn fail_site(&mut self, site_id: SiteId) {
        if let Some(site) = self.sites.get_mut(&site_id) {
            site.fail();
        }
    }

    // ---- Introspection (SPEC_FULL.md §4.9) -----------------------------

    pub fn unit_status(&self, unit_id: UnitId) -> Option<UnitStatusReport> {
        let unit = self.units.get(&unit_id)?;
        Some(UnitStatusReport {
            state: unit.state,
            current_site: unit.current_site,
            affiliated_talkgroup: unit.affiliated_talkgroup,
            current_call: unit.current_call,
        })
    }

    /// The sites (and subsites) a unit's most recent scan observed, sorted
    /// strongest first. Empty if the unit hasn't scanned yet or is unknown
    /// (SPEC_FULL.md §4.9, mirroring `tool_subscriber_update_site_table`).
    pub fn unit_site_table(&self, unit_id: UnitId) -> Vec<SiteTableEntry> {
        self.last_scan_results
            .get(&unit_id)
            .map(|results| {
                results
                    .iter()
                    .map(|r| SiteTableEntry {
                        zone_id: r.zone_id,
                        site_id: r.site_id,
                        subsite_id: r.subsite_id,
                        rssi_dbm: r.report.rssi_dbm,
                        level: r.report.level,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnitStatusReport {
    pub state: UnitState,
    pub current_site: Option<(ZoneId, SiteId)>,
    pub affiliated_talkgroup: Option<TalkgroupId>,
    pub current_call: Option<CallId>,
}

/// One row of a unit's site table (SPEC_FULL.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteTableEntry {
    pub zone_id: ZoneId,
    pub site_id: SiteId,
    pub subsite_id: trunksim_core::SubsiteId,
    pub rssi_dbm: f64,
    pub level: u8,
}
