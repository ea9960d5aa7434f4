use std::collections::HashMap;

use trunksim_config::{AssignmentMode, Channel, Console as ConsoleConfig, Site, Subsite, Talkgroup, TalkgroupMode, Unit as UnitConfig, Zone};
use trunksim_core::{ChannelId, ConsoleId, EventPriority, Location, SiteId, SubsiteId, TalkgroupId, UnitId, ZoneId};
use trunksim_entities::{CallInitiator, CallMode, CallStatus, Event, TdmaSlot, Unit, UnitState, ZoneController};

fn channel(id: u32, fdma: bool, tdma: bool, control: bool) -> Channel {
    Channel { id: ChannelId(id), freq_tx: 0.0, freq_rx: 0.0, enabled: true, fdma, tdma, control, data: false, bsi: false }
}

fn subsite(lat: f64, lon: f64, radius_km: f64) -> Subsite {
    Subsite { id: SubsiteId(1), location: Location::new(lat, lon), operating_radius_km: radius_km }
}

fn site(id: u32, mode: AssignmentMode, channels: Vec<Channel>, sub: Subsite) -> Site {
    Site {
        id: SiteId(id),
        alias: format!("s{id}"),
        assignment_mode: mode,
        channels: channels.into_iter().map(|c| (c.id, c)).collect(),
        subsites: vec![sub],
    }
}

fn talkgroup(id: u32, mode: TalkgroupMode, priority: EventPriority, hangtime_ms: u64, ptt_id: bool) -> Talkgroup {
    Talkgroup { id: TalkgroupId(id), alias: format!("tg{id}"), hangtime_ms, ptt_id, mode, priority, all_start: false, valid_sites: None }
}

fn zone(sites: Vec<Site>, talkgroups: Vec<Talkgroup>, units: Vec<UnitConfig>, consoles: Vec<ConsoleConfig>) -> Zone {
    Zone {
        id: ZoneId(1),
        alias: "z1".into(),
        area: None,
        sites: sites.into_iter().map(|s| (s.id, s)).collect(),
        talkgroups: talkgroups.into_iter().map(|t| (t.id, t)).collect(),
        units: units.into_iter().map(|u| (u.id, u)).collect(),
        consoles: consoles.into_iter().map(|c| (c.id, c)).collect(),
        groups: HashMap::new(),
    }
}

fn run_ticks(controller: &mut ZoneController, n: u32, delta_ms: i64) {
    for _ in 0..n {
        let snapshots = controller.site_snapshots();
        controller.tick(delta_ms, &snapshots);
    }
}

/// Ticks until `pred` holds or `max_ticks` is exhausted, returning the final
/// verdict. Scheduled delays are fixed offsets from each tick's start time,
/// so exact tick counts for a multi-hop signaling chain are easy to get
/// wrong; polling a predicate keeps these tests honest about what they
/// actually wait for.
fn run_until(controller: &mut ZoneController, max_ticks: u32, delta_ms: i64, pred: impl Fn(&ZoneController) -> bool) -> bool {
    for _ in 0..max_ticks {
        if pred(controller) {
            return true;
        }
        let snapshots = controller.site_snapshots();
        controller.tick(delta_ms, &snapshots);
    }
    pred(controller)
}

fn place_affiliated_unit(controller: &mut ZoneController, unit_id: UnitId, tdma_capable: bool, site_id: SiteId, talkgroup_id: TalkgroupId) {
    let mut unit = Unit::new(unit_id, tdma_capable);
    unit.state = UnitState::IdleAffiliated;
    unit.current_site = Some((controller.zone_id, site_id));
    unit.affiliated_talkgroup = Some(talkgroup_id);
    controller.units.insert(unit_id, unit);
    controller.sites.get_mut(&site_id).unwrap().register(unit_id);
}

#[test]
fn scenario_a_happy_path_registration_and_affiliation() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, true, false)], subsite(0.0, 0.0, 1.0))],
        vec![talkgroup(100, TalkgroupMode::Mixed, EventPriority::Normal, 1500, true)],
        vec![UnitConfig { id: UnitId(1001), alias: "u1".into(), tdma_capable: true }],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    controller.units.get_mut(&UnitId(1001)).unwrap().location = Some(Location::new(0.0, 0.0));
    controller.publish(EventPriority::Default, Event::UnitPowerOnCommand { unit_id: UnitId(1001) });

    let reached = run_until(&mut controller, 10, 1000, |c| c.units[&UnitId(1001)].state == UnitState::IdleAffiliated);
    assert!(reached, "unit never reached IDLE_AFFILIATED, ended in {:?}", controller.units[&UnitId(1001)].state);
    assert!(controller.sites[&SiteId(1)].registrations.contains(&UnitId(1001)));
}

#[test]
fn scenario_b_registration_failure_and_ban() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, false, false)], subsite(0.0, 0.0, 1.0))],
        vec![talkgroup(100, TalkgroupMode::Fdma, EventPriority::Normal, 0, false)],
        vec![],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    controller.sites.get_mut(&SiteId(1)).unwrap().registrations = (1..=1000).map(UnitId).collect();
    controller.units.insert(UnitId(1001), Unit::new(UnitId(1001), true));
    controller.publish(EventPriority::Default, Event::UnitRegistrationRequest { unit_id: UnitId(1001), site_id: SiteId(1) });

    let denied = run_until(&mut controller, 5, 1000, |c| c.units[&UnitId(1001)].is_banned_from(ZoneId(1), SiteId(1)));
    assert!(denied);
    assert_eq!(controller.units[&UnitId(1001)].state, UnitState::SearchingForSite);

    let unbanned = run_until(&mut controller, 35, 1000, |c| !c.units[&UnitId(1001)].is_banned_from(ZoneId(1), SiteId(1)));
    assert!(unbanned, "ban was never lifted within the expected window");
}

#[test]
fn scenario_c_mixed_mode_downgrade() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, true, false)], subsite(0.0, 0.0, 1.0))],
        vec![talkgroup(100, TalkgroupMode::Mixed, EventPriority::Normal, 1500, true)],
        vec![],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    place_affiliated_unit(&mut controller, UnitId(1), true, SiteId(1), TalkgroupId(100));
    place_affiliated_unit(&mut controller, UnitId(2), false, SiteId(1), TalkgroupId(100));

    controller.publish(EventPriority::Default, Event::UnitInitiateCallCommand { unit_id: UnitId(1), talkgroup_id: TalkgroupId(100) });
    let active = run_until(&mut controller, 5, 1000, |c| c.active_calls.values().any(|call| call.talkgroup_id == TalkgroupId(100) && call.status == CallStatus::Active));
    assert!(active);

    let call = controller.active_calls.values().find(|c| c.talkgroup_id == TalkgroupId(100)).unwrap();
    assert_eq!(call.mode, CallMode::Fdma);
    assert!(call.assigned_channels_by_site.values().all(|vc| vc.tdma_slot == TdmaSlot::None));

    let both_in_call =
        run_until(&mut controller, 5, 1000, |c| c.units[&UnitId(1)].state == UnitState::InCall && c.units[&UnitId(2)].state == UnitState::InCall);
    assert!(both_in_call, "grants were not broadcast to both affiliated units");
}

#[test]
fn scenario_d_queued_call_on_contention() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, false, false)], subsite(0.0, 0.0, 1.0))],
        vec![
            talkgroup(100, TalkgroupMode::Fdma, EventPriority::Normal, 0, false),
            talkgroup(200, TalkgroupMode::Fdma, EventPriority::High, 0, false),
        ],
        vec![],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    place_affiliated_unit(&mut controller, UnitId(1), true, SiteId(1), TalkgroupId(100));
    place_affiliated_unit(&mut controller, UnitId(2), true, SiteId(1), TalkgroupId(200));

    controller.publish(EventPriority::Default, Event::UnitInitiateCallCommand { unit_id: UnitId(1), talkgroup_id: TalkgroupId(100) });
    let c1_active = run_until(&mut controller, 5, 1000, |c| c.active_calls.values().any(|call| call.talkgroup_id == TalkgroupId(100) && call.status == CallStatus::Active));
    assert!(c1_active);
    let c1_id = controller.active_calls.values().find(|c| c.talkgroup_id == TalkgroupId(100)).unwrap().id;
    assert_eq!(controller.sites[&SiteId(1)].assigned_voice_channels.len(), 1);

    controller.publish(EventPriority::Default, Event::UnitInitiateCallCommand { unit_id: UnitId(2), talkgroup_id: TalkgroupId(200) });
    let c2_queued = run_until(&mut controller, 5, 1000, |c| c.active_calls.values().any(|call| call.talkgroup_id == TalkgroupId(200) && call.status == CallStatus::Queued));
    assert!(c2_queued, "the contending call should have been queued, not granted");
    assert_eq!(controller.call_busy_queue.len(), 1);
    assert!(controller.sent_messages.iter().any(|e| matches!(e, Event::QueuedResponse { unit_id, talkgroup_id } if *unit_id == UnitId(2) && *talkgroup_id == TalkgroupId(200))));

    controller.publish(EventPriority::Default, Event::UnitEndTransmissionCommand { unit_id: UnitId(1), call_id: c1_id });
    let c2_active = run_until(&mut controller, 5, 1000, |c| c.active_calls.values().any(|call| call.talkgroup_id == TalkgroupId(200) && call.status == CallStatus::Active));
    assert!(c2_active, "queued call should be granted once the blocking call tears down");
    assert!(controller.active_calls.values().all(|call| call.talkgroup_id != TalkgroupId(100)), "the torn-down call must not linger in active_calls");
    assert_eq!(controller.call_busy_queue.len(), 0);
    assert_eq!(controller.sites[&SiteId(1)].assigned_voice_channels.len(), 1);
}

#[test]
fn scenario_e_hangtime_cancel_on_rekey() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, false, false)], subsite(0.0, 0.0, 1.0))],
        vec![talkgroup(100, TalkgroupMode::Fdma, EventPriority::Normal, 2000, true)],
        vec![],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    place_affiliated_unit(&mut controller, UnitId(1), true, SiteId(1), TalkgroupId(100));
    place_affiliated_unit(&mut controller, UnitId(2), true, SiteId(1), TalkgroupId(100));

    controller.publish(EventPriority::Default, Event::UnitInitiateCallCommand { unit_id: UnitId(1), talkgroup_id: TalkgroupId(100) });
    let active = run_until(&mut controller, 5, 100, |c| c.active_calls.values().any(|call| call.status == CallStatus::Active));
    assert!(active);
    let call_id = controller.active_calls.values().find(|c| c.talkgroup_id == TalkgroupId(100)).unwrap().id;

    controller.publish(EventPriority::Default, Event::UnitEndTransmissionCommand { unit_id: UnitId(1), call_id });
    // Re-key before the 2s hangtime teardown fires.
    controller.publish(EventPriority::Default, Event::UnitInitiateCallCommand { unit_id: UnitId(2), talkgroup_id: TalkgroupId(100) });
    let rekeyed = run_until(&mut controller, 5, 100, |c| {
        c.active_calls.get(&call_id).map(|call| call.initiating_unit == CallInitiator::Unit(UnitId(2))).unwrap_or(false)
    });
    assert!(rekeyed, "the second unit's key-up should take over the existing call");

    // Run well past the original teardown's scheduled time; it must be cancelled.
    run_ticks(&mut controller, 30, 100);
    let call = controller.active_calls.get(&call_id).expect("re-keyed call must survive the stale teardown");
    assert_eq!(call.status, CallStatus::Active);
    assert!(!call.transmission_restarted, "the flag must be consumed by the cancelled teardown");

    controller.publish(EventPriority::Default, Event::UnitEndTransmissionCommand { unit_id: UnitId(2), call_id });
    let torn_down = run_until(&mut controller, 40, 100, |c| !c.active_calls.contains_key(&call_id));
    assert!(torn_down, "the successor's own end-transmission must eventually tear the call down");
}

#[test]
fn scenario_f_console_preemption() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, false, false)], subsite(0.0, 0.0, 1.0))],
        vec![talkgroup(100, TalkgroupMode::Fdma, EventPriority::Normal, 1500, true)],
        vec![],
        vec![ConsoleConfig { id: ConsoleId(1), alias: "console1".into(), affiliated_talkgroup_ids: vec![TalkgroupId(100)] }],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    place_affiliated_unit(&mut controller, UnitId(1), true, SiteId(1), TalkgroupId(100));

    controller.publish(EventPriority::Default, Event::UnitInitiateCallCommand { unit_id: UnitId(1), talkgroup_id: TalkgroupId(100) });
    let active = run_until(&mut controller, 5, 100, |c| c.active_calls.values().any(|call| call.status == CallStatus::Active));
    assert!(active);
    let call_id = controller.active_calls.values().find(|c| c.talkgroup_id == TalkgroupId(100)).unwrap().id;
    let channels_before = controller.active_calls[&call_id].assigned_channels_by_site.clone();
    let messages_before = controller.sent_messages.len();

    controller.publish(EventPriority::Preempt, Event::ConsoleInitiateCallCommand { console_id: ConsoleId(1), talkgroup_id: TalkgroupId(100) });
    let preempted = run_until(&mut controller, 5, 100, |c| {
        c.active_calls.get(&call_id).map(|call| call.initiating_unit == CallInitiator::Console(ConsoleId(1))).unwrap_or(false)
    });
    assert!(preempted);

    assert_eq!(controller.active_calls.len(), 1, "preemption must not allocate a second call");
    assert_eq!(controller.active_calls[&call_id].assigned_channels_by_site, channels_before, "preemption must not touch channel assignment");
    assert!(
        controller.sent_messages[messages_before..].iter().all(|e| !matches!(e, Event::QueuedResponse { .. })),
        "console preemption must not produce a QueuedResponse"
    );
}

#[test]
fn site_lifecycle_and_unit_status_introspection() {
    let z = zone(
        vec![site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true), channel(2, true, true, false)], subsite(0.0, 0.0, 1.0))],
        vec![talkgroup(100, TalkgroupMode::Mixed, EventPriority::Normal, 1500, true)],
        vec![UnitConfig { id: UnitId(1001), alias: "u1".into(), tdma_capable: true }],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    controller.units.get_mut(&UnitId(1001)).unwrap().location = Some(Location::new(0.0, 0.0));
    controller.publish(EventPriority::Default, Event::UnitPowerOnCommand { unit_id: UnitId(1001) });
    run_until(&mut controller, 10, 1000, |c| c.units[&UnitId(1001)].state == UnitState::IdleAffiliated);

    let status = controller.unit_status(UnitId(1001)).expect("unit must be known");
    assert_eq!(status.state, UnitState::IdleAffiliated);
    assert_eq!(status.current_site, Some((ZoneId(1), SiteId(1))));
    assert_eq!(status.affiliated_talkgroup, Some(TalkgroupId(100)));
    assert!(controller.unit_status(UnitId(9999)).is_none());

    controller.stop_site(SiteId(1));
    assert_eq!(controller.sites[&SiteId(1)].status, trunksim_entities::SiteStatus::Offline);
    assert!(controller.sites[&SiteId(1)].registrations.is_empty());
}

#[test]
fn unit_site_table_reports_every_scanned_site_strongest_first() {
    let z = zone(
        vec![
            site(1, AssignmentMode::Rotating, vec![channel(1, false, false, true)], subsite(0.0, 0.0, 5.0)),
            site(2, AssignmentMode::Rotating, vec![channel(2, false, false, true)], subsite(2.0, 2.0, 5.0)),
        ],
        vec![],
        vec![UnitConfig { id: UnitId(1), alias: "u1".into(), tdma_capable: true }],
        vec![],
    );
    let mut controller = ZoneController::new(z, None, 1);
    controller.initialize_system();
    assert!(controller.unit_site_table(UnitId(1)).is_empty(), "no scan has run yet");

    controller.units.get_mut(&UnitId(1)).unwrap().location = Some(Location::new(0.0, 0.0));
    controller.publish(EventPriority::Default, Event::UnitScanForSitesCommand { unit_id: UnitId(1) });
    run_ticks(&mut controller, 1, 100);

    let table = controller.unit_site_table(UnitId(1));
    assert_eq!(table.len(), 2, "both sites should appear even though only one is closest");
    assert_eq!(table[0].site_id, SiteId(1), "the nearer site must sort first");
    assert!(table[0].level >= table[1].level);
    assert!(controller.unit_site_table(UnitId(9999)).is_empty(), "unknown unit yields an empty table");
}
