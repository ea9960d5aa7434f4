use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use trunksim_core::{
    ChannelId, ConsoleId, EventPriority, GroupId, Location, OperationalArea, SiteId, SubsiteId,
    TalkgroupId, UnitId, WacnId, ZoneId,
};

/// Top of the configuration tree. Immutable after `trunksim_config::load_*`
/// returns it; the zone controller never mutates configuration entities,
/// only its own runtime state.
#[derive(Debug, Clone)]
pub struct Wacn {
    pub id: WacnId,
    pub area: Option<OperationalArea>,
    pub zones: HashMap<ZoneId, Zone>,
}

impl Wacn {
    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }
}

/// RFSS: the administrative domain a `ZoneController` instance drives.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: ZoneId,
    pub alias: String,
    pub area: Option<OperationalArea>,
    pub sites: HashMap<SiteId, Site>,
    pub talkgroups: HashMap<TalkgroupId, Talkgroup>,
    pub units: HashMap<UnitId, Unit>,
    pub consoles: HashMap<ConsoleId, Console>,
    pub groups: HashMap<GroupId, Group>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    Rotating,
    Random,
    Balanced,
}

/// Runtime lifecycle of a `Site`. Config only ever produces `Offline`; the
/// other variants are reached by `ZoneController::initialize_system` and the
/// site lifecycle commands in SPEC_FULL.md §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Offline,
    Initializing,
    Online,
    Failed,
    SiteTrunking,
}

#[derive(Debug, Clone)]
pub struct Site {
    pub id: SiteId,
    pub alias: String,
    pub assignment_mode: AssignmentMode,
    pub channels: HashMap<ChannelId, Channel>,
    pub subsites: Vec<Subsite>,
}

#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub id: ChannelId,
    pub freq_tx: f64,
    pub freq_rx: f64,
    pub enabled: bool,
    pub fdma: bool,
    pub tdma: bool,
    pub control: bool,
    pub data: bool,
    pub bsi: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Subsite {
    pub id: SubsiteId,
    pub location: Location,
    pub operating_radius_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TalkgroupMode {
    Fdma,
    Tdma,
    Mixed,
}

#[derive(Debug, Clone)]
pub struct Talkgroup {
    pub id: TalkgroupId,
    pub alias: String,
    pub hangtime_ms: u64,
    pub ptt_id: bool,
    pub mode: TalkgroupMode,
    pub priority: EventPriority,
    pub all_start: bool,
    pub valid_sites: Option<Vec<SiteId>>,
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub alias: String,
    pub tdma_capable: bool,
}

#[derive(Debug, Clone)]
pub struct Console {
    pub id: ConsoleId,
    pub alias: String,
    pub affiliated_talkgroup_ids: Vec<TalkgroupId>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupMembers {
    pub units: Vec<UnitId>,
    pub talkgroups: Vec<TalkgroupId>,
    pub consoles: Vec<ConsoleId>,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub alias: String,
    pub priority: EventPriority,
    pub members: GroupMembers,
    pub area: Option<OperationalArea>,
}
