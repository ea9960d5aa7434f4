use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use trunksim_core::{
    ChannelId, ConsoleId, EventPriority, GroupId, Location, OperationalArea, SiteId, SubsiteId,
    TalkgroupId, UnitId, WacnId, ZoneId,
};

use crate::model::{
    AssignmentMode, Channel, Console, Group, GroupMembers, Site, Subsite, Talkgroup,
    TalkgroupMode, Unit, Wacn, Zone,
};

/// Config schema version this loader accepts. Bumped when a breaking field
/// change lands; old scenario files fail fast with a clear message instead
/// of silently misloading.
const EXPECTED_CONFIG_VERSION: &str = "1";

/// Parses a `Wacn` from a YAML document, rejecting unknown fields and
/// invalid structure as described in spec.md §7's configuration error
/// taxonomy. All such errors are fatal at load time.
pub fn from_yaml_str(yaml: &str) -> Result<Wacn, Box<dyn std::error::Error>> {
    let root: WacnDto = serde_yaml::from_str(yaml)?;

    if root.config_version != EXPECTED_CONFIG_VERSION {
        return Err(format!(
            "unrecognized config_version: {}, expected {}",
            root.config_version, EXPECTED_CONFIG_VERSION
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }

    let mut zones = HashMap::with_capacity(root.zones.len());
    for (zone_id, zone_dto) in root.zones {
        let zone = convert_zone(ZoneId(zone_id), zone_dto)?;
        zones.insert(zone.id, zone);
    }

    Ok(Wacn {
        id: WacnId(root.id),
        area: root.area.map(convert_area),
        zones,
    })
}

pub fn from_reader<R: Read>(reader: R) -> Result<Wacn, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    BufReader::new(reader).read_to_string(&mut contents)?;
    from_yaml_str(&contents)
}

pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Wacn, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    from_reader(BufReader::new(f))
}

fn convert_zone(id: ZoneId, dto: ZoneDto) -> Result<Zone, Box<dyn std::error::Error>> {
    if !dto.extra.is_empty() {
        return Err(format!("unrecognized fields in zone {}: {:?}", id, sorted_keys(&dto.extra)).into());
    }

    let mut sites = HashMap::with_capacity(dto.sites.len());
    for (site_id, site_dto) in dto.sites {
        let site = convert_site(SiteId(site_id), site_dto)?;
        sites.insert(site.id, site);
    }

    let mut talkgroups = HashMap::with_capacity(dto.talkgroups.len());
    for (tg_id, tg_dto) in dto.talkgroups {
        if !tg_dto.extra.is_empty() {
            return Err(format!("unrecognized fields in talkgroup {tg_id}: {:?}", sorted_keys(&tg_dto.extra)).into());
        }
        talkgroups.insert(
            TalkgroupId(tg_id),
            Talkgroup {
                id: TalkgroupId(tg_id),
                alias: tg_dto.alias,
                hangtime_ms: tg_dto.hangtime_ms,
                ptt_id: tg_dto.ptt_id,
                mode: tg_dto.mode,
                priority: tg_dto.priority,
                all_start: tg_dto.all_start.unwrap_or(false),
                valid_sites: tg_dto.valid_sites.map(|v| v.into_iter().map(SiteId).collect()),
            },
        );
    }

    let mut units = HashMap::with_capacity(dto.units.len());
    for (uid, unit_dto) in dto.units {
        if !unit_dto.extra.is_empty() {
            return Err(format!("unrecognized fields in unit {uid}: {:?}", sorted_keys(&unit_dto.extra)).into());
        }
        units.insert(
            UnitId(uid),
            Unit {
                id: UnitId(uid),
                alias: unit_dto.alias,
                tdma_capable: unit_dto.tdma_capable,
            },
        );
    }

    let mut consoles = HashMap::with_capacity(dto.consoles.len());
    for (cid, console_dto) in dto.consoles {
        if !console_dto.extra.is_empty() {
            return Err(format!("unrecognized fields in console {cid}: {:?}", sorted_keys(&console_dto.extra)).into());
        }
        consoles.insert(
            ConsoleId(cid),
            Console {
                id: ConsoleId(cid),
                alias: console_dto.alias,
                affiliated_talkgroup_ids: console_dto
                    .affiliated_talkgroup_ids
                    .into_iter()
                    .map(TalkgroupId)
                    .collect(),
            },
        );
    }

    let mut groups = HashMap::with_capacity(dto.groups.len());
    for (gid, group_dto) in dto.groups {
        if !group_dto.extra.is_empty() {
            return Err(format!("unrecognized fields in group {gid}: {:?}", sorted_keys(&group_dto.extra)).into());
        }
        groups.insert(
            GroupId(gid),
            Group {
                id: GroupId(gid),
                alias: group_dto.alias,
                priority: group_dto.priority,
                members: GroupMembers {
                    units: group_dto.members.units.into_iter().map(UnitId).collect(),
                    talkgroups: group_dto.members.talkgroups.into_iter().map(TalkgroupId).collect(),
                    consoles: group_dto.members.consoles.into_iter().map(ConsoleId).collect(),
                },
                area: group_dto.area.map(convert_area),
            },
        );
    }

    Ok(Zone {
        id,
        alias: dto.alias,
        area: dto.area.map(convert_area),
        sites,
        talkgroups,
        units,
        consoles,
        groups,
    })
}

fn convert_site(id: SiteId, dto: SiteDto) -> Result<Site, Box<dyn std::error::Error>> {
    if !dto.extra.is_empty() {
        return Err(format!("unrecognized fields in site {}: {:?}", id, sorted_keys(&dto.extra)).into());
    }
    if dto.subsites.is_empty() {
        return Err(format!("site {id} has no subsites; a site without subsites is invalid").into());
    }

    let mut channels = HashMap::with_capacity(dto.channels.len());
    for (chid, ch_dto) in dto.channels {
        if !ch_dto.extra.is_empty() {
            return Err(format!("unrecognized fields in channel {chid} of site {id}: {:?}", sorted_keys(&ch_dto.extra)).into());
        }
        channels.insert(
            ChannelId(chid),
            Channel {
                id: ChannelId(chid),
                freq_tx: ch_dto.freq_tx,
                freq_rx: ch_dto.freq_rx,
                enabled: ch_dto.enabled,
                fdma: ch_dto.fdma,
                tdma: ch_dto.tdma,
                control: ch_dto.control,
                data: ch_dto.data,
                bsi: ch_dto.bsi,
            },
        );
    }

    let mut subsites = Vec::with_capacity(dto.subsites.len());
    for sub_dto in dto.subsites {
        if !sub_dto.extra.is_empty() {
            return Err(format!("unrecognized fields in subsite {} of site {id}: {:?}", sub_dto.id, sorted_keys(&sub_dto.extra)).into());
        }
        subsites.push(Subsite {
            id: SubsiteId(sub_dto.id),
            location: Location::new(sub_dto.location.lat, sub_dto.location.lon),
            operating_radius_km: sub_dto.operating_radius_km,
        });
    }

    Ok(Site {
        id,
        alias: dto.alias,
        assignment_mode: dto.assignment_mode,
        channels,
        subsites,
    })
}

fn convert_area(dto: AreaDto) -> OperationalArea {
    OperationalArea {
        top_left: Location::new(dto.top_left.lat, dto.top_left.lon),
        bottom_right: Location::new(dto.bottom_right.lat, dto.bottom_right.lon),
    }
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

// ----------------------- DTOs for YAML input shape -----------------------

#[derive(Deserialize)]
struct WacnDto {
    config_version: String,
    id: u32,
    #[serde(default)]
    area: Option<AreaDto>,
    #[serde(default)]
    zones: HashMap<u32, ZoneDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct LocationDto {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct AreaDto {
    top_left: LocationDto,
    bottom_right: LocationDto,
}

#[derive(Deserialize)]
struct ZoneDto {
    alias: String,
    #[serde(default)]
    area: Option<AreaDto>,
    #[serde(default)]
    sites: HashMap<u32, SiteDto>,
    #[serde(default)]
    talkgroups: HashMap<u32, TalkgroupDto>,
    #[serde(default)]
    units: HashMap<u32, UnitDto>,
    #[serde(default)]
    consoles: HashMap<u32, ConsoleDto>,
    #[serde(default)]
    groups: HashMap<u32, GroupDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SiteDto {
    alias: String,
    assignment_mode: AssignmentMode,
    #[serde(default)]
    channels: HashMap<u32, ChannelDto>,
    subsites: Vec<SubsiteDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct ChannelDto {
    freq_tx: f64,
    freq_rx: f64,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    fdma: bool,
    #[serde(default)]
    tdma: bool,
    #[serde(default)]
    control: bool,
    #[serde(default)]
    data: bool,
    #[serde(default)]
    bsi: bool,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SubsiteDto {
    id: u32,
    location: LocationDto,
    operating_radius_km: f64,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct TalkgroupDto {
    alias: String,
    hangtime_ms: u64,
    ptt_id: bool,
    mode: TalkgroupMode,
    priority: EventPriority,
    #[serde(default)]
    all_start: Option<bool>,
    #[serde(default)]
    valid_sites: Option<Vec<u32>>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct UnitDto {
    alias: String,
    tdma_capable: bool,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct ConsoleDto {
    alias: String,
    #[serde(default)]
    affiliated_talkgroup_ids: Vec<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct GroupDto {
    alias: String,
    priority: EventPriority,
    #[serde(default)]
    members: GroupMembersDto,
    #[serde(default)]
    area: Option<AreaDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct GroupMembersDto {
    #[serde(default)]
    units: Vec<u32>,
    #[serde(default)]
    talkgroups: Vec<u32>,
    #[serde(default)]
    consoles: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
config_version: "1"
id: 1
zones:
  1:
    alias: zone-one
    sites:
      1:
        alias: site-one
        assignment_mode: rotating
        channels:
          1:
            freq_tx: 851.0125
            freq_rx: 806.0125
            enabled: true
            control: true
          2:
            freq_tx: 851.0250
            freq_rx: 806.0250
            enabled: true
            fdma: true
            tdma: true
        subsites:
          - id: 1
            location: { lat: 40.0, lon: -75.0 }
            operating_radius_km: 10.0
    talkgroups:
      100:
        alias: dispatch
        hangtime_ms: 1500
        ptt_id: true
        mode: MIXED
        priority: NORMAL
    units:
      1001:
        alias: unit-1001
        tdma_capable: true
"#;

    #[test]
    fn loads_minimal_config() {
        let wacn = from_yaml_str(MINIMAL).expect("should parse");
        assert_eq!(wacn.id, WacnId(1));
        let zone = wacn.zone(ZoneId(1)).expect("zone 1");
        assert_eq!(zone.sites.len(), 1);
        assert_eq!(zone.talkgroups.len(), 1);
        assert_eq!(zone.units.len(), 1);
    }

    #[test]
    fn rejects_unrecognized_top_level_field() {
        let bad = MINIMAL.replacen("id: 1", "id: 1\nbogus_field: true", 1);
        let err = from_yaml_str(&bad).unwrap_err();
        assert!(err.to_string().contains("unrecognized top-level fields"));
    }

    #[test]
    fn rejects_site_without_subsites() {
        let bad = r#"
config_version: "1"
id: 1
zones:
  1:
    alias: zone-one
    sites:
      1:
        alias: site-one
        assignment_mode: rotating
        subsites: []
"#;
        let err = from_yaml_str(bad).unwrap_err();
        assert!(err.to_string().contains("no subsites"));
    }

    #[test]
    fn rejects_unknown_config_version() {
        let bad = MINIMAL.replace("config_version: \"1\"", "config_version: \"99\"");
        let err = from_yaml_str(&bad).unwrap_err();
        assert!(err.to_string().contains("config_version"));
    }
}
