use trunksim_core::{CallId, ChannelId, ConsoleId, EventPriority, Location, SiteId, TalkgroupId, UnitId, ZoneId};

/// Identity of whoever is keying up a `RadioCall`: an ordinary subscriber
/// unit, or a console exercising preemption (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallInitiator {
    Unit(UnitId),
    Console(ConsoleId),
}

/// The TDMA-slot half of a `VoiceChannel` allocation key (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TdmaSlot {
    None,
    One,
    Two,
}

/// Allocation key for a voice channel: an FDMA allocation uses `TdmaSlot::None`;
/// a TDMA allocation uses `One` or `Two`. Key equality defines allocation
/// identity, per spec.md §3's VoiceChannel invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceChannel {
    pub channel_id: ChannelId,
    pub tdma_slot: TdmaSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    RegAccept,
    RegDeny,
    RegRefused,
    RegFail,
    FailedSystemFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffiliationStatus {
    Accepted,
    Denied,
    Failed,
    Refused,
}

/// The full set of commands and signaling messages the zone controller
/// accepts, as an exhaustive sum type per the re-architecture guidance in
/// spec.md §9 ("replace duck-typed Event base classes... with a sum type
/// over the exhaustive message set"). Each variant corresponds to one bullet
/// in spec.md §6.
#[derive(Debug, Clone)]
pub enum Event {
    // Commands (external command surface)
    UnitPowerOnCommand { unit_id: UnitId },
    UnitUpdateLocationCommand { unit_id: UnitId, new_location: Location },
    UnitScanForSitesCommand { unit_id: UnitId },
    UnitInitiateCallCommand { unit_id: UnitId, talkgroup_id: TalkgroupId },
    UnitEndTransmissionCommand { unit_id: UnitId, call_id: CallId },
    ConsoleInitiateCallCommand { console_id: ConsoleId, talkgroup_id: TalkgroupId },
    UnitUnbanFromSiteCommand { unit_id: UnitId, zone_id: ZoneId, site_id: SiteId },

    // Signaling messages (internal, values not wire bytes)
    UnitRegistrationRequest { unit_id: UnitId, site_id: SiteId },
    UnitRegistrationResponse {
        unit_id: UnitId,
        site_id: SiteId,
        zone_id: ZoneId,
        status: RegistrationStatus,
    },
    GroupAffiliationRequest { unit_id: UnitId, talkgroup_id: TalkgroupId },
    GroupAffiliationResponse {
        unit_id: UnitId,
        talkgroup_id: TalkgroupId,
        zone_id: ZoneId,
        status: AffiliationStatus,
    },
    GroupVoiceServiceRequest {
        initiator: CallInitiator,
        talkgroup_id: TalkgroupId,
        priority: EventPriority,
    },
    GroupVoiceChannelGrant {
        unit_id: UnitId,
        talkgroup_id: TalkgroupId,
        call_id: CallId,
        channel_id: ChannelId,
        tdma_slot: TdmaSlot,
    },
    QueuedResponse { unit_id: UnitId, talkgroup_id: TalkgroupId },
    ControlChannelEstablishRequest {
        site_id: SiteId,
        zone_id: ZoneId,
        channel_id: ChannelId,
    },
    CallTeardownCommand { call_id: CallId },

    // Blocked-queue sweep, driven once per tick by the controller itself
    // rather than by a host command (spec.md §4.7 "Servicing blocked calls").
    ServiceBlockedQueueSweep,
}

/// Fieldless mirror of `Event`'s variants, used as the event bus's dispatch
/// key (spec.md §4.2: "Maps each concrete message type to a list of
/// handlers").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UnitPowerOnCommand,
    UnitUpdateLocationCommand,
    UnitScanForSitesCommand,
    UnitInitiateCallCommand,
    UnitEndTransmissionCommand,
    ConsoleInitiateCallCommand,
    UnitUnbanFromSiteCommand,
    UnitRegistrationRequest,
    UnitRegistrationResponse,
    GroupAffiliationRequest,
    GroupAffiliationResponse,
    GroupVoiceServiceRequest,
    GroupVoiceChannelGrant,
    QueuedResponse,
    ControlChannelEstablishRequest,
    CallTeardownCommand,
    ServiceBlockedQueueSweep,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::UnitPowerOnCommand { .. } => EventKind::UnitPowerOnCommand,
            Event::UnitUpdateLocationCommand { .. } => EventKind::UnitUpdateLocationCommand,
            Event::UnitScanForSitesCommand { .. } => EventKind::UnitScanForSitesCommand,
            Event::UnitInitiateCallCommand { .. } => EventKind::UnitInitiateCallCommand,
            Event::UnitEndTransmissionCommand { .. } => EventKind::UnitEndTransmissionCommand,
            Event::ConsoleInitiateCallCommand { .. } => EventKind::ConsoleInitiateCallCommand,
            Event::UnitUnbanFromSiteCommand { .. } => EventKind::UnitUnbanFromSiteCommand,
            Event::UnitRegistrationRequest { .. } => EventKind::UnitRegistrationRequest,
            Event::UnitRegistrationResponse { .. } => EventKind::UnitRegistrationResponse,
            Event::GroupAffiliationRequest { .. } => EventKind::GroupAffiliationRequest,
            Event::GroupAffiliationResponse { .. } => EventKind::GroupAffiliationResponse,
            Event::GroupVoiceServiceRequest { .. } => EventKind::GroupVoiceServiceRequest,
            Event::GroupVoiceChannelGrant { .. } => EventKind::GroupVoiceChannelGrant,
            Event::QueuedResponse { .. } => EventKind::QueuedResponse,
            Event::ControlChannelEstablishRequest { .. } => EventKind::ControlChannelEstablishRequest,
            Event::CallTeardownCommand { .. } => EventKind::CallTeardownCommand,
            Event::ServiceBlockedQueueSweep => EventKind::ServiceBlockedQueueSweep,
        }
    }
}
