use std::collections::HashMap;

use rand::RngCore;
use trunksim_config::{AssignmentMode, Site as SiteConfig};
use trunksim_core::{CallId, ChannelId, SiteId, UnitId};

use crate::messages::{TdmaSlot, VoiceChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Offline,
    Initializing,
    Online,
    Failed,
    SiteTrunking,
}

/// Voice-channel capability a `GroupVoiceServiceRequest` resolves to before
/// reaching the allocator. `Mixed` never reaches `allocate`; the zone
/// controller downgrades it to `Fdma` or `Tdma` first (spec.md §4.7 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredMode {
    Fdma,
    Tdma,
}

/// Runtime state for one `Site`: its lifecycle status, its registrations,
/// and the voice-channel allocator (spec.md §4.4, §4.6).
#[derive(Debug, Clone)]
pub struct SiteRuntime {
    pub config: SiteConfig,
    pub status: SiteStatus,
    pub control_channel: Option<ChannelId>,
    pub registrations: Vec<UnitId>,
    pub assigned_voice_channels: HashMap<VoiceChannel, CallId>,
}

impl SiteRuntime {
    pub fn new(config: SiteConfig) -> Self {
        SiteRuntime {
            config,
            status: SiteStatus::Offline,
            control_channel: None,
            registrations: Vec::new(),
            assigned_voice_channels: HashMap::new(),
        }
    }

    pub fn id(&self) -> SiteId {
        self.config.id
    }

    /// Selects the lowest-id enabled control-capable channel and goes
    /// Online, or goes Failed if no control channel (or no usable voice
    /// channel) exists. Returns `true` on success, mirroring
    /// `ControlChannelEstablishRequest` being worth publishing.
    pub fn initialize(&mut self) -> bool {
        self.status = SiteStatus::Initializing;

        let mut control_ids: Vec<ChannelId> = self
            .config
            .channels
            .values()
            .filter(|c| c.enabled && c.control)
            .map(|c| c.id)
            .collect();
        control_ids.sort();

        let has_voice_channel = self
            .config
            .channels
            .values()
            .any(|c| c.enabled && !c.control && (c.fdma || c.tdma));

        match control_ids.first() {
            Some(&chid) if has_voice_channel => {
                self.control_channel = Some(chid);
                self.status = SiteStatus::Online;
                true
            }
            _ => {
                self.status = SiteStatus::Failed;
                false
            }
        }
    }

    pub fn stop(&mut self) {
        self.status = SiteStatus::Offline;
        self.registrations.clear();
        self.assigned_voice_channels.clear();
    }

    pub fn fail(&mut self) {
        self.status = SiteStatus::Failed;
    }

    pub fn register(&mut self, unit_id: UnitId) {
        if !self.registrations.contains(&unit_id) {
            self.registrations.push(unit_id);
        }
    }

    pub fn enabled_non_control_channel_count(&self) -> usize {
        self.config.channels.values().filter(|c| c.enabled && !c.control).count()
    }

    pub fn has_available_voice_channel(&self) -> bool {
        self.assigned_voice_channels.len() < self.enabled_non_control_channel_count()
    }

    fn candidate_channels(&self, required_mode: RequiredMode) -> Vec<ChannelId> {
        self.config
            .channels
            .values()
            .filter(|c| {
                c.enabled
                    && !c.control
                    && match required_mode {
                        RequiredMode::Fdma => c.fdma,
                        RequiredMode::Tdma => c.tdma,
                    }
            })
            .map(|c| c.id)
            .collect()
    }

    /// The Site Resource Allocator (spec.md §4.4). Returns the allocated key
    /// on success; `None` if no idle channel is available (the preemption
    /// hook is declared but left unimplemented, per spec.md §9).
    pub fn allocate(&mut self, call_id: CallId, required_mode: RequiredMode, rng: &mut dyn RngCore) -> Option<VoiceChannel> {
        let candidates = self.candidate_channels(required_mode);

        if required_mode == RequiredMode::Tdma {
            let mut sharing_candidates: Vec<ChannelId> = candidates.clone();
            sharing_candidates.sort();
            for chid in sharing_candidates {
                let slot1 = VoiceChannel { channel_id: chid, tdma_slot: TdmaSlot::One };
                let slot2 = VoiceChannel { channel_id: chid, tdma_slot: TdmaSlot::Two };
                let has1 = self.assigned_voice_channels.contains_key(&slot1);
                let has2 = self.assigned_voice_channels.contains_key(&slot2);
                if has1 && !has2 {
                    self.assigned_voice_channels.insert(slot2, call_id);
                    return Some(slot2);
                }
                if has2 && !has1 {
                    self.assigned_voice_channels.insert(slot1, call_id);
                    return Some(slot1);
                }
            }
        }

        let mut idle: Vec<ChannelId> = candidates
            .into_iter()
            .filter(|chid| {
                let fdma_key = VoiceChannel { channel_id: *chid, tdma_slot: TdmaSlot::None };
                let slot1_key = VoiceChannel { channel_id: *chid, tdma_slot: TdmaSlot::One };
                let slot2_key = VoiceChannel { channel_id: *chid, tdma_slot: TdmaSlot::Two };
                !self.assigned_voice_channels.contains_key(&fdma_key)
                    && !self.assigned_voice_channels.contains_key(&slot1_key)
                    && !self.assigned_voice_channels.contains_key(&slot2_key)
            })
            .collect();
        idle.sort();

        if idle.is_empty() {
            // Preemption hook: evaluate assigned calls for a lower-priority
            // preemptible call. Not implemented; allocation fails.
            return None;
        }

        let chosen = match self.config.assignment_mode {
            AssignmentMode::Rotating => idle[0],
            AssignmentMode::Random => {
                let idx = (rng.next_u32() as usize) % idle.len();
                idle[idx]
            }
            AssignmentMode::Balanced => idle[idle.len() / 2],
        };

        let slot = match required_mode {
            RequiredMode::Tdma => TdmaSlot::One,
            RequiredMode::Fdma => TdmaSlot::None,
        };
        let key = VoiceChannel { channel_id: chosen, tdma_slot: slot };
        self.assigned_voice_channels.insert(key, call_id);
        Some(key)
    }

    /// Idempotent: releasing an absent key is a logged no-op (spec.md §4.4,
    /// §8 round-trip property).
    pub fn release(&mut self, key: VoiceChannel) {
        if self.assigned_voice_channels.remove(&key).is_none() {
            tracing::warn!(channel_id = %key.channel_id, ?key.tdma_slot, "release of voice channel not currently assigned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use trunksim_config::Channel;
    use trunksim_core::{Location, SubsiteId};

    fn site(assignment_mode: AssignmentMode, channels: Vec<(u32, bool, bool, bool)>) -> SiteRuntime {
        let mut chmap = Map::new();
        for (id, enabled, fdma, tdma) in channels {
            chmap.insert(
                ChannelId(id),
                Channel {
                    id: ChannelId(id),
                    freq_tx: 0.0,
                    freq_rx: 0.0,
                    enabled,
                    fdma,
                    tdma,
                    control: false,
                    data: false,
                    bsi: false,
                },
            );
        }
        chmap.insert(
            ChannelId(999),
            Channel {
                id: ChannelId(999),
                freq_tx: 0.0,
                freq_rx: 0.0,
                enabled: true,
                fdma: false,
                tdma: false,
                control: true,
                data: false,
                bsi: false,
            },
        );
        SiteRuntime::new(SiteConfig {
            id: SiteId(1),
            alias: "s1".into(),
            assignment_mode,
            channels: chmap,
            subsites: vec![trunksim_config::Subsite {
                id: SubsiteId(1),
                location: Location::new(0.0, 0.0),
                operating_radius_km: 10.0,
            }],
        })
    }

    #[test]
    fn initialize_picks_lowest_id_control_channel() {
        let mut s = site(AssignmentMode::Rotating, vec![(1, true, true, false)]);
        assert!(s.initialize());
        assert_eq!(s.control_channel, Some(ChannelId(999)));
        assert_eq!(s.status, SiteStatus::Online);
    }

    #[test]
    fn initialize_fails_without_voice_channel() {
        let mut s = site(AssignmentMode::Rotating, vec![]);
        assert!(!s.initialize());
        assert_eq!(s.status, SiteStatus::Failed);
    }

    #[test]
    fn rotating_picks_lowest_idle_channel() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let mut s = site(AssignmentMode::Rotating, vec![(1, true, true, false), (2, true, true, false)]);
        s.initialize();
        let key = s.allocate(CallId(1), RequiredMode::Fdma, &mut rng).unwrap();
        assert_eq!(key.channel_id, ChannelId(1));
        assert_eq!(key.tdma_slot, TdmaSlot::None);
    }

    #[test]
    fn balanced_picks_upper_middle_of_even_list() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let mut s = site(
            AssignmentMode::Balanced,
            vec![(1, true, true, false), (2, true, true, false), (3, true, true, false), (4, true, true, false)],
        );
        s.initialize();
        let key = s.allocate(CallId(1), RequiredMode::Fdma, &mut rng).unwrap();
        assert_eq!(key.channel_id, ChannelId(3));
    }

    #[test]
    fn tdma_shares_second_slot_before_taking_a_new_channel() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let mut s = site(AssignmentMode::Rotating, vec![(1, true, true, true)]);
        s.initialize();
        let k1 = s.allocate(CallId(1), RequiredMode::Tdma, &mut rng).unwrap();
        assert_eq!(k1.tdma_slot, TdmaSlot::One);
        let k2 = s.allocate(CallId(2), RequiredMode::Tdma, &mut rng).unwrap();
        assert_eq!(k2.tdma_slot, TdmaSlot::Two);
        assert!(s.allocate(CallId(3), RequiredMode::Tdma, &mut rng).is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let mut s = site(AssignmentMode::Rotating, vec![(1, true, true, false)]);
        s.initialize();
        let key = s.allocate(CallId(1), RequiredMode::Fdma, &mut rng).unwrap();
        s.release(key);
        assert!(s.assigned_voice_channels.is_empty());
        s.release(key); // logged no-op, must not panic
    }

    #[test]
    fn has_available_voice_channel_gate() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let mut s = site(AssignmentMode::Rotating, vec![(1, true, true, false)]);
        s.initialize();
        assert!(s.has_available_voice_channel());
        s.allocate(CallId(1), RequiredMode::Fdma, &mut rng);
        assert!(!s.has_available_voice_channel());
    }
}
