//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use itertools::Itertools;

use crate::error::Error;
use crate::interface::{
    self, AuthKey, AuthKeyKind, AuthType, DEAD_INTERVAL_DEFAULT,
    DEAD_INTERVAL_MAX, DEAD_INTERVAL_MIN, HELLO_INTERVAL_DEFAULT,
    HELLO_INTERVAL_MAX, HELLO_INTERVAL_MIN, RETRANSMIT_INTERVAL_DEFAULT,
    RETRANSMIT_INTERVAL_MAX, RETRANSMIT_INTERVAL_MIN,
};
use crate::master::{
    BACKBONE_AREA, InstanceId, IterKey, Master, next_ordered,
};
use crate::southbound::{self, InstanceConfig};

pub const RANGE_COST_MAX: u32 = 16_777_215;

// Derived classification of an area.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AreaType {
    Normal,
    Stub,
    // Stub that additionally suppresses inter-area summaries.
    TotallyStub,
    Nssa,
}

// Authentication mode required of every interface and virtual link in an
// area, unless overridden per interface.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AreaAuthType {
    #[default]
    SimplePassword,
    MessageDigest,
}

// Stub/NSSA designation of an area.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StubAreaCfg {
    pub nssa: bool,
    pub no_summary: bool,
}

// Summarization of intra-area routes at the area border.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AreaRangeCfg {
    pub advertised: bool,
    pub cost: Option<u32>,
}

// Virtual link through a transit area to a distant backbone router.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VirtualLinkCfg {
    pub hello_interval: u32,
    pub dead_interval: u32,
    pub retransmit_interval: u32,
    pub auth_type: AuthType,
    pub auth_key: Option<AuthKey>,
}

// ===== impl Default for AreaRangeCfg =====

impl Default for AreaRangeCfg {
    fn default() -> AreaRangeCfg {
        AreaRangeCfg { advertised: true, cost: None }
    }
}

// ===== impl Default for VirtualLinkCfg =====

impl Default for VirtualLinkCfg {
    fn default() -> VirtualLinkCfg {
        VirtualLinkCfg {
            hello_interval: HELLO_INTERVAL_DEFAULT,
            dead_interval: DEAD_INTERVAL_DEFAULT,
            retransmit_interval: RETRANSMIT_INTERVAL_DEFAULT,
            auth_type: AuthType::AreaDefault,
            auth_key: None,
        }
    }
}

// ===== impl Master =====

// Area authentication.
impl Master {
    pub fn area_auth_default(&self) -> AreaAuthType {
        AreaAuthType::default()
    }

    pub fn area_auth_add(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        auth: AreaAuthType,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        if let Some(current) = instance.auth_areas.get(&area) {
            if *current == auth {
                return Ok(());
            }
            return Err(Error::EntryAlreadyExists);
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            area_auth_command(area, auth),
        ])?;
        Ok(())
    }

    // The daemon holds area authentication as a single leaf, so the new form
    // replaces the old one directly.
    pub fn area_auth_set(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        auth: AreaAuthType,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        let current =
            instance.auth_areas.get(&area).ok_or(Error::EntryNotFound)?;
        if *current == auth {
            return Ok(());
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            area_auth_command(area, auth),
        ])?;
        Ok(())
    }

    pub fn area_auth_del(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;

        let config = state.fetch_config()?;
        if !config
            .instances
            .get(&id)
            .is_some_and(|instance| instance.auth_areas.contains_key(&area))
        {
            return Ok(());
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!("no area {area} authentication"),
        ])?;
        Ok(())
    }

    pub fn area_auth_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
    ) -> Result<AreaAuthType, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let config = state.fetch_config()?;
        config
            .instances
            .get(&id)
            .and_then(|instance| instance.auth_areas.get(&area))
            .copied()
            .ok_or(Error::EntryNotFound)
    }

    pub fn area_auth_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Addr>),
    ) -> Result<Option<(InstanceId, Ipv4Addr)>, Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;

        let instances = instance_level(&config.instances);
        let areas = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance.auth_areas.keys().copied(),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &areas],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
            ],
        );
        Ok(next.map(|keys| {
            (*keys[0].as_instance().unwrap(), *keys[1].as_addr().unwrap())
        }))
    }
}

// Stub areas.
impl Master {
    pub fn stub_area_default(&self) -> StubAreaCfg {
        StubAreaCfg::default()
    }

    pub fn stub_area_add(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        cfg: &StubAreaCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        if area == BACKBONE_AREA {
            return Err(Error::StubAreaNotAllowedOnBackbone);
        }

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        if instance.vlinks.keys().any(|(vl_area, _)| *vl_area == area) {
            return Err(Error::StubAreaHasVirtualLink);
        }
        if let Some(current) = instance.stub_areas.get(&area) {
            if current == cfg {
                return Ok(());
            }
            return Err(Error::EntryAlreadyExists);
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            stub_area_command(area, cfg),
        ])?;
        Ok(())
    }

    pub fn stub_area_set(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        cfg: &StubAreaCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        if area == BACKBONE_AREA {
            return Err(Error::StubAreaNotAllowedOnBackbone);
        }

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        let current =
            instance.stub_areas.get(&area).ok_or(Error::EntryNotFound)?;
        if current == cfg {
            return Ok(());
        }

        let mut commands = vec![southbound::router_mode(id)];
        if current.nssa != cfg.nssa {
            // Changing the kind needs the old form removed first; the daemon
            // rejects a stub designation while the NSSA one is active.
            commands.push(format!(
                "no area {area} {}",
                if current.nssa { "nssa" } else { "stub" }
            ));
            commands.push(stub_area_command(area, cfg));
        } else if cfg.no_summary {
            commands.push(stub_area_command(area, cfg));
        } else {
            commands.push(format!(
                "no area {area} {} no-summary",
                if cfg.nssa { "nssa" } else { "stub" }
            ));
        }
        state.daemon.configure(&commands)?;
        Ok(())
    }

    pub fn stub_area_del(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;

        let config = state.fetch_config()?;
        let Some(current) = config
            .instances
            .get(&id)
            .and_then(|instance| instance.stub_areas.get(&area))
        else {
            return Ok(());
        };

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!(
                "no area {area} {}",
                if current.nssa { "nssa" } else { "stub" }
            ),
        ])?;
        Ok(())
    }

    pub fn stub_area_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
    ) -> Result<StubAreaCfg, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let config = state.fetch_config()?;
        config
            .instances
            .get(&id)
            .and_then(|instance| instance.stub_areas.get(&area))
            .copied()
            .ok_or(Error::EntryNotFound)
    }

    // Classification of an arbitrary area. Areas without a stub/NSSA entry
    // are normal, including areas nothing else refers to.
    pub fn area_type_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
    ) -> Result<AreaType, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let config = state.fetch_config()?;
        let stub = config
            .instances
            .get(&id)
            .and_then(|instance| instance.stub_areas.get(&area));
        Ok(match stub {
            None => AreaType::Normal,
            Some(StubAreaCfg { nssa: true, .. }) => AreaType::Nssa,
            Some(StubAreaCfg { no_summary: false, .. }) => AreaType::Stub,
            Some(_) => AreaType::TotallyStub,
        })
    }

    pub fn stub_area_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Addr>),
    ) -> Result<Option<(InstanceId, Ipv4Addr)>, Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;

        let instances = instance_level(&config.instances);
        let areas = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance.stub_areas.keys().copied(),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &areas],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
            ],
        );
        Ok(next.map(|keys| {
            (*keys[0].as_instance().unwrap(), *keys[1].as_addr().unwrap())
        }))
    }
}

// Area ranges.
impl Master {
    pub fn area_range_default(&self) -> AreaRangeCfg {
        AreaRangeCfg::default()
    }

    pub fn area_range_add(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        net: Ipv4Network,
        cfg: &AreaRangeCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        validate_area_range(net, cfg)?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        if let Some(current) = instance.ranges.get(&(area, net)) {
            if current == cfg {
                return Ok(());
            }
            return Err(Error::EntryAlreadyExists);
        }
        check_range_overlap(instance, area, net)?;

        state.daemon.configure(&[
            southbound::router_mode(id),
            area_range_command(area, net, cfg),
        ])?;
        Ok(())
    }

    // Changing flags replaces the whole entry: the daemon keeps previously
    // set options on re-issue, so the old entry is removed first.
    pub fn area_range_set(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        net: Ipv4Network,
        cfg: &AreaRangeCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        validate_area_range(net, cfg)?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        let current =
            instance.ranges.get(&(area, net)).ok_or(Error::EntryNotFound)?;
        if current == cfg {
            return Ok(());
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!("no area {area} range {net}"),
            area_range_command(area, net, cfg),
        ])?;
        Ok(())
    }

    pub fn area_range_del(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        net: Ipv4Network,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;

        let config = state.fetch_config()?;
        if !config
            .instances
            .get(&id)
            .is_some_and(|instance| instance.ranges.contains_key(&(area, net)))
        {
            return Ok(());
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!("no area {area} range {net}"),
        ])?;
        Ok(())
    }

    pub fn area_range_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        net: Ipv4Network,
    ) -> Result<AreaRangeCfg, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let config = state.fetch_config()?;
        config
            .instances
            .get(&id)
            .and_then(|instance| instance.ranges.get(&(area, net)))
            .copied()
            .ok_or(Error::EntryNotFound)
    }

    pub fn area_range_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Addr>, Option<Ipv4Network>),
    ) -> Result<Option<(InstanceId, Ipv4Addr, Ipv4Network)>, Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;

        let instances = instance_level(&config.instances);
        let areas = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance.ranges.keys().map(|(area, _)| *area).dedup(),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };
        let nets = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let area = *outer[1].as_addr().unwrap();
            let current = current.map(|key| *key.as_net().unwrap());
            next_ordered(
                instance
                    .ranges
                    .keys()
                    .filter(|(range_area, _)| *range_area == area)
                    .map(|(_, net)| *net),
                current.as_ref(),
            )
            .map(IterKey::Net)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &areas, &nets],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
                current.2.map(IterKey::Net),
            ],
        );
        Ok(next.map(|keys| {
            (
                *keys[0].as_instance().unwrap(),
                *keys[1].as_addr().unwrap(),
                *keys[2].as_net().unwrap(),
            )
        }))
    }
}

// Virtual links.
impl Master {
    pub fn virtual_link_default(&self) -> VirtualLinkCfg {
        VirtualLinkCfg::default()
    }

    pub fn virtual_link_add(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
        cfg: &VirtualLinkCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        if area == BACKBONE_AREA {
            return Err(Error::VirtualLinkNotAllowedOnBackbone);
        }
        validate_virtual_link(cfg)?;
        let plain_key = cfg
            .auth_key
            .as_ref()
            .map(|key| {
                interface::plaintext_key(
                    &state.codec,
                    AuthKeyKind::SimplePassword,
                    key,
                )
            })
            .transpose()?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        if instance.stub_areas.contains_key(&area) {
            return Err(Error::VirtualLinkInStubArea);
        }
        if let Some(current) = instance.vlinks.get(&(area, router_id)) {
            if virtual_link_matches(&state.codec, current, cfg)? {
                return Ok(());
            }
            return Err(Error::EntryAlreadyExists);
        }

        let mut commands = vec![southbound::router_mode(id)];
        let base = format!("area {area} virtual-link {router_id}");
        commands.push(base.clone());
        if cfg.hello_interval != HELLO_INTERVAL_DEFAULT {
            commands.push(format!(
                "{base} hello-interval {}",
                cfg.hello_interval
            ));
        }
        if cfg.dead_interval != DEAD_INTERVAL_DEFAULT {
            commands
                .push(format!("{base} dead-interval {}", cfg.dead_interval));
        }
        if cfg.retransmit_interval != RETRANSMIT_INTERVAL_DEFAULT {
            commands.push(format!(
                "{base} retransmit-interval {}",
                cfg.retransmit_interval
            ));
        }
        if let Some(command) = auth_type_command(&base, cfg.auth_type) {
            commands.push(command);
        }
        if let Some(key) = &plain_key {
            commands.push(format!("{base} authentication-key {key}"));
        }
        state.daemon.configure(&commands)?;
        Ok(())
    }

    pub fn virtual_link_set(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
        cfg: &VirtualLinkCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        validate_virtual_link(cfg)?;
        let plain_key = cfg
            .auth_key
            .as_ref()
            .map(|key| {
                interface::plaintext_key(
                    &state.codec,
                    AuthKeyKind::SimplePassword,
                    key,
                )
            })
            .transpose()?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        let current = instance
            .vlinks
            .get(&(area, router_id))
            .ok_or(Error::EntryNotFound)?;

        let mut commands = vec![southbound::router_mode(id)];
        let base = format!("area {area} virtual-link {router_id}");
        if cfg.hello_interval != current.hello_interval {
            commands.push(format!(
                "{base} hello-interval {}",
                cfg.hello_interval
            ));
        }
        if cfg.dead_interval != current.dead_interval {
            commands
                .push(format!("{base} dead-interval {}", cfg.dead_interval));
        }
        if cfg.retransmit_interval != current.retransmit_interval {
            commands.push(format!(
                "{base} retransmit-interval {}",
                cfg.retransmit_interval
            ));
        }
        if cfg.auth_type != current.auth_type {
            match auth_type_command(&base, cfg.auth_type) {
                Some(command) => commands.push(command),
                None => commands.push(format!("no {base} authentication")),
            }
        }
        let current_key = current.auth_key.as_ref().map(|key| &key.key);
        if plain_key.as_ref() != current_key {
            match &plain_key {
                Some(key) => commands
                    .push(format!("{base} authentication-key {key}")),
                None => {
                    commands.push(format!("no {base} authentication-key"))
                }
            }
        }

        if commands.len() > 1 {
            state.daemon.configure(&commands)?;
        }
        Ok(())
    }

    pub fn virtual_link_del(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;

        let config = state.fetch_config()?;
        if !config.instances.get(&id).is_some_and(|instance| {
            instance.vlinks.contains_key(&(area, router_id))
        }) {
            return Ok(());
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!("no area {area} virtual-link {router_id}"),
        ])?;
        Ok(())
    }

    pub fn virtual_link_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
    ) -> Result<VirtualLinkCfg, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let config = state.fetch_config()?;
        let mut cfg = config
            .instances
            .get(&id)
            .and_then(|instance| instance.vlinks.get(&(area, router_id)))
            .cloned()
            .ok_or(Error::EntryNotFound)?;
        if let Some(key) = cfg.auth_key.take() {
            cfg.auth_key =
                Some(interface::encrypted_key(&state.codec, &key.key)?);
        }
        Ok(cfg)
    }

    pub fn virtual_link_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Addr>, Option<Ipv4Addr>),
    ) -> Result<Option<(InstanceId, Ipv4Addr, Ipv4Addr)>, Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;

        let instances = instance_level(&config.instances);
        let areas = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance.vlinks.keys().map(|(area, _)| *area).dedup(),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };
        let routers = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let area = *outer[1].as_addr().unwrap();
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance
                    .vlinks
                    .keys()
                    .filter(|(vl_area, _)| *vl_area == area)
                    .map(|(_, router_id)| *router_id),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &areas, &routers],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
                current.2.map(IterKey::Addr),
            ],
        );
        Ok(next.map(|keys| {
            (
                *keys[0].as_instance().unwrap(),
                *keys[1].as_addr().unwrap(),
                *keys[2].as_addr().unwrap(),
            )
        }))
    }
}

// Virtual-link message-digest keys.
impl Master {
    pub fn vlink_md5_key_add(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
        key_id: u8,
        key: &AuthKey,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        interface::validate_md5_key_id(key_id)?;
        let plain = interface::plaintext_key(
            &state.codec,
            AuthKeyKind::Md5Digest,
            key,
        )?;

        let config = state.fetch_config()?;
        let instance = config.instances.get(&id).ok_or(Error::EntryNotFound)?;
        if !instance.vlinks.contains_key(&(area, router_id)) {
            return Err(Error::EntryNotFound);
        }
        if let Some(current) =
            instance.vlink_md5_keys.get(&(area, router_id, key_id))
        {
            if *current == plain {
                return Ok(());
            }
            return Err(Error::EntryAlreadyExists);
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!(
                "area {area} virtual-link {router_id} message-digest-key \
                 {key_id} md5 {plain}"
            ),
        ])?;
        Ok(())
    }

    pub fn vlink_md5_key_del(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
        key_id: u8,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        interface::validate_md5_key_id(key_id)?;

        let config = state.fetch_config()?;
        if !config.instances.get(&id).is_some_and(|instance| {
            instance.vlink_md5_keys.contains_key(&(area, router_id, key_id))
        }) {
            return Ok(());
        }

        state.daemon.configure(&[
            southbound::router_mode(id),
            format!(
                "no area {area} virtual-link {router_id} \
                 message-digest-key {key_id}"
            ),
        ])?;
        Ok(())
    }

    pub fn vlink_md5_key_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
        router_id: Ipv4Addr,
        key_id: u8,
    ) -> Result<AuthKey, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        interface::validate_md5_key_id(key_id)?;
        let config = state.fetch_config()?;
        let plain = config
            .instances
            .get(&id)
            .and_then(|instance| {
                instance.vlink_md5_keys.get(&(area, router_id, key_id))
            })
            .ok_or(Error::EntryNotFound)?;
        interface::encrypted_key(&state.codec, plain)
    }

    pub fn vlink_md5_key_iter(
        &self,
        current: (
            Option<InstanceId>,
            Option<Ipv4Addr>,
            Option<Ipv4Addr>,
            Option<u8>,
        ),
    ) -> Result<Option<(InstanceId, Ipv4Addr, Ipv4Addr, u8)>, Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;

        let instances = instance_level(&config.instances);
        let areas = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance
                    .vlink_md5_keys
                    .keys()
                    .map(|(area, ..)| *area)
                    .dedup(),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };
        let routers = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let area = *outer[1].as_addr().unwrap();
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                instance
                    .vlink_md5_keys
                    .keys()
                    .filter(|(key_area, ..)| *key_area == area)
                    .map(|(_, router_id, _)| *router_id),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };
        let key_ids = |outer: &[IterKey], current: Option<&IterKey>| {
            let instance =
                config.instances.get(outer[0].as_instance().unwrap())?;
            let area = *outer[1].as_addr().unwrap();
            let router_id = *outer[2].as_addr().unwrap();
            let current = current.map(|key| *key.as_key_id().unwrap());
            next_ordered(
                instance
                    .vlink_md5_keys
                    .keys()
                    .filter(|(key_area, key_router, _)| {
                        *key_area == area && *key_router == router_id
                    })
                    .map(|(.., key_id)| *key_id),
                current.as_ref(),
            )
            .map(IterKey::KeyId)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &areas, &routers, &key_ids],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
                current.2.map(IterKey::Addr),
                current.3.map(IterKey::KeyId),
            ],
        );
        Ok(next.map(|keys| {
            (
                *keys[0].as_instance().unwrap(),
                *keys[1].as_addr().unwrap(),
                *keys[2].as_addr().unwrap(),
                *keys[3].as_key_id().unwrap(),
            )
        }))
    }
}

// ===== helper functions =====

// Level closure over configured instances, shared by the composite
// iterators in this module.
fn instance_level(
    instances: &std::collections::BTreeMap<InstanceId, InstanceConfig>,
) -> impl Fn(&[IterKey], Option<&IterKey>) -> Option<IterKey> {
    move |_: &[IterKey], current: Option<&IterKey>| {
        let current = current.map(|key| *key.as_instance().unwrap());
        next_ordered(instances.keys().copied(), current.as_ref())
            .map(IterKey::Instance)
    }
}

fn area_auth_command(area: Ipv4Addr, auth: AreaAuthType) -> String {
    match auth {
        AreaAuthType::SimplePassword => format!("area {area} authentication"),
        AreaAuthType::MessageDigest => {
            format!("area {area} authentication message-digest")
        }
    }
}

fn stub_area_command(area: Ipv4Addr, cfg: &StubAreaCfg) -> String {
    let kind = if cfg.nssa { "nssa" } else { "stub" };
    if cfg.no_summary {
        format!("area {area} {kind} no-summary")
    } else {
        format!("area {area} {kind}")
    }
}

fn area_range_command(
    area: Ipv4Addr,
    net: Ipv4Network,
    cfg: &AreaRangeCfg,
) -> String {
    if !cfg.advertised {
        format!("area {area} range {net} not-advertise")
    } else if let Some(cost) = cfg.cost {
        format!("area {area} range {net} cost {cost}")
    } else {
        format!("area {area} range {net}")
    }
}

fn auth_type_command(base: &str, auth_type: AuthType) -> Option<String> {
    match auth_type {
        AuthType::AreaDefault => None,
        AuthType::Null => Some(format!("{base} authentication null")),
        AuthType::SimplePassword => Some(format!("{base} authentication")),
        AuthType::MessageDigest => {
            Some(format!("{base} authentication message-digest"))
        }
    }
}

fn validate_area_range(
    net: Ipv4Network,
    cfg: &AreaRangeCfg,
) -> Result<(), Error> {
    if net.prefix() == 0 {
        return Err(Error::AreaRangeNetworkDefault);
    }
    if net.ip() != net.network() {
        return Err(Error::InvalidArgument("range network"));
    }
    if !cfg.advertised && cfg.cost.is_some() {
        return Err(Error::AreaRangeCostConflict);
    }
    if let Some(cost) = cfg.cost
        && cost > RANGE_COST_MAX
    {
        return Err(Error::InvalidArgument("range cost"));
    }
    Ok(())
}

fn check_range_overlap(
    instance: &InstanceConfig,
    area: Ipv4Addr,
    net: Ipv4Network,
) -> Result<(), Error> {
    if instance
        .ranges
        .keys()
        .filter(|(range_area, range_net)| {
            *range_area == area && *range_net != net
        })
        .any(|(_, range_net)| range_net.overlaps(net))
    {
        return Err(Error::AreaRangeOverlap);
    }
    Ok(())
}

fn validate_virtual_link(cfg: &VirtualLinkCfg) -> Result<(), Error> {
    if !(HELLO_INTERVAL_MIN..=HELLO_INTERVAL_MAX)
        .contains(&cfg.hello_interval)
    {
        return Err(Error::InvalidArgument("hello interval"));
    }
    if !(DEAD_INTERVAL_MIN..=DEAD_INTERVAL_MAX).contains(&cfg.dead_interval) {
        return Err(Error::InvalidArgument("dead interval"));
    }
    if !(RETRANSMIT_INTERVAL_MIN..=RETRANSMIT_INTERVAL_MAX)
        .contains(&cfg.retransmit_interval)
    {
        return Err(Error::InvalidArgument("retransmit interval"));
    }
    Ok(())
}

// Compares an inbound virtual-link configuration with the daemon's view,
// resolving key material to plaintext on both sides.
fn virtual_link_matches(
    codec: &ospfmgr_utils::secret::SecretCodec,
    current: &VirtualLinkCfg,
    cfg: &VirtualLinkCfg,
) -> Result<bool, Error> {
    if (current.hello_interval, current.dead_interval)
        != (cfg.hello_interval, cfg.dead_interval)
        || current.retransmit_interval != cfg.retransmit_interval
        || current.auth_type != cfg.auth_type
    {
        return Ok(false);
    }
    let desired = cfg
        .auth_key
        .as_ref()
        .map(|key| {
            interface::plaintext_key(codec, AuthKeyKind::SimplePassword, key)
        })
        .transpose()?;
    Ok(desired == current.auth_key.as_ref().map(|key| key.key.clone()))
}

// ===== tests =====
