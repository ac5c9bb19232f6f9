//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use ospfmgr_daemon::client::DaemonClient;
use ospfmgr_daemon::grammar;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::master::{
    InstanceId, IterKey, Master, MasterState, next_ordered,
};

const SHOW_ROUTER: &str = "show ip ospf json";
const SHOW_INTERFACES: &str = "show ip ospf interface json";
const SHOW_NEIGHBORS: &str = "show ip ospf neighbor detail json";
const SHOW_ROUTES: &str = "show ip ospf route json";
const SHOW_DATABASE: &str = "show ip ospf database json";

// Operational state of the routing process.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouterStatus {
    pub router_id: Ipv4Addr,
    // Remaining graceful-shutdown time in milliseconds; nonzero only while
    // a delete with stub-router on-shutdown is pending.
    #[serde(default)]
    pub deferred_shutdown_msecs: u64,
    #[serde(default)]
    pub rfc1583_compatibility: bool,
    #[serde(default)]
    pub areas: BTreeMap<Ipv4Addr, AreaStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AreaStatus {
    #[serde(default)]
    pub backbone: bool,
    #[serde(default)]
    pub interface_count: u32,
    #[serde(default)]
    pub full_neighbors: u32,
    #[serde(default)]
    pub spf_executions: u32,
    #[serde(default)]
    pub lsa_count: u32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStatus {
    #[serde(default)]
    pub up: bool,
    pub state: String,
    #[serde(default)]
    pub area: Option<Ipv4Addr>,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub dr_id: Option<Ipv4Addr>,
    #[serde(default)]
    pub bdr_id: Option<Ipv4Addr>,
}

// Keyed by the neighbor's router ID in the containing map.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NeighborStatus {
    pub address: Ipv4Addr,
    #[serde(default)]
    pub ifindex: u32,
    pub state: String,
    #[serde(default)]
    pub priority: u8,
    // Textual uptime as printed by the daemon; see `up_time_secs`.
    #[serde(default)]
    pub up_time: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    #[serde(default)]
    pub area: Option<Ipv4Addr>,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub route_type: String,
    #[serde(default)]
    pub next_hops: Vec<Ipv4Addr>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LsdbEntry {
    pub lsa_type: u8,
    // External LSAs have no containing area.
    #[serde(default)]
    pub area: Option<Ipv4Addr>,
    pub link_state_id: Ipv4Addr,
    pub adv_router: Ipv4Addr,
    #[serde(default)]
    pub age: u16,
    #[serde(default)]
    pub sequence: u32,
    #[serde(default)]
    pub checksum: u16,
}

#[derive(Debug, Deserialize)]
struct InterfaceStatusDoc {
    #[serde(default)]
    interfaces: BTreeMap<String, InterfaceStatus>,
}

#[derive(Debug, Deserialize)]
struct NeighborStatusDoc {
    #[serde(default)]
    neighbors: BTreeMap<Ipv4Addr, NeighborStatus>,
}

#[derive(Debug, Deserialize)]
struct RouteStatusDoc {
    #[serde(default)]
    routes: BTreeMap<Ipv4Network, RouteStatus>,
}

#[derive(Debug, Deserialize)]
struct LsdbDoc {
    #[serde(default)]
    entries: Vec<LsdbEntry>,
}

// ===== impl NeighborStatus =====

impl NeighborStatus {
    // Neighbor uptime in seconds. The daemon prints uptimes in a handful of
    // textual formats; anything unrecognized counts as zero.
    pub fn up_time_secs(&self) -> u32 {
        self.up_time
            .as_deref()
            .and_then(grammar::parse_uptime)
            .unwrap_or_default()
    }
}

// ===== impl Master =====

impl Master {
    pub fn router_status_get(
        &self,
        id: InstanceId,
    ) -> Result<RouterStatus, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        state.fetch_router_status()
    }

    pub fn area_status_get(
        &self,
        id: InstanceId,
        area: Ipv4Addr,
    ) -> Result<AreaStatus, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let status = state.fetch_router_status()?;
        status.areas.get(&area).cloned().ok_or(Error::EntryNotFound)
    }

    pub fn area_status_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Addr>),
    ) -> Result<Option<(InstanceId, Ipv4Addr)>, Error> {
        let mut state = self.lock();
        let enabled = state.enabled.clone();
        let areas: BTreeSet<Ipv4Addr> = match state.fetch_router_status() {
            Ok(status) => status.areas.keys().copied().collect(),
            Err(_) if enabled.is_empty() => BTreeSet::new(),
            Err(error) => return Err(error),
        };
        drop(state);

        let instances = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_instance().unwrap());
            next_ordered(enabled.iter().copied(), current.as_ref())
                .map(IterKey::Instance)
        };
        let area_level = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(areas.iter().copied(), current.as_ref())
                .map(IterKey::Addr)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &area_level],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
            ],
        );
        Ok(next.map(|keys| {
            (*keys[0].as_instance().unwrap(), *keys[1].as_addr().unwrap())
        }))
    }

    pub fn interface_status_get(
        &self,
        ifindex: u32,
    ) -> Result<InterfaceStatus, Error> {
        let mut state = self.lock();
        state.require_vlan(ifindex)?;
        let snapshot = {
            let MasterState { daemon, interfaces_cache, .. } = &mut *state;
            interfaces_cache
                .result(|| fetch_interfaces(daemon.as_mut()))
                .clone()
        };
        state.interfaces_cache.invalidate();
        snapshot?.get(&ifindex).cloned().ok_or(Error::EntryNotFound)
    }

    pub fn interface_status_iter(
        &self,
        current: Option<u32>,
    ) -> Result<Option<u32>, Error> {
        let mut state = self.lock();
        let snapshot = {
            let MasterState { daemon, interfaces_cache, .. } = &mut *state;
            interfaces_cache
                .update(|| fetch_interfaces(daemon.as_mut()))
                .clone()
        };
        state.interfaces_cache.invalidate();
        Ok(next_ordered(snapshot?.keys().copied(), current.as_ref()))
    }

    pub fn neighbor_status_get(
        &self,
        id: InstanceId,
        neighbor_id: Ipv4Addr,
    ) -> Result<NeighborStatus, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let snapshot = {
            let MasterState { daemon, neighbors_cache, .. } = &mut *state;
            neighbors_cache
                .result(|| fetch_neighbors(daemon.as_mut()))
                .clone()
        };
        state.neighbors_cache.invalidate();
        snapshot?.get(&neighbor_id).cloned().ok_or(Error::EntryNotFound)
    }

    pub fn neighbor_status_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Addr>),
    ) -> Result<Option<(InstanceId, Ipv4Addr)>, Error> {
        let mut state = self.lock();
        let enabled = state.enabled.clone();
        let snapshot = {
            let MasterState { daemon, neighbors_cache, .. } = &mut *state;
            neighbors_cache
                .update(|| fetch_neighbors(daemon.as_mut()))
                .clone()
        };
        state.neighbors_cache.invalidate();
        drop(state);
        let neighbors: BTreeSet<Ipv4Addr> = match snapshot {
            Ok(neighbors) => neighbors.keys().copied().collect(),
            Err(_) if enabled.is_empty() => BTreeSet::new(),
            Err(error) => return Err(error),
        };

        let instances = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_instance().unwrap());
            next_ordered(enabled.iter().copied(), current.as_ref())
                .map(IterKey::Instance)
        };
        let neighbor_level = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(neighbors.iter().copied(), current.as_ref())
                .map(IterKey::Addr)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &neighbor_level],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Addr),
            ],
        );
        Ok(next.map(|keys| {
            (*keys[0].as_instance().unwrap(), *keys[1].as_addr().unwrap())
        }))
    }

    pub fn route_status_get(
        &self,
        id: InstanceId,
        net: Ipv4Network,
    ) -> Result<RouteStatus, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let routes = fetch_routes(state.daemon.as_mut())?;
        routes.get(&net).cloned().ok_or(Error::EntryNotFound)
    }

    pub fn route_status_iter(
        &self,
        current: (Option<InstanceId>, Option<Ipv4Network>),
    ) -> Result<Option<(InstanceId, Ipv4Network)>, Error> {
        let mut state = self.lock();
        let enabled = state.enabled.clone();
        let routes: BTreeSet<Ipv4Network> =
            match fetch_routes(state.daemon.as_mut()) {
                Ok(routes) => routes.keys().copied().collect(),
                Err(_) if enabled.is_empty() => BTreeSet::new(),
                Err(error) => return Err(error),
            };
        drop(state);

        let instances = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_instance().unwrap());
            next_ordered(enabled.iter().copied(), current.as_ref())
                .map(IterKey::Instance)
        };
        let nets = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_net().unwrap());
            next_ordered(routes.iter().copied(), current.as_ref())
                .map(IterKey::Net)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &nets],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Net),
            ],
        );
        Ok(next.map(|keys| {
            (*keys[0].as_instance().unwrap(), *keys[1].as_net().unwrap())
        }))
    }

    pub fn lsdb_get(
        &self,
        id: InstanceId,
        lsa_type: u8,
        area: Ipv4Addr,
        link_state_id: Ipv4Addr,
        adv_router: Ipv4Addr,
    ) -> Result<LsdbEntry, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let entries = fetch_lsdb(state.daemon.as_mut())?;
        entries
            .into_iter()
            .find(|entry| {
                lsdb_key(entry) == (lsa_type, area, link_state_id, adv_router)
            })
            .ok_or(Error::EntryNotFound)
    }

    pub fn lsdb_iter(
        &self,
        current: (
            Option<InstanceId>,
            Option<u8>,
            Option<Ipv4Addr>,
            Option<Ipv4Addr>,
            Option<Ipv4Addr>,
        ),
    ) -> Result<
        Option<(InstanceId, u8, Ipv4Addr, Ipv4Addr, Ipv4Addr)>,
        Error,
    > {
        let mut state = self.lock();
        let enabled = state.enabled.clone();
        let keys: BTreeSet<(u8, Ipv4Addr, Ipv4Addr, Ipv4Addr)> =
            match fetch_lsdb(state.daemon.as_mut()) {
                Ok(entries) => entries.iter().map(lsdb_key).collect(),
                Err(_) if enabled.is_empty() => BTreeSet::new(),
                Err(error) => return Err(error),
            };
        drop(state);

        let instances = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_instance().unwrap());
            next_ordered(enabled.iter().copied(), current.as_ref())
                .map(IterKey::Instance)
        };
        let kinds = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_kind().unwrap());
            next_ordered(
                keys.iter().map(|(lsa_type, ..)| *lsa_type),
                current.as_ref(),
            )
            .map(IterKey::Kind)
        };
        let areas = |outer: &[IterKey], current: Option<&IterKey>| {
            let lsa_type = *outer[1].as_kind().unwrap();
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                keys.iter()
                    .filter(|(key_type, ..)| *key_type == lsa_type)
                    .map(|(_, area, ..)| *area),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };
        let lsids = |outer: &[IterKey], current: Option<&IterKey>| {
            let lsa_type = *outer[1].as_kind().unwrap();
            let area = *outer[2].as_addr().unwrap();
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                keys.iter()
                    .filter(|(key_type, key_area, ..)| {
                        *key_type == lsa_type && *key_area == area
                    })
                    .map(|(_, _, lsid, _)| *lsid),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };
        let advs = |outer: &[IterKey], current: Option<&IterKey>| {
            let lsa_type = *outer[1].as_kind().unwrap();
            let area = *outer[2].as_addr().unwrap();
            let lsid = *outer[3].as_addr().unwrap();
            let current = current.map(|key| *key.as_addr().unwrap());
            next_ordered(
                keys.iter()
                    .filter(|(key_type, key_area, key_lsid, _)| {
                        *key_type == lsa_type
                            && *key_area == area
                            && *key_lsid == lsid
                    })
                    .map(|(.., adv)| *adv),
                current.as_ref(),
            )
            .map(IterKey::Addr)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&instances, &kinds, &areas, &lsids, &advs],
            &[
                current.0.map(IterKey::Instance),
                current.1.map(IterKey::Kind),
                current.2.map(IterKey::Addr),
                current.3.map(IterKey::Addr),
                current.4.map(IterKey::Addr),
            ],
        );
        Ok(next.map(|keys| {
            (
                *keys[0].as_instance().unwrap(),
                *keys[1].as_kind().unwrap(),
                *keys[2].as_addr().unwrap(),
                *keys[3].as_addr().unwrap(),
                *keys[4].as_addr().unwrap(),
            )
        }))
    }
}

// ===== impl MasterState =====

impl MasterState {
    pub(crate) fn fetch_router_status(
        &mut self,
    ) -> Result<RouterStatus, Error> {
        let text = self.daemon.show(SHOW_ROUTER)?;
        decode(&text)
    }
}

// ===== helper functions =====

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, Error> {
    serde_json::from_str(text)
        .map_err(|error| Error::InternalAccess(format!("status decode: {error}")))
}

pub(crate) fn fetch_interfaces(
    daemon: &mut dyn DaemonClient,
) -> Result<BTreeMap<u32, InterfaceStatus>, Error> {
    let text = daemon.show(SHOW_INTERFACES)?;
    let doc: InterfaceStatusDoc = decode(&text)?;
    // Only VLAN interfaces are part of the management model.
    Ok(doc
        .interfaces
        .into_iter()
        .filter_map(|(name, status)| {
            crate::southbound::parse_vlan_name(&name)
                .map(|ifindex| (ifindex, status))
        })
        .collect())
}

pub(crate) fn fetch_neighbors(
    daemon: &mut dyn DaemonClient,
) -> Result<BTreeMap<Ipv4Addr, NeighborStatus>, Error> {
    let text = daemon.show(SHOW_NEIGHBORS)?;
    let doc: NeighborStatusDoc = decode(&text)?;
    Ok(doc.neighbors)
}

fn fetch_routes(
    daemon: &mut dyn DaemonClient,
) -> Result<BTreeMap<Ipv4Network, RouteStatus>, Error> {
    let text = daemon.show(SHOW_ROUTES)?;
    let doc: RouteStatusDoc = decode(&text)?;
    Ok(doc.routes)
}

fn fetch_lsdb(
    daemon: &mut dyn DaemonClient,
) -> Result<Vec<LsdbEntry>, Error> {
    let text = daemon.show(SHOW_DATABASE)?;
    let doc: LsdbDoc = decode(&text)?;
    Ok(doc.entries)
}

fn lsdb_key(entry: &LsdbEntry) -> (u8, Ipv4Addr, Ipv4Addr, Ipv4Addr) {
    (
        entry.lsa_type,
        entry.area.unwrap_or(Ipv4Addr::UNSPECIFIED),
        entry.link_state_id,
        entry.adv_router,
    )
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_router_status() {
        let text = r#"{
            "routerId": "1.2.3.4",
            "deferredShutdownMsecs": 2500,
            "areas": {
                "0.0.0.0": { "backbone": true, "interfaceCount": 2 },
                "0.0.0.1": { "fullNeighbors": 1, "spfExecutions": 12 }
            }
        }"#;
        let status: RouterStatus = decode(text).unwrap();
        assert_eq!(status.router_id, "1.2.3.4".parse::<Ipv4Addr>().unwrap());
        assert_eq!(status.deferred_shutdown_msecs, 2500);
        assert!(!status.rfc1583_compatibility);
        assert_eq!(status.areas.len(), 2);
        assert!(status.areas[&Ipv4Addr::UNSPECIFIED].backbone);
        assert_eq!(
            status.areas[&"0.0.0.1".parse().unwrap()].spf_executions,
            12
        );
    }

    #[test]
    fn decode_router_status_requires_router_id() {
        assert!(decode::<RouterStatus>("{}").is_err());
    }

    #[test]
    fn decode_neighbors_and_uptime() {
        let text = r#"{
            "neighbors": {
                "2.2.2.2": {
                    "address": "10.0.0.2",
                    "ifindex": 5,
                    "state": "Full/DR",
                    "priority": 1,
                    "upTime": "04d 02:31:15"
                },
                "3.3.3.3": {
                    "address": "10.0.0.3",
                    "state": "Init"
                }
            }
        }"#;
        let doc: NeighborStatusDoc = decode(text).unwrap();
        let full = &doc.neighbors[&"2.2.2.2".parse().unwrap()];
        assert_eq!(full.up_time_secs(), 354675);
        let init = &doc.neighbors[&"3.3.3.3".parse().unwrap()];
        assert_eq!(init.up_time_secs(), 0);
    }

    #[test]
    fn interface_doc_keeps_vlans_only() {
        let text = r#"{
            "interfaces": {
                "vlan5": { "up": true, "state": "DR", "cost": 10 },
                "eth0": { "up": true, "state": "DR", "cost": 10 }
            }
        }"#;
        let mut daemon = StubDaemon(text.to_owned());
        let interfaces = fetch_interfaces(&mut daemon).unwrap();
        assert_eq!(interfaces.len(), 1);
        assert!(interfaces[&5].up);
    }

    #[test]
    fn lsdb_keying() {
        let entry: LsdbEntry = decode(
            r#"{
                "lsaType": 5,
                "linkStateId": "10.0.0.0",
                "advRouter": "1.1.1.1",
                "age": 60
            }"#,
        )
        .unwrap();
        // External LSAs land under the unspecified area.
        assert_eq!(
            lsdb_key(&entry),
            (
                5,
                Ipv4Addr::UNSPECIFIED,
                "10.0.0.0".parse().unwrap(),
                "1.1.1.1".parse().unwrap()
            )
        );
    }

    struct StubDaemon(String);

    impl DaemonClient for StubDaemon {
        fn running_config(
            &mut self,
        ) -> Result<String, ospfmgr_daemon::client::ClientError> {
            Ok(String::new())
        }

        fn configure(
            &mut self,
            _commands: &[String],
        ) -> Result<(), ospfmgr_daemon::client::ClientError> {
            Ok(())
        }

        fn show(
            &mut self,
            _command: &str,
        ) -> Result<String, ospfmgr_daemon::client::ClientError> {
            Ok(self.0.clone())
        }

        fn reload(
            &mut self,
        ) -> Result<(), ospfmgr_daemon::client::ClientError> {
            Ok(())
        }
    }
}
