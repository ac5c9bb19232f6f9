//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use ospfmgr_daemon::dispatch::{ConfigEvent, ConfigLines};
use ospfmgr_daemon::grammar;
use tracing::debug;

use crate::area::{AreaAuthType, AreaRangeCfg, StubAreaCfg, VirtualLinkCfg};
use crate::interface::{AuthKey, AuthType, DeadInterval, InterfaceCfg};
use crate::master::InstanceId;
use crate::router::{
    DefaultRouteCfg, MetricType, RedistCfg, RedistProtocol, RouterCfg,
};

// Structured snapshot of the daemon's running configuration.
//
// The daemon's text is the authoritative store; this snapshot is rebuilt on
// every read and discarded afterwards. Key material parsed out of the text is
// in plaintext; the facade encrypts it before handing it to callers.
#[derive(Debug, Default)]
pub struct DaemonConfig {
    pub instances: BTreeMap<InstanceId, InstanceConfig>,
    pub interfaces: BTreeMap<u32, InterfaceCfg>,
    pub interface_md5_keys: BTreeMap<(u32, u8), String>,
}

// Configuration of one routing-process instance.
#[derive(Debug, Default)]
pub struct InstanceConfig {
    pub router: RouterCfg,
    pub auth_areas: BTreeMap<Ipv4Addr, AreaAuthType>,
    pub stub_areas: BTreeMap<Ipv4Addr, StubAreaCfg>,
    pub ranges: BTreeMap<(Ipv4Addr, Ipv4Network), AreaRangeCfg>,
    pub vlinks: BTreeMap<(Ipv4Addr, Ipv4Addr), VirtualLinkCfg>,
    pub vlink_md5_keys: BTreeMap<(Ipv4Addr, Ipv4Addr, u8), String>,
}

// ===== global functions =====

// Mode-entering command for a routing-process instance. The first instance
// is the daemon's default process and carries no explicit number.
pub fn router_mode(id: InstanceId) -> String {
    if id == 1 {
        "router ospf".to_owned()
    } else {
        format!("router ospf {id}")
    }
}

pub fn parse_router_name(name: &str) -> Option<InstanceId> {
    if name == "ospf" {
        return Some(1);
    }
    grammar::keyword(name, "ospf")?.parse().ok()
}

pub fn vlan_if_name(ifindex: u32) -> String {
    format!("vlan{ifindex}")
}

pub fn parse_vlan_name(name: &str) -> Option<u32> {
    name.strip_prefix("vlan")?.parse().ok()
}

pub fn parse_running_config(text: &str) -> DaemonConfig {
    let mut config = DaemonConfig::default();
    for event in ConfigLines::new(text) {
        match event {
            ConfigEvent::Router { name, line } => {
                let Some(id) = parse_router_name(name) else {
                    continue;
                };
                let instance = config.instances.entry(id).or_default();
                parse_router_line(instance, line);
            }
            ConfigEvent::Interface { name, line } => {
                let Some(ifindex) = parse_vlan_name(name) else {
                    continue;
                };
                let interface = config.interfaces.entry(ifindex).or_default();
                parse_interface_line(
                    interface,
                    &mut config.interface_md5_keys,
                    ifindex,
                    line,
                );
            }
            _ => (),
        }
    }
    config
}

// ===== helper functions =====

fn parse_router_line(instance: &mut InstanceConfig, line: &str) {
    let router = &mut instance.router;

    if let Some(rest) = grammar::keyword(line, "ospf router-id") {
        router.router_id = rest.parse().ok();
    } else if let Some(rest) = grammar::keyword(line, "default-metric") {
        router.default_metric = rest.parse().ok();
    } else if let Some(rest) = grammar::keyword(line, "redistribute") {
        parse_redistribute(router, rest);
    } else if let Some(rest) =
        grammar::keyword(line, "default-information originate")
    {
        parse_default_route(router, rest);
    } else if let Some(rest) = grammar::keyword(line, "max-metric router-lsa")
    {
        parse_stub_router(router, rest);
    } else if let Some(rest) = grammar::keyword(line, "distance") {
        if let Ok(distance) = rest.parse() {
            router.admin_distance = distance;
        }
    } else if let Some(rest) = grammar::keyword(line, "area") {
        parse_area(instance, rest);
    } else if grammar::keyword(line, "router").is_none() {
        debug!(%line, "unrecognized router command");
    }
}

fn parse_redistribute(router: &mut RouterCfg, rest: &str) {
    let mut words = rest.split_whitespace();
    let Some(protocol) =
        words.next().and_then(RedistProtocol::from_daemon_name)
    else {
        return;
    };

    let mut cfg = RedistCfg::default();
    while let Some(word) = words.next() {
        match word {
            "metric" => {
                cfg.metric = words.next().and_then(|word| word.parse().ok());
            }
            "metric-type" => {
                cfg.metric_type = parse_metric_type(words.next());
            }
            _ => (),
        }
    }
    router.redistribute.insert(protocol, cfg);
}

fn parse_default_route(router: &mut RouterCfg, rest: &str) {
    let mut cfg = DefaultRouteCfg::default();
    let mut words = rest.split_whitespace();
    while let Some(word) = words.next() {
        match word {
            "always" => cfg.always = true,
            "metric" => {
                cfg.metric = words.next().and_then(|word| word.parse().ok());
            }
            "metric-type" => {
                cfg.metric_type = parse_metric_type(words.next());
            }
            _ => (),
        }
    }
    router.default_route = Some(cfg);
}

fn parse_stub_router(router: &mut RouterCfg, rest: &str) {
    let mut words = rest.split_whitespace();
    while let Some(word) = words.next() {
        match word {
            "on-startup" => {
                router.stub_router.on_startup =
                    words.next().and_then(|word| word.parse().ok());
            }
            "on-shutdown" => {
                router.stub_router.on_shutdown =
                    words.next().and_then(|word| word.parse().ok());
            }
            "administrative" => router.stub_router.administrative = true,
            _ => (),
        }
    }
}

fn parse_area(instance: &mut InstanceConfig, rest: &str) {
    let mut words = rest.split_whitespace();
    let Some(area) = words.next().and_then(|word| word.parse().ok()) else {
        return;
    };
    match words.next() {
        Some("authentication") => {
            let auth = match words.next() {
                Some("message-digest") => AreaAuthType::MessageDigest,
                _ => AreaAuthType::SimplePassword,
            };
            instance.auth_areas.insert(area, auth);
        }
        Some("stub") => {
            let no_summary = words.next() == Some("no-summary");
            instance
                .stub_areas
                .insert(area, StubAreaCfg { nssa: false, no_summary });
        }
        Some("nssa") => {
            let no_summary = words.clone().any(|word| word == "no-summary");
            instance
                .stub_areas
                .insert(area, StubAreaCfg { nssa: true, no_summary });
        }
        Some("range") => {
            let Some(net) = words.next().and_then(|word| word.parse().ok())
            else {
                return;
            };
            let mut cfg = AreaRangeCfg::default();
            while let Some(word) = words.next() {
                match word {
                    "not-advertise" => cfg.advertised = false,
                    "cost" => {
                        cfg.cost =
                            words.next().and_then(|word| word.parse().ok());
                    }
                    _ => (),
                }
            }
            instance.ranges.insert((area, net), cfg);
        }
        Some("virtual-link") => {
            let Some(router_id) =
                words.next().and_then(|word| word.parse().ok())
            else {
                return;
            };
            parse_virtual_link(instance, area, router_id, words);
        }
        _ => (),
    }
}

// Virtual-link parameters arrive one per line; the entry is created on the
// first line referencing the (area, router-id) pair.
fn parse_virtual_link<'a>(
    instance: &mut InstanceConfig,
    area: Ipv4Addr,
    router_id: Ipv4Addr,
    mut words: impl Iterator<Item = &'a str>,
) {
    let vlink = instance.vlinks.entry((area, router_id)).or_default();
    while let Some(word) = words.next() {
        match word {
            "hello-interval" => {
                if let Some(value) =
                    words.next().and_then(|word| word.parse().ok())
                {
                    vlink.hello_interval = value;
                }
            }
            "dead-interval" => {
                if let Some(value) =
                    words.next().and_then(|word| word.parse().ok())
                {
                    vlink.dead_interval = value;
                }
            }
            "retransmit-interval" => {
                if let Some(value) =
                    words.next().and_then(|word| word.parse().ok())
                {
                    vlink.retransmit_interval = value;
                }
            }
            "authentication" => {
                vlink.auth_type = match words.next() {
                    Some("message-digest") => AuthType::MessageDigest,
                    Some("null") => AuthType::Null,
                    _ => AuthType::SimplePassword,
                };
            }
            "authentication-key" => {
                if let Some(key) = words.next() {
                    vlink.auth_key =
                        Some(AuthKey::new(key.to_owned(), false));
                }
            }
            "message-digest-key" => {
                let key_id = words.next().and_then(|word| word.parse().ok());
                let key = match words.next() {
                    Some("md5") => words.next(),
                    _ => None,
                };
                if let (Some(key_id), Some(key)) = (key_id, key) {
                    instance
                        .vlink_md5_keys
                        .insert((area, router_id, key_id), key.to_owned());
                }
            }
            _ => (),
        }
    }
}

fn parse_interface_line(
    interface: &mut InterfaceCfg,
    md5_keys: &mut BTreeMap<(u32, u8), String>,
    ifindex: u32,
    line: &str,
) {
    let Some(rest) = grammar::keyword(line, "ip ospf") else {
        return;
    };

    if let Some(rest) = grammar::keyword(rest, "priority") {
        if let Ok(priority) = rest.parse() {
            interface.priority = priority;
        }
    } else if let Some(rest) = grammar::keyword(rest, "cost") {
        interface.cost = rest.parse().ok();
    } else if grammar::keyword(rest, "mtu-ignore").is_some() {
        interface.mtu_ignore = true;
    } else if let Some(rest) = grammar::keyword(rest, "hello-interval") {
        if let Ok(interval) = rest.parse() {
            interface.hello_interval = interval;
        }
    } else if let Some(rest) =
        grammar::keyword(rest, "dead-interval minimal hello-multiplier")
    {
        if let Ok(multiplier) = rest.parse() {
            interface.dead_interval = DeadInterval::Minimal { multiplier };
        }
    } else if let Some(rest) = grammar::keyword(rest, "dead-interval") {
        if let Ok(interval) = rest.parse() {
            interface.dead_interval = DeadInterval::Seconds(interval);
        }
    } else if let Some(rest) = grammar::keyword(rest, "retransmit-interval") {
        if let Ok(interval) = rest.parse() {
            interface.retransmit_interval = interval;
        }
    } else if let Some(rest) = grammar::keyword(rest, "authentication-key") {
        if let Some(key) = rest.split_whitespace().next() {
            interface.auth_key = Some(AuthKey::new(key.to_owned(), false));
        }
    } else if let Some(rest) = grammar::keyword(rest, "authentication") {
        interface.auth_type = match rest.split_whitespace().next() {
            Some("message-digest") => AuthType::MessageDigest,
            Some("null") => AuthType::Null,
            _ => AuthType::SimplePassword,
        };
    } else if let Some(rest) = grammar::keyword(rest, "message-digest-key") {
        let mut words = rest.split_whitespace();
        let key_id = words.next().and_then(|word| word.parse().ok());
        let key = match words.next() {
            Some("md5") => words.next(),
            _ => None,
        };
        if let (Some(key_id), Some(key)) = (key_id, key) {
            md5_keys.insert((ifindex, key_id), key.to_owned());
        }
    }
}

fn parse_metric_type(word: Option<&str>) -> MetricType {
    match word {
        Some("1") => MetricType::Type1,
        _ => MetricType::Type2,
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names() {
        assert_eq!(router_mode(1), "router ospf");
        assert_eq!(router_mode(3), "router ospf 3");
        assert_eq!(parse_router_name("ospf"), Some(1));
        assert_eq!(parse_router_name("ospf 3"), Some(3));
        assert_eq!(parse_router_name("bgp"), None);
        assert_eq!(parse_vlan_name("vlan42"), Some(42));
        assert_eq!(parse_vlan_name("eth0"), None);
    }

    #[test]
    fn parses_router_section() {
        let text = "\
!
router ospf
 ospf router-id 10.0.0.1
 default-metric 50
 redistribute connected metric 20 metric-type 1
 redistribute static
 default-information originate always metric 30
 max-metric router-lsa on-shutdown 300
 distance 120
 area 0.0.0.0 authentication message-digest
 area 0.0.0.1 authentication
 area 0.0.0.1 stub no-summary
 area 0.0.0.2 nssa
 area 0.0.0.1 range 192.168.0.0/16 cost 100
 area 0.0.0.3 virtual-link 2.2.2.2
 area 0.0.0.3 virtual-link 2.2.2.2 hello-interval 5
 area 0.0.0.3 virtual-link 2.2.2.2 authentication message-digest
 area 0.0.0.3 virtual-link 2.2.2.2 message-digest-key 1 md5 secret
";
        let config = parse_running_config(text);
        let instance = &config.instances[&1];
        let router = &instance.router;

        assert_eq!(router.router_id, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(router.default_metric, Some(50));
        assert_eq!(router.admin_distance, 120);
        assert_eq!(router.stub_router.on_shutdown, Some(300));
        assert_eq!(router.stub_router.on_startup, None);

        let connected = &router.redistribute[&RedistProtocol::Connected];
        assert_eq!(connected.metric, Some(20));
        assert_eq!(connected.metric_type, MetricType::Type1);
        let r#static = &router.redistribute[&RedistProtocol::Static];
        assert_eq!(r#static.metric, None);
        assert_eq!(r#static.metric_type, MetricType::Type2);

        let default_route = router.default_route.as_ref().unwrap();
        assert!(default_route.always);
        assert_eq!(default_route.metric, Some(30));

        assert_eq!(
            instance.auth_areas[&"0.0.0.0".parse().unwrap()],
            AreaAuthType::MessageDigest
        );
        assert_eq!(
            instance.auth_areas[&"0.0.0.1".parse().unwrap()],
            AreaAuthType::SimplePassword
        );

        let stub = &instance.stub_areas[&"0.0.0.1".parse().unwrap()];
        assert!(!stub.nssa && stub.no_summary);
        let nssa = &instance.stub_areas[&"0.0.0.2".parse().unwrap()];
        assert!(nssa.nssa && !nssa.no_summary);

        let range = &instance.ranges[&(
            "0.0.0.1".parse().unwrap(),
            "192.168.0.0/16".parse().unwrap(),
        )];
        assert!(range.advertised);
        assert_eq!(range.cost, Some(100));

        let vlink_key =
            ("0.0.0.3".parse().unwrap(), "2.2.2.2".parse().unwrap());
        let vlink = &instance.vlinks[&vlink_key];
        assert_eq!(vlink.hello_interval, 5);
        assert_eq!(vlink.dead_interval, 40);
        assert_eq!(vlink.auth_type, AuthType::MessageDigest);
        assert_eq!(
            instance.vlink_md5_keys
                [&(vlink_key.0, vlink_key.1, 1)],
            "secret"
        );
    }

    #[test]
    fn parses_interface_section() {
        let text = "\
interface vlan5
 ip ospf priority 200
 ip ospf cost 17
 ip ospf mtu-ignore
 ip ospf dead-interval minimal hello-multiplier 4
 ip ospf authentication message-digest
 ip ospf message-digest-key 3 md5 hush
interface eth0
 ip ospf cost 1
";
        let config = parse_running_config(text);
        let interface = &config.interfaces[&5];

        assert_eq!(interface.priority, 200);
        assert_eq!(interface.cost, Some(17));
        assert!(interface.mtu_ignore);
        assert_eq!(
            interface.dead_interval,
            DeadInterval::Minimal { multiplier: 4 }
        );
        assert_eq!(interface.auth_type, AuthType::MessageDigest);
        assert_eq!(config.interface_md5_keys[&(5, 3)], "hush");
        // Non-VLAN interfaces are not ours to manage.
        assert_eq!(config.interfaces.len(), 1);
    }

    #[test]
    fn second_instance_is_separate() {
        let text = "\
router ospf
 ospf router-id 1.1.1.1
router ospf 2
 ospf router-id 2.2.2.2
";
        let config = parse_running_config(text);
        assert_eq!(
            config.instances[&1].router.router_id,
            Some("1.1.1.1".parse().unwrap())
        );
        assert_eq!(
            config.instances[&2].router.router_id,
            Some("2.2.2.2".parse().unwrap())
        );
    }
}
