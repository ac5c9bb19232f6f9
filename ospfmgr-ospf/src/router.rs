//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::error::Error;
use crate::master::{InstanceId, Master};
use crate::southbound;

pub const ADMIN_DISTANCE_MIN: u8 = 1;
pub const ADMIN_DISTANCE_DEFAULT: u8 = 110;
pub const REDIST_METRIC_MAX: u32 = 16_777_214;
pub const STUB_ROUTER_INTERVAL_MIN: u32 = 5;
pub const STUB_ROUTER_INTERVAL_MAX: u32 = 86_400;

// Route sources that can be redistributed into the routing process.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum RedistProtocol {
    Connected,
    Static,
    Rip,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MetricType {
    Type1,
    #[default]
    Type2,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RedistCfg {
    pub metric_type: MetricType,
    // `None` selects the daemon's protocol-dependent default metric.
    pub metric: Option<u32>,
}

// Origination of a default external route.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DefaultRouteCfg {
    // Originate even when no default route is present in the routing table.
    pub always: bool,
    pub metric: Option<u32>,
    pub metric_type: MetricType,
}

// Max-metric router-LSA advertisement ("stub router"). On-shutdown is the
// source of the deferred-shutdown countdown observed on instance delete.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StubRouterCfg {
    pub on_startup: Option<u32>,
    pub on_shutdown: Option<u32>,
    pub administrative: bool,
}

// Per-instance router configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouterCfg {
    pub router_id: Option<Ipv4Addr>,
    pub default_metric: Option<u32>,
    pub redistribute: BTreeMap<RedistProtocol, RedistCfg>,
    pub default_route: Option<DefaultRouteCfg>,
    pub stub_router: StubRouterCfg,
    pub admin_distance: u8,
}

// ===== impl RedistProtocol =====

impl RedistProtocol {
    pub const ALL: [RedistProtocol; 3] = [
        RedistProtocol::Connected,
        RedistProtocol::Static,
        RedistProtocol::Rip,
    ];

    pub(crate) fn daemon_name(&self) -> &'static str {
        match self {
            RedistProtocol::Connected => "connected",
            RedistProtocol::Static => "static",
            RedistProtocol::Rip => "rip",
        }
    }

    pub(crate) fn from_daemon_name(name: &str) -> Option<RedistProtocol> {
        RedistProtocol::ALL
            .into_iter()
            .find(|protocol| protocol.daemon_name() == name)
    }
}

// ===== impl Default for RouterCfg =====

impl Default for RouterCfg {
    fn default() -> RouterCfg {
        RouterCfg {
            router_id: None,
            default_metric: None,
            redistribute: BTreeMap::new(),
            default_route: None,
            stub_router: StubRouterCfg::default(),
            admin_distance: ADMIN_DISTANCE_DEFAULT,
        }
    }
}

// ===== impl Master =====

impl Master {
    pub fn router_cfg_default(&self) -> RouterCfg {
        RouterCfg::default()
    }

    pub fn router_cfg_get(&self, id: InstanceId) -> Result<RouterCfg, Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        let config = state.fetch_config()?;
        Ok(config
            .instances
            .get(&id)
            .map(|instance| instance.router.clone())
            .unwrap_or_default())
    }

    // Applies the differences between `cfg` and the daemon's current router
    // configuration, one command per changed leaf, stopping at the first
    // rejected command. A router-id change under live adjacencies is accepted
    // by the daemon but only takes effect later; that case is reported as an
    // error after the configuration has been applied.
    pub fn router_cfg_set(
        &self,
        id: InstanceId,
        cfg: &RouterCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_enabled(id)?;
        validate_router_cfg(cfg)?;

        let config = state.fetch_config()?;
        let current = config
            .instances
            .get(&id)
            .map(|instance| instance.router.clone())
            .unwrap_or_default();

        let mut commands = vec![southbound::router_mode(id)];
        if cfg.router_id != current.router_id {
            match cfg.router_id {
                Some(router_id) => {
                    commands.push(format!("ospf router-id {router_id}"))
                }
                None => commands.push("no ospf router-id".to_owned()),
            }
        }
        if cfg.default_metric != current.default_metric {
            match cfg.default_metric {
                Some(metric) => {
                    commands.push(format!("default-metric {metric}"))
                }
                None => commands.push("no default-metric".to_owned()),
            }
        }
        for protocol in RedistProtocol::ALL {
            let desired = cfg.redistribute.get(&protocol);
            if desired == current.redistribute.get(&protocol) {
                continue;
            }
            match desired {
                Some(redist) => {
                    let mut command =
                        format!("redistribute {}", protocol.daemon_name());
                    if let Some(metric) = redist.metric {
                        command.push_str(&format!(" metric {metric}"));
                    }
                    if redist.metric_type == MetricType::Type1 {
                        command.push_str(" metric-type 1");
                    }
                    commands.push(command);
                }
                None => commands.push(format!(
                    "no redistribute {}",
                    protocol.daemon_name()
                )),
            }
        }
        if cfg.default_route != current.default_route {
            match cfg.default_route {
                Some(route) => {
                    let mut command =
                        "default-information originate".to_owned();
                    if route.always {
                        command.push_str(" always");
                    }
                    if let Some(metric) = route.metric {
                        command.push_str(&format!(" metric {metric}"));
                    }
                    if route.metric_type == MetricType::Type1 {
                        command.push_str(" metric-type 1");
                    }
                    commands.push(command);
                }
                None => commands
                    .push("no default-information originate".to_owned()),
            }
        }
        if cfg.stub_router.on_startup != current.stub_router.on_startup {
            match cfg.stub_router.on_startup {
                Some(interval) => commands.push(format!(
                    "max-metric router-lsa on-startup {interval}"
                )),
                None => commands
                    .push("no max-metric router-lsa on-startup".to_owned()),
            }
        }
        if cfg.stub_router.on_shutdown != current.stub_router.on_shutdown {
            match cfg.stub_router.on_shutdown {
                Some(interval) => commands.push(format!(
                    "max-metric router-lsa on-shutdown {interval}"
                )),
                None => commands
                    .push("no max-metric router-lsa on-shutdown".to_owned()),
            }
        }
        if cfg.stub_router.administrative != current.stub_router.administrative
        {
            if cfg.stub_router.administrative {
                commands
                    .push("max-metric router-lsa administrative".to_owned());
            } else {
                commands.push(
                    "no max-metric router-lsa administrative".to_owned(),
                );
            }
        }
        if cfg.admin_distance != current.admin_distance {
            commands.push(format!("distance {}", cfg.admin_distance));
        }

        if commands.len() == 1 {
            return Ok(());
        }
        state.daemon.configure(&commands)?;

        // Report a pending router-id change. The new value stays configured
        // either way; the daemon switches over once all adjacencies are down.
        if let Some(router_id) = cfg.router_id
            && cfg.router_id != current.router_id
            && let Ok(status) = state.fetch_router_status()
            && status.router_id != router_id
        {
            return Err(Error::RouterIdChangeNotEffective);
        }
        Ok(())
    }
}

// ===== global functions =====

pub(crate) fn validate_router_cfg(cfg: &RouterCfg) -> Result<(), Error> {
    if cfg.router_id == Some(Ipv4Addr::UNSPECIFIED) {
        return Err(Error::InvalidArgument("router id"));
    }
    if let Some(metric) = cfg.default_metric
        && metric > REDIST_METRIC_MAX
    {
        return Err(Error::InvalidArgument("default metric"));
    }
    for redist in cfg.redistribute.values() {
        if let Some(metric) = redist.metric
            && metric > REDIST_METRIC_MAX
        {
            return Err(Error::InvalidArgument("redistribute metric"));
        }
    }
    if let Some(route) = &cfg.default_route
        && let Some(metric) = route.metric
        && metric > REDIST_METRIC_MAX
    {
        return Err(Error::InvalidArgument("default route metric"));
    }
    for interval in [cfg.stub_router.on_startup, cfg.stub_router.on_shutdown]
        .into_iter()
        .flatten()
    {
        if !(STUB_ROUTER_INTERVAL_MIN..=STUB_ROUTER_INTERVAL_MAX)
            .contains(&interval)
        {
            return Err(Error::InvalidArgument("stub router interval"));
        }
    }
    if cfg.admin_distance < ADMIN_DISTANCE_MIN {
        return Err(Error::InvalidArgument("administrative distance"));
    }
    Ok(())
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RouterCfg::default();
        assert_eq!(cfg.admin_distance, 110);
        assert!(cfg.router_id.is_none());
        assert!(cfg.redistribute.is_empty());
        assert!(validate_router_cfg(&cfg).is_ok());
    }

    #[test]
    fn validation() {
        let mut cfg = RouterCfg::default();

        cfg.router_id = Some(Ipv4Addr::UNSPECIFIED);
        assert_eq!(
            validate_router_cfg(&cfg),
            Err(Error::InvalidArgument("router id"))
        );
        cfg.router_id = Some("10.0.0.1".parse().unwrap());
        assert!(validate_router_cfg(&cfg).is_ok());

        cfg.default_metric = Some(REDIST_METRIC_MAX + 1);
        assert_eq!(
            validate_router_cfg(&cfg),
            Err(Error::InvalidArgument("default metric"))
        );
        cfg.default_metric = Some(REDIST_METRIC_MAX);
        assert!(validate_router_cfg(&cfg).is_ok());

        cfg.stub_router.on_shutdown = Some(4);
        assert_eq!(
            validate_router_cfg(&cfg),
            Err(Error::InvalidArgument("stub router interval"))
        );
        cfg.stub_router.on_shutdown = Some(5);
        assert!(validate_router_cfg(&cfg).is_ok());

        cfg.admin_distance = 0;
        assert_eq!(
            validate_router_cfg(&cfg),
            Err(Error::InvalidArgument("administrative distance"))
        );
    }

    #[test]
    fn protocol_names() {
        for protocol in RedistProtocol::ALL {
            assert_eq!(
                RedistProtocol::from_daemon_name(protocol.daemon_name()),
                Some(protocol)
            );
        }
        assert_eq!(RedistProtocol::from_daemon_name("bgp"), None);
    }
}
