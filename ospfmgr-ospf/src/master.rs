//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use enum_as_inner::EnumAsInner;
use ipnetwork::Ipv4Network;
use ospfmgr_daemon::client::DaemonClient;
use ospfmgr_utils::cache::CachedResult;
use ospfmgr_utils::secret::SecretCodec;
use tracing::{debug, info};

use crate::error::Error;
use crate::southbound;
use crate::status::{InterfaceStatus, NeighborStatus};

pub type InstanceId = u32;

pub const INSTANCE_ID_MIN: InstanceId = 1;
pub const INSTANCE_ID_MAX: InstanceId = 15;

// The backbone area is distinguished: it cannot be a stub/NSSA area and
// cannot host virtual links.
pub const BACKBONE_AREA: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

// Upper bound on how long an instance delete may wait for the daemon's
// deferred-shutdown countdown.
const DEFERRED_SHUTDOWN_CAP_MSECS: u64 = 100_000;

// Oracle for VLAN/IP-interface existence. Interface addressing is owned
// elsewhere; the management layer only needs existence and kind checks.
pub trait VlanOracle: Send {
    fn exists(&self, ifindex: u32) -> bool;
    fn is_vlan(&self, ifindex: u32) -> bool;
}

// Operator console broadcast, used for the deferred-shutdown notices. All
// other diagnostics go through `tracing`.
pub trait NotifySink: Send + Sync {
    fn notify(&self, message: &str);
}

// Key of one level in a composite iteration tuple.
#[derive(Clone, Copy, Debug, EnumAsInner, Eq, Ord, PartialEq, PartialOrd)]
pub enum IterKey {
    Instance(InstanceId),
    Addr(Ipv4Addr),
    Net(Ipv4Network),
    Ifindex(u32),
    KeyId(u8),
    Kind(u8),
}

// Management-plane master.
//
// Owns all mutable state behind one coarse lock. Public entry points hold
// the lock for their entire body, except the deferred-shutdown sleep, which
// runs unlocked. Internal helpers take `&mut MasterState`, which can only be
// obtained from the lock, so "must be called locked" is enforced by the
// compiler rather than a runtime assertion.
pub struct Master {
    state: Mutex<MasterState>,
    notify: Box<dyn NotifySink>,
}

pub struct MasterState {
    pub(crate) daemon: Box<dyn DaemonClient>,
    pub(crate) oracle: Box<dyn VlanOracle>,
    pub(crate) codec: SecretCodec,
    // Enabled routing-process instances; the locally cached view of the
    // daemon's configured instances, rebuilt by `init` and kept in sync on
    // add/del.
    pub(crate) enabled: BTreeSet<InstanceId>,
    // Per-request status caches (see ospfmgr_utils::cache); never held
    // across independent public calls.
    pub(crate) neighbors_cache:
        CachedResult<BTreeMap<Ipv4Addr, NeighborStatus>, Error>,
    pub(crate) interfaces_cache:
        CachedResult<BTreeMap<u32, InterfaceStatus>, Error>,
}

// ===== impl Master =====

impl Master {
    pub fn new(
        daemon: Box<dyn DaemonClient>,
        oracle: Box<dyn VlanOracle>,
        notify: Box<dyn NotifySink>,
        passphrase: &str,
    ) -> Master {
        Master {
            state: Mutex::new(MasterState {
                daemon,
                oracle,
                codec: SecretCodec::new(passphrase),
                enabled: BTreeSet::new(),
                neighbors_cache: CachedResult::new(),
                interfaces_cache: CachedResult::new(),
            }),
            notify,
        }
    }

    // Rebuilds the enabled-instance registry from the daemon's running
    // configuration. Called at startup and after a defaults restore.
    pub fn init(&self) -> Result<(), Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;
        state.enabled = config
            .instances
            .keys()
            .copied()
            .filter(|id| instance_id_valid(*id))
            .collect();
        debug!(instances = %state.enabled.len(), "registry initialized");
        Ok(())
    }

    // Asks the daemon to reload its configuration from scratch, then
    // rebuilds the registry from the result.
    pub fn reload(&self) -> Result<(), Error> {
        {
            let mut state = self.lock();
            state.daemon.reload()?;
        }
        self.init()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MasterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Enables a routing-process instance. Enabling an already enabled
    // instance is a no-op success.
    pub fn instance_add(&self, id: InstanceId) -> Result<(), Error> {
        let mut state = self.lock();
        validate_instance_id(id)?;
        if state.enabled.contains(&id) {
            return Ok(());
        }

        // While the daemon is still advertising maximal cost after a delete,
        // the process cannot be re-enabled. Status errors are ignored here:
        // with no instance enabled the daemon may be unreachable.
        if let Ok(status) = state.fetch_router_status()
            && status.deferred_shutdown_msecs > 0
        {
            return Err(Error::DeferredShutdownInProgress);
        }

        state.daemon.configure(&[southbound::router_mode(id)])?;
        state.enabled.insert(id);
        Ok(())
    }

    // Disables a routing-process instance. Idempotent. When the daemon
    // reports a nonzero deferred-shutdown countdown, the call emits a start
    // notice, waits out the countdown unlocked, and emits a completion
    // notice before returning.
    pub fn instance_del(&self, id: InstanceId) -> Result<(), Error> {
        let countdown = {
            let mut state = self.lock();
            validate_instance_id(id)?;
            if !state.enabled.contains(&id) {
                return Ok(());
            }

            state
                .daemon
                .configure(&[format!("no {}", southbound::router_mode(id))])?;
            state.enabled.remove(&id);

            // The instance keeps advertising for the daemon-reported
            // remaining time when stub-router on-shutdown is configured.
            state
                .fetch_router_status()
                .map(|status| status.deferred_shutdown_msecs)
                .unwrap_or(0)
        };

        if countdown > 0 {
            self.notify.notify(&format!(
                "Deferred shutdown in progress, {countdown} ms remaining."
            ));
            info!(%id, %countdown, "deferred shutdown started");
            std::thread::sleep(Duration::from_millis(
                countdown.min(DEFERRED_SHUTDOWN_CAP_MSECS),
            ));
            self.notify.notify("OSPF router is disabled.");
            info!(%id, "deferred shutdown completed");
        }
        Ok(())
    }

    // Succeeds when the instance is enabled.
    pub fn instance_get(&self, id: InstanceId) -> Result<(), Error> {
        let state = self.lock();
        validate_instance_id(id)?;
        if state.enabled.contains(&id) {
            Ok(())
        } else {
            Err(Error::EntryNotFound)
        }
    }

    // Get-next over enabled instances.
    pub fn instance_iter(
        &self,
        current: Option<InstanceId>,
    ) -> Option<InstanceId> {
        let state = self.lock();
        next_ordered(state.enabled.iter().copied(), current.as_ref())
    }
}

// ===== impl MasterState =====

impl MasterState {
    // Re-parses the daemon's full running configuration. Every structured
    // read starts here; there is no daemon-side push notification.
    pub(crate) fn fetch_config(
        &mut self,
    ) -> Result<southbound::DaemonConfig, Error> {
        let text = self.daemon.running_config()?;
        Ok(southbound::parse_running_config(&text))
    }

    pub(crate) fn require_enabled(&self, id: InstanceId) -> Result<(), Error> {
        validate_instance_id(id)?;
        if !self.enabled.contains(&id) {
            return Err(Error::EntryNotFound);
        }
        Ok(())
    }
}

// ===== global functions =====

pub(crate) fn instance_id_valid(id: InstanceId) -> bool {
    id >= INSTANCE_ID_MIN && id <= INSTANCE_ID_MAX
}

pub(crate) fn validate_instance_id(id: InstanceId) -> Result<(), Error> {
    if !instance_id_valid(id) {
        return Err(Error::InvalidArgument("instance id"));
    }
    Ok(())
}

// First key from an ascending iterator strictly greater than `current`, or
// the first key at all when `current` is `None`.
pub(crate) fn next_ordered<K: Ord>(
    keys: impl IntoIterator<Item = K>,
    current: Option<&K>,
) -> Option<K> {
    keys.into_iter()
        .find(|key| current.is_none_or(|current| key > current))
}
