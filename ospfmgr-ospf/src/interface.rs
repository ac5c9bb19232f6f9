//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use derive_new::new;
use ospfmgr_utils::secret::SecretCodec;

use crate::error::Error;
use crate::master::{IterKey, Master, next_ordered};
use crate::southbound;

pub const PRIORITY_DEFAULT: u8 = 1;
pub const COST_MIN: u32 = 1;
pub const COST_MAX: u32 = 65535;
pub const HELLO_INTERVAL_MIN: u32 = 1;
pub const HELLO_INTERVAL_MAX: u32 = 65535;
pub const HELLO_INTERVAL_DEFAULT: u32 = 10;
pub const DEAD_INTERVAL_MIN: u32 = 1;
pub const DEAD_INTERVAL_MAX: u32 = 65535;
pub const DEAD_INTERVAL_DEFAULT: u32 = 40;
pub const FAST_HELLO_MULTIPLIER_MIN: u32 = 1;
pub const FAST_HELLO_MULTIPLIER_MAX: u32 = 10;
pub const RETRANSMIT_INTERVAL_MIN: u32 = 3;
pub const RETRANSMIT_INTERVAL_MAX: u32 = 65535;
pub const RETRANSMIT_INTERVAL_DEFAULT: u32 = 5;

pub const SIMPLE_KEY_MAX_LEN: usize = 8;
pub const MD5_KEY_MAX_LEN: usize = 16;
pub const MD5_KEY_ID_MIN: u8 = 1;

// Authentication mode of an interface or virtual link.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AuthType {
    // Follow the area's authentication configuration.
    #[default]
    AreaDefault,
    Null,
    SimplePassword,
    MessageDigest,
}

// Authentication key material crossing the management API.
//
// On the way in a key may be plaintext or encrypted; on the way out it is
// always encrypted.
#[derive(Clone, Debug, Eq, PartialEq, new)]
pub struct AuthKey {
    pub key: String,
    pub is_encrypted: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthKeyKind {
    SimplePassword,
    Md5Digest,
}

// Neighbor-loss detection: either a plain dead interval in seconds, or
// sub-second hellos with the dead interval pinned at one second.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeadInterval {
    Seconds(u32),
    Minimal { multiplier: u32 },
}

// Per-VLAN-interface protocol configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfaceCfg {
    pub priority: u8,
    // `None` selects the cost derived from the interface bandwidth.
    pub cost: Option<u32>,
    pub mtu_ignore: bool,
    pub hello_interval: u32,
    pub dead_interval: DeadInterval,
    pub retransmit_interval: u32,
    pub auth_type: AuthType,
    pub auth_key: Option<AuthKey>,
}

// ===== impl Default for InterfaceCfg =====

impl Default for InterfaceCfg {
    fn default() -> InterfaceCfg {
        InterfaceCfg {
            priority: PRIORITY_DEFAULT,
            cost: None,
            mtu_ignore: false,
            hello_interval: HELLO_INTERVAL_DEFAULT,
            dead_interval: DeadInterval::Seconds(DEAD_INTERVAL_DEFAULT),
            retransmit_interval: RETRANSMIT_INTERVAL_DEFAULT,
            auth_type: AuthType::AreaDefault,
            auth_key: None,
        }
    }
}

// ===== impl Master =====

impl Master {
    pub fn interface_cfg_default(&self) -> InterfaceCfg {
        InterfaceCfg::default()
    }

    pub fn interface_cfg_get(
        &self,
        ifindex: u32,
    ) -> Result<InterfaceCfg, Error> {
        let mut state = self.lock();
        state.require_vlan(ifindex)?;
        let config = state.fetch_config()?;
        let mut cfg = config
            .interfaces
            .get(&ifindex)
            .cloned()
            .unwrap_or_default();
        if let Some(key) = cfg.auth_key.take() {
            cfg.auth_key = Some(encrypted_key(&state.codec, &key.key)?);
        }
        Ok(cfg)
    }

    pub fn interface_cfg_set(
        &self,
        ifindex: u32,
        cfg: &InterfaceCfg,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_vlan(ifindex)?;
        validate_interface_cfg(cfg)?;
        let plain_key = cfg
            .auth_key
            .as_ref()
            .map(|key| {
                plaintext_key(&state.codec, AuthKeyKind::SimplePassword, key)
            })
            .transpose()?;

        let config = state.fetch_config()?;
        let current = config
            .interfaces
            .get(&ifindex)
            .cloned()
            .unwrap_or_default();

        let mut commands = vec![format!(
            "interface {}",
            southbound::vlan_if_name(ifindex)
        )];
        if cfg.priority != current.priority {
            commands.push(format!("ip ospf priority {}", cfg.priority));
        }
        if cfg.cost != current.cost {
            match cfg.cost {
                Some(cost) => commands.push(format!("ip ospf cost {cost}")),
                None => commands.push("no ip ospf cost".to_owned()),
            }
        }
        if cfg.mtu_ignore != current.mtu_ignore {
            if cfg.mtu_ignore {
                commands.push("ip ospf mtu-ignore".to_owned());
            } else {
                commands.push("no ip ospf mtu-ignore".to_owned());
            }
        }
        if cfg.hello_interval != current.hello_interval {
            commands
                .push(format!("ip ospf hello-interval {}", cfg.hello_interval));
        }
        if cfg.dead_interval != current.dead_interval {
            match cfg.dead_interval {
                DeadInterval::Seconds(interval) => commands
                    .push(format!("ip ospf dead-interval {interval}")),
                DeadInterval::Minimal { multiplier } => commands.push(format!(
                    "ip ospf dead-interval minimal hello-multiplier \
                     {multiplier}"
                )),
            }
        }
        if cfg.retransmit_interval != current.retransmit_interval {
            commands.push(format!(
                "ip ospf retransmit-interval {}",
                cfg.retransmit_interval
            ));
        }
        if cfg.auth_type != current.auth_type {
            commands.push(match cfg.auth_type {
                AuthType::AreaDefault => "no ip ospf authentication",
                AuthType::Null => "ip ospf authentication null",
                AuthType::SimplePassword => "ip ospf authentication",
                AuthType::MessageDigest => "ip ospf authentication \
                                            message-digest",
            }
            .to_owned());
        }
        let current_key = current.auth_key.map(|key| key.key);
        if plain_key != current_key {
            match &plain_key {
                Some(key) => commands
                    .push(format!("ip ospf authentication-key {key}")),
                None => {
                    commands.push("no ip ospf authentication-key".to_owned())
                }
            }
        }

        if commands.len() > 1 {
            state.daemon.configure(&commands)?;
        }
        Ok(())
    }

    // Adding the identical key again is a no-op; a different key under the
    // same ID must be deleted first.
    pub fn interface_md5_key_add(
        &self,
        ifindex: u32,
        key_id: u8,
        key: &AuthKey,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_vlan(ifindex)?;
        validate_md5_key_id(key_id)?;
        let plain = plaintext_key(&state.codec, AuthKeyKind::Md5Digest, key)?;

        let config = state.fetch_config()?;
        if let Some(current) = config.interface_md5_keys.get(&(ifindex, key_id))
        {
            if *current == plain {
                return Ok(());
            }
            return Err(Error::EntryAlreadyExists);
        }

        state.daemon.configure(&[
            format!("interface {}", southbound::vlan_if_name(ifindex)),
            format!("ip ospf message-digest-key {key_id} md5 {plain}"),
        ])?;
        Ok(())
    }

    pub fn interface_md5_key_del(
        &self,
        ifindex: u32,
        key_id: u8,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.require_vlan(ifindex)?;
        validate_md5_key_id(key_id)?;

        let config = state.fetch_config()?;
        if !config.interface_md5_keys.contains_key(&(ifindex, key_id)) {
            return Ok(());
        }

        state.daemon.configure(&[
            format!("interface {}", southbound::vlan_if_name(ifindex)),
            format!("no ip ospf message-digest-key {key_id}"),
        ])?;
        Ok(())
    }

    pub fn interface_md5_key_get(
        &self,
        ifindex: u32,
        key_id: u8,
    ) -> Result<AuthKey, Error> {
        let mut state = self.lock();
        state.require_vlan(ifindex)?;
        validate_md5_key_id(key_id)?;

        let config = state.fetch_config()?;
        let plain = config
            .interface_md5_keys
            .get(&(ifindex, key_id))
            .ok_or(Error::EntryNotFound)?;
        encrypted_key(&state.codec, plain)
    }

    pub fn interface_md5_key_iter(
        &self,
        current: (Option<u32>, Option<u8>),
    ) -> Result<Option<(u32, u8)>, Error> {
        let mut state = self.lock();
        let config = state.fetch_config()?;
        let keys = &config.interface_md5_keys;

        let ifindexes = |_: &[IterKey], current: Option<&IterKey>| {
            let current = current.map(|key| *key.as_ifindex().unwrap());
            next_ordered(
                keys.keys().map(|(ifindex, _)| *ifindex),
                current.as_ref(),
            )
            .map(IterKey::Ifindex)
        };
        let key_ids = |outer: &[IterKey], current: Option<&IterKey>| {
            let ifindex = *outer[0].as_ifindex().unwrap();
            let current = current.map(|key| *key.as_key_id().unwrap());
            next_ordered(
                keys.keys()
                    .filter(|(index, _)| *index == ifindex)
                    .map(|(_, key_id)| *key_id),
                current.as_ref(),
            )
            .map(IterKey::KeyId)
        };

        let next = ospfmgr_utils::nextkey::next_tuple(
            &[&ifindexes, &key_ids],
            &[
                current.0.map(IterKey::Ifindex),
                current.1.map(IterKey::KeyId),
            ],
        );
        Ok(next.map(|keys| {
            (*keys[0].as_ifindex().unwrap(), *keys[1].as_key_id().unwrap())
        }))
    }
}

// ===== impl MasterState =====

impl crate::master::MasterState {
    pub(crate) fn require_vlan(&self, ifindex: u32) -> Result<(), Error> {
        if !self.oracle.exists(ifindex) || !self.oracle.is_vlan(ifindex) {
            return Err(Error::InvalidArgument("ifindex"));
        }
        Ok(())
    }
}

// ===== global functions =====

pub(crate) fn validate_interface_cfg(cfg: &InterfaceCfg) -> Result<(), Error> {
    if let Some(cost) = cfg.cost
        && !(COST_MIN..=COST_MAX).contains(&cost)
    {
        return Err(Error::InvalidArgument("cost"));
    }
    if !(HELLO_INTERVAL_MIN..=HELLO_INTERVAL_MAX)
        .contains(&cfg.hello_interval)
    {
        return Err(Error::InvalidArgument("hello interval"));
    }
    match cfg.dead_interval {
        DeadInterval::Seconds(interval) => {
            if !(DEAD_INTERVAL_MIN..=DEAD_INTERVAL_MAX).contains(&interval) {
                return Err(Error::InvalidArgument("dead interval"));
            }
        }
        DeadInterval::Minimal { multiplier } => {
            if !(FAST_HELLO_MULTIPLIER_MIN..=FAST_HELLO_MULTIPLIER_MAX)
                .contains(&multiplier)
            {
                return Err(Error::InvalidArgument("hello multiplier"));
            }
        }
    }
    if !(RETRANSMIT_INTERVAL_MIN..=RETRANSMIT_INTERVAL_MAX)
        .contains(&cfg.retransmit_interval)
    {
        return Err(Error::InvalidArgument("retransmit interval"));
    }
    Ok(())
}

pub(crate) fn validate_md5_key_id(key_id: u8) -> Result<(), Error> {
    if key_id < MD5_KEY_ID_MIN {
        return Err(Error::InvalidArgument("key id"));
    }
    Ok(())
}

// Resolves the inbound key to plaintext and validates it against the
// length and character rules of its kind.
pub(crate) fn plaintext_key(
    codec: &SecretCodec,
    kind: AuthKeyKind,
    key: &AuthKey,
) -> Result<String, Error> {
    let max_len = match kind {
        AuthKeyKind::SimplePassword => SIMPLE_KEY_MAX_LEN,
        AuthKeyKind::Md5Digest => MD5_KEY_MAX_LEN,
    };
    let plain = if key.is_encrypted {
        codec.decrypt(&key.key, max_len + 1)?
    } else {
        key.key.clone()
    };
    if plain.is_empty()
        || !plain.bytes().all(|byte| byte.is_ascii_graphic())
    {
        return Err(Error::KeyInvalidFormat);
    }
    if plain.len() > max_len {
        return Err(Error::KeyTooLong);
    }
    Ok(plain)
}

// Encrypts a plaintext key recovered from the daemon for the outbound
// direction.
pub(crate) fn encrypted_key(
    codec: &SecretCodec,
    plain: &str,
) -> Result<AuthKey, Error> {
    let cipher = codec
        .encrypt(plain, plain.len() + 1)
        .map_err(|_| Error::InternalError("key encryption"))?;
    Ok(AuthKey::new(cipher, true))
}

// ===== tests =====
