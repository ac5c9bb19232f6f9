//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use ospfmgr_daemon::client::ClientError;
use ospfmgr_utils::secret::SecretError;
use tracing::{debug, warn};

// Management-layer errors.
//
// A closed enumeration: every operator-facing failure maps to exactly one
// variant, and `Display` is the single error-to-text lookup. Validation
// errors are returned before any daemon contact; unexpected daemon failures
// are wrapped into `InternalAccess` with the underlying diagnostic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    // Generic failures
    InvalidArgument(&'static str),
    EntryNotFound,
    EntryAlreadyExists,
    InternalAccess(String),
    InternalError(&'static str),
    // Router
    RouterIdChangeNotEffective,
    DeferredShutdownInProgress,
    // Areas and virtual links
    StubAreaNotAllowedOnBackbone,
    VirtualLinkNotAllowedOnBackbone,
    StubAreaHasVirtualLink,
    VirtualLinkInStubArea,
    AreaRangeCostConflict,
    AreaRangeNetworkDefault,
    AreaRangeOverlap,
    // Authentication key material
    KeyTooLong,
    KeyInvalidFormat,
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::InvalidArgument(field) => {
                debug!(%field, "{}", self);
            }
            Error::EntryNotFound | Error::EntryAlreadyExists => {
                debug!("{}", self);
            }
            Error::InternalAccess(message) => {
                warn!(%message, "{}", self);
            }
            Error::InternalError(message) => {
                warn!(%message, "{}", self);
            }
            _ => {
                debug!("{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(..) => {
                write!(f, "invalid argument")
            }
            Error::EntryNotFound => {
                write!(f, "entry not found")
            }
            Error::EntryAlreadyExists => {
                write!(f, "entry already exists")
            }
            Error::InternalAccess(..) => {
                write!(f, "routing daemon access failure")
            }
            Error::InternalError(..) => {
                write!(f, "internal error")
            }
            Error::RouterIdChangeNotEffective => {
                write!(
                    f,
                    "router ID change takes effect after all neighbors \
                     are down"
                )
            }
            Error::DeferredShutdownInProgress => {
                write!(f, "deferred shutdown is in progress")
            }
            Error::StubAreaNotAllowedOnBackbone => {
                write!(f, "backbone area cannot be a stub area")
            }
            Error::VirtualLinkNotAllowedOnBackbone => {
                write!(f, "backbone area cannot host a virtual link")
            }
            Error::StubAreaHasVirtualLink => {
                write!(f, "a virtual link exists in this area")
            }
            Error::VirtualLinkInStubArea => {
                write!(f, "virtual links are not allowed in stub areas")
            }
            Error::AreaRangeCostConflict => {
                write!(
                    f,
                    "cost override conflicts with the not-advertise flag"
                )
            }
            Error::AreaRangeNetworkDefault => {
                write!(f, "area range cannot be the default network")
            }
            Error::AreaRangeOverlap => {
                write!(f, "address range overlaps another range in the area")
            }
            Error::KeyTooLong => {
                write!(f, "key is too long")
            }
            Error::KeyInvalidFormat => {
                write!(f, "invalid key format")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ClientError> for Error {
    fn from(error: ClientError) -> Error {
        error.log();
        Error::InternalAccess(error.to_string())
    }
}

impl From<SecretError> for Error {
    fn from(error: SecretError) -> Error {
        match error {
            SecretError::TooLong => Error::KeyTooLong,
            SecretError::InvalidFormat => Error::KeyInvalidFormat,
        }
    }
}
