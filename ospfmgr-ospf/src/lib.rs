//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod area;
pub mod error;
pub mod interface;
pub mod master;
pub mod router;
pub mod southbound;
pub mod status;
