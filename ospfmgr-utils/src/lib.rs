//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod cache;
pub mod nextkey;
pub mod secret;
