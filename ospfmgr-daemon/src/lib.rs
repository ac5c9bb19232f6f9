//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod client;
pub mod dispatch;
pub mod grammar;
