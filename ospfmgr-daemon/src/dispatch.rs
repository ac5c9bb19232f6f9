//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use crate::grammar;

// One running-config line, tagged with the configuration mode enclosing it.
//
// Mode-header lines ("interface vlan5", "router ospf", "key chain kc",
// nested "key 1") are delivered as the first event of the mode they open.
// Line text is delivered with the indentation stripped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigEvent<'a> {
    Root(&'a str),
    Interface { name: &'a str, line: &'a str },
    Router { name: &'a str, line: &'a str },
    KeyChain { name: &'a str, line: &'a str },
    KeyChainKey { name: &'a str, key_id: u64, line: &'a str },
}

// Configuration mode tracked while walking the running-config text.
#[derive(Clone, Copy, Debug)]
enum Mode<'a> {
    Root,
    Interface(&'a str),
    Router(&'a str),
    KeyChain(&'a str),
    KeyChainKey(&'a str, u64),
}

// Lazy, restartable walk over the daemon's full running-configuration text.
//
// Every non-comment, non-blank line produces exactly one event:
// - a line with no leading whitespace resets all nested mode state before
//   any further matching;
// - mode headers are matched in fixed order: nested "key <id>" (only while
//   inside a key chain), then "key chain <name>", "interface <name>" and
//   "router <name>";
// - any other line is delivered to the deepest active mode, or as a root
//   command when no mode is active;
// - an indented line outside any mode is dropped.
#[derive(Debug)]
pub struct ConfigLines<'a> {
    lines: std::str::Lines<'a>,
    mode: Mode<'a>,
}

// ===== impl ConfigLines =====

impl<'a> ConfigLines<'a> {
    pub fn new(config: &'a str) -> ConfigLines<'a> {
        ConfigLines {
            lines: config.lines(),
            mode: Mode::Root,
        }
    }
}

impl<'a> Iterator for ConfigLines<'a> {
    type Item = ConfigEvent<'a>;

    fn next(&mut self) -> Option<ConfigEvent<'a>> {
        loop {
            let raw = self.lines.next()?;
            if grammar::is_blank(raw) || grammar::is_comment(raw) {
                continue;
            }

            // Root-level commands leave whatever mode was active.
            if grammar::is_root(raw) {
                self.mode = Mode::Root;
            }
            let line = raw.trim_start();

            // Nested "key <id>" opens a key-id sub-mode, but only while a
            // key chain is active; a bare "key <id>" anywhere else is an
            // ordinary line.
            if let Mode::KeyChain(name) | Mode::KeyChainKey(name, _) =
                self.mode
                && let Some(key_id) = match_key_id(line)
            {
                self.mode = Mode::KeyChainKey(name, key_id);
                return Some(ConfigEvent::KeyChainKey { name, key_id, line });
            }

            if let Some(name) = grammar::keyword(line, "key chain")
                && !name.is_empty()
            {
                self.mode = Mode::KeyChain(name);
                return Some(ConfigEvent::KeyChain { name, line });
            }

            if let Some(name) = grammar::keyword(line, "interface")
                && !name.is_empty()
            {
                self.mode = Mode::Interface(name);
                return Some(ConfigEvent::Interface { name, line });
            }

            if let Some(name) = grammar::keyword(line, "router")
                && !name.is_empty()
            {
                self.mode = Mode::Router(name);
                return Some(ConfigEvent::Router { name, line });
            }

            // Sub-commands belong to the deepest active mode.
            match self.mode {
                Mode::Root => {
                    if grammar::is_root(raw) {
                        return Some(ConfigEvent::Root(line));
                    }
                    // Indented line with no enclosing mode.
                    continue;
                }
                Mode::Interface(name) => {
                    return Some(ConfigEvent::Interface { name, line });
                }
                Mode::Router(name) => {
                    return Some(ConfigEvent::Router { name, line });
                }
                Mode::KeyChain(name) => {
                    return Some(ConfigEvent::KeyChain { name, line });
                }
                Mode::KeyChainKey(name, key_id) => {
                    return Some(ConfigEvent::KeyChainKey {
                        name,
                        key_id,
                        line,
                    });
                }
            }
        }
    }
}

// ===== helper functions =====

// Matches exactly "key <id>".
fn match_key_id(line: &str) -> Option<u64> {
    let rest = grammar::keyword(line, "key")?;
    let mut words = rest.split_whitespace();
    let key_id = words.next()?.parse().ok()?;
    match words.next() {
        None => Some(key_id),
        Some(_) => None,
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    fn events(config: &str) -> Vec<ConfigEvent<'_>> {
        ConfigLines::new(config).collect()
    }

    #[test]
    fn mixed_modes() {
        let config = "\
!
! daemon version 1.0
!
password foo
interface vlan1
 ip ospf cost 17
 ip ospf priority 2
router ospf
 ospf router-id 1.2.3.4
 area 0.0.0.1 stub
line vty
";
        assert_eq!(
            events(config),
            vec![
                ConfigEvent::Root("password foo"),
                ConfigEvent::Interface {
                    name: "vlan1",
                    line: "interface vlan1"
                },
                ConfigEvent::Interface {
                    name: "vlan1",
                    line: "ip ospf cost 17"
                },
                ConfigEvent::Interface {
                    name: "vlan1",
                    line: "ip ospf priority 2"
                },
                ConfigEvent::Router {
                    name: "ospf",
                    line: "router ospf"
                },
                ConfigEvent::Router {
                    name: "ospf",
                    line: "ospf router-id 1.2.3.4"
                },
                ConfigEvent::Router {
                    name: "ospf",
                    line: "area 0.0.0.1 stub"
                },
                ConfigEvent::Root("line vty"),
            ]
        );
    }

    #[test]
    fn key_chain_nesting() {
        let config = "\
key chain kc1
 key 1
  key-string secret1
 key 2
  key-string secret2
key chain kc2
 key 7
  key-string other
";
        assert_eq!(
            events(config),
            vec![
                ConfigEvent::KeyChain { name: "kc1", line: "key chain kc1" },
                ConfigEvent::KeyChainKey {
                    name: "kc1",
                    key_id: 1,
                    line: "key 1"
                },
                ConfigEvent::KeyChainKey {
                    name: "kc1",
                    key_id: 1,
                    line: "key-string secret1"
                },
                ConfigEvent::KeyChainKey {
                    name: "kc1",
                    key_id: 2,
                    line: "key 2"
                },
                ConfigEvent::KeyChainKey {
                    name: "kc1",
                    key_id: 2,
                    line: "key-string secret2"
                },
                ConfigEvent::KeyChain { name: "kc2", line: "key chain kc2" },
                ConfigEvent::KeyChainKey {
                    name: "kc2",
                    key_id: 7,
                    line: "key 7"
                },
                ConfigEvent::KeyChainKey {
                    name: "kc2",
                    key_id: 7,
                    line: "key-string other"
                },
            ]
        );
    }

    #[test]
    fn root_line_clears_nesting() {
        let config = "\
key chain kc1
 key 1
hostname sw1
 key 2
";
        // "hostname sw1" resets the mode state, so the indented "key 2" that
        // follows has no enclosing mode and is dropped.
        assert_eq!(
            events(config),
            vec![
                ConfigEvent::KeyChain { name: "kc1", line: "key chain kc1" },
                ConfigEvent::KeyChainKey {
                    name: "kc1",
                    key_id: 1,
                    line: "key 1"
                },
                ConfigEvent::Root("hostname sw1"),
            ]
        );
    }

    #[test]
    fn bare_key_outside_key_chain() {
        let config = "\
interface vlan1
 key 5
";
        // Not a mode transition; delivered to the interface mode instead.
        assert_eq!(
            events(config),
            vec![
                ConfigEvent::Interface {
                    name: "vlan1",
                    line: "interface vlan1"
                },
                ConfigEvent::Interface { name: "vlan1", line: "key 5" },
            ]
        );
    }
}
