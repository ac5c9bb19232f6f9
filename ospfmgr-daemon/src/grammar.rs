//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::LazyLock as Lazy;

use regex::Regex;

// Comment lines are optional leading blanks followed by '!'.
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('!')
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

// Root-level commands have no leading whitespace.
pub fn is_root(line: &str) -> bool {
    !line.starts_with([' ', '\t'])
}

// Matches a literal keyword at the start of the input and returns the
// remainder with the separating blanks consumed. The keyword must be
// delimited by whitespace or end-of-input.
pub fn keyword<'a>(input: &'a str, word: &str) -> Option<&'a str> {
    let rest = input.strip_prefix(word)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim_start())
}

// The daemon renders uptimes and countdowns in six different formats
// depending on magnitude. Grammars are tried in fixed priority order and the
// first match wins; no match means the text is unparseable and the caller
// substitutes zero after logging.
static UPTIME_GRAMMARS: Lazy<[(Regex, [u64; 4]); 6]> = Lazy::new(|| {
    const DAY: u64 = 86400;
    const WEEK: u64 = 604800;
    const YEAR: u64 = 365 * DAY;
    // Explicit ASCII classes: the workspace builds `regex` without the
    // Unicode feature set, where `\d` is unavailable.
    [
        // "DDDd HH:MM:SS"
        (
            regex(r"^([0-9]+)d ([0-9]+):([0-9]+):([0-9]+)$"),
            [DAY, 3600, 60, 1],
        ),
        // "YYyWWwDd"
        (regex(r"^([0-9]+)y([0-9]+)w([0-9]+)d$"), [YEAR, WEEK, DAY, 0]),
        // "WWwDdHHh", including the daemon's stray-'d' form "WWwdDDdHHh"
        (regex(r"^([0-9]+)wd?([0-9]+)d([0-9]+)h$"), [WEEK, DAY, 3600, 0]),
        // "DdHHhMMm"
        (regex(r"^([0-9]+)d([0-9]+)h([0-9]+)m$"), [DAY, 3600, 60, 0]),
        // "HH:MM:SS"
        (regex(r"^([0-9]+):([0-9]+):([0-9]+)$"), [3600, 60, 1, 0]),
        // "MM:SS"
        (regex(r"^([0-9]+):([0-9]+)$"), [60, 1, 0, 0]),
    ]
});

// Parses an uptime/countdown string into seconds.
pub fn parse_uptime(text: &str) -> Option<u32> {
    let text = text.trim();
    for (grammar, weights) in UPTIME_GRAMMARS.iter() {
        let Some(captures) = grammar.captures(text) else {
            continue;
        };
        let mut seconds: u64 = 0;
        for (group, weight) in captures.iter().skip(1).flatten().zip(weights) {
            let value = group.as_str().parse::<u64>().ok()?;
            seconds = seconds.checked_add(value.checked_mul(*weight)?)?;
        }
        return Some(seconds.min(u32::MAX as u64) as u32);
    }
    None
}

// ===== helper functions =====

fn regex(pattern: &str) -> Regex {
    // The patterns are compile-time constants.
    Regex::new(pattern).unwrap()
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(is_comment("!"));
        assert!(is_comment("  ! frr version"));
        assert!(!is_comment("interface vlan1 !"));
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(is_root("router ospf"));
        assert!(!is_root(" ospf router-id 1.2.3.4"));
    }

    #[test]
    fn keywords() {
        assert_eq!(keyword("router ospf", "router"), Some("ospf"));
        assert_eq!(keyword("router", "router"), Some(""));
        assert_eq!(keyword("routers x", "router"), None);
        assert_eq!(keyword("key chain  bfd", "key chain"), Some("bfd"));
    }

    #[test]
    fn uptime_day_space_hms() {
        assert_eq!(parse_uptime("04d 02:31:15"), Some(354675));
        assert_eq!(parse_uptime("24d 20:31:23"), Some(2147483));
    }

    #[test]
    fn uptime_ywd() {
        // 7y = 220752000, 3w = 1814400, 6d = 518400.
        assert_eq!(parse_uptime("07y03w6d"), Some(223084800));
    }

    #[test]
    fn uptime_wdh() {
        // 7w = 4233600, 4d = 345600, 1h = 3600.
        assert_eq!(parse_uptime("07w4d01h"), Some(4582800));
        // Stray-'d' form emitted by the daemon: 1w + 5d + 3h.
        assert_eq!(parse_uptime("1wd5d3h"), Some(1047600));
    }

    #[test]
    fn uptime_dhm() {
        assert_eq!(parse_uptime("6d13h20m"), Some(566400));
    }

    #[test]
    fn uptime_hms_and_ms() {
        assert_eq!(parse_uptime("03:56:30"), Some(14190));
        assert_eq!(parse_uptime("10:56:30"), Some(39390));
        assert_eq!(parse_uptime("56:02"), Some(3362));
        assert_eq!(parse_uptime("56:30"), Some(3390));
    }

    #[test]
    fn uptime_no_match() {
        assert_eq!(parse_uptime(""), None);
        assert_eq!(parse_uptime("never"), None);
        assert_eq!(parse_uptime("12h"), None);
    }
}
