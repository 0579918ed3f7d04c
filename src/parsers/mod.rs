//! Text parsers for Cisco IOS `show` output.
//!
//! IOS prints fixed-layout tables. These parsers read them the way an operator would:
//! rows are keyed on leading VLAN ids, interface columns are located from the header row,
//! and trunk allowed lists are folded across their `add` continuation lines.

use regex_lite::Regex;
use std::sync::OnceLock;

use crate::models::{AllowedVlans, InterfaceEntry, SwitchportMode, VlanEntry, VlanId, VlanRange};

/// Prefix of every trunk allowed-list line in the running config
const ALLOWED_PREFIX: &str = "switchport trunk allowed vlan";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("device rejected command: {0}")]
    CommandRejected(String),
    #[error("unrecognized {0} output: header row not found")]
    MissingHeader(&'static str),
    #[error("invalid allowed VLAN list entry '{0}'")]
    InvalidAllowedList(String),
    #[error("unsupported allowed VLAN directive '{0}'")]
    UnsupportedDirective(String),
}

fn hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^\s*hostname\s+(\S+)").expect("valid hostname regex"))
}

fn vlan_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,4})\s+(\S+)\s+(\S+)").expect("valid vlan row regex"))
}

/// Markers IOS prints when it refuses a command. Other `%` lines are notices.
const ERROR_MARKERS: &[&str] = &[
    "% Invalid",
    "% Incomplete",
    "% Ambiguous",
    "% Unknown",
    "% Unrecognized",
    "% Bad",
    "% Error",
    "% Access denied",
    "% Authorization failed",
];

fn is_error_marker(line: &str) -> bool {
    ERROR_MARKERS
        .iter()
        .any(|marker| line.get(..marker.len()).is_some_and(|head| head.eq_ignore_ascii_case(marker)))
}

/// Return an error if the device answered with an IOS error marker ("% Invalid input ...")
pub fn check_rejected(output: &str) -> Result<(), ParseError> {
    match output.lines().map(str::trim).find(|l| is_error_marker(l)) {
        Some(line) => Err(ParseError::CommandRejected(line.to_string())),
        None => Ok(()),
    }
}

/// Extract the hostname from `show running-config | include hostname`
pub fn parse_hostname(output: &str) -> Option<String> {
    hostname_re()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse `show vlan brief` into VLAN entries.
/// Port continuation lines (leading whitespace) are ignored.
pub fn parse_vlan_brief(output: &str) -> Result<Vec<VlanEntry>, ParseError> {
    check_rejected(output)?;

    let mut vlans = Vec::new();
    for line in output.lines() {
        let Some(caps) = vlan_row_re().captures(line) else {
            continue;
        };
        let Ok(id) = caps[1].parse::<VlanId>() else {
            continue;
        };
        vlans.push(VlanEntry {
            id,
            name: caps[2].to_string(),
            status: caps[3].to_string(),
        });
    }

    Ok(vlans)
}

/// Whitespace-separated tokens with their byte offsets
fn tokens(line: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &line[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &line[s..]));
    }
    out
}

/// Token covering a header column, or the first one starting after it
fn token_at<'a>(tokens: &[(usize, &'a str)], column: usize) -> Option<&'a str> {
    tokens
        .iter()
        .skip(1)
        .find(|(start, tok)| *start <= column && column < start + tok.len())
        .or_else(|| tokens.iter().skip(1).find(|(start, _)| *start >= column))
        .map(|(_, tok)| *tok)
}

struct StatusColumns {
    status: usize,
    vlan: usize,
}

fn status_header(line: &str) -> Option<StatusColumns> {
    if !line.trim_start().starts_with("Port") {
        return None;
    }
    let status = line.find("Status")?;
    let vlan = line.find("Vlan")?;
    Some(StatusColumns { status, vlan })
}

/// Parse `show interfaces status` into interface entries tagged with their switchport mode
pub fn parse_interfaces_status(output: &str) -> Result<Vec<InterfaceEntry>, ParseError> {
    check_rejected(output)?;

    let mut columns: Option<StatusColumns> = None;
    let mut interfaces = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(header) = status_header(line) {
            columns = Some(header);
            continue;
        }
        let Some(cols) = columns.as_ref() else {
            continue;
        };

        let toks = tokens(line);
        let Some((_, port)) = toks.first() else {
            continue;
        };
        let status = token_at(&toks, cols.status).unwrap_or_default();
        let vlan = token_at(&toks, cols.vlan).unwrap_or_default();

        interfaces.push(InterfaceEntry {
            port: port.to_string(),
            status: status.to_string(),
            mode: SwitchportMode::from_vlan_column(vlan),
        });
    }

    if columns.is_none() && !output.trim().is_empty() {
        return Err(ParseError::MissingHeader("show interfaces status"));
    }

    Ok(interfaces)
}

fn parse_ranges(list: &str) -> Result<Vec<VlanRange>, ParseError> {
    let mut ranges = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let invalid = || ParseError::InvalidAllowedList(item.to_string());
        let range = match item.split_once('-') {
            Some((a, b)) => {
                let start = a.trim().parse::<VlanId>().map_err(|_| invalid())?;
                let end = b.trim().parse::<VlanId>().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                VlanRange {
                    start: start.get(),
                    end: end.get(),
                }
            }
            None => VlanRange::single(item.parse::<VlanId>().map_err(|_| invalid())?.get()),
        };
        ranges.push(range);
    }
    Ok(ranges)
}

/// Parse the allowed-VLAN fragment of one trunk
/// (`show running-config interface <port> | include allowed`).
/// A fragment without any allowed-list line means no explicit restriction.
pub fn parse_allowed_vlans(fragment: &str) -> Result<AllowedVlans, ParseError> {
    check_rejected(fragment)?;

    let mut allowed = AllowedVlans::Implicit;

    for line in fragment.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix(ALLOWED_PREFIX) else {
            continue;
        };
        let rest = rest.trim();
        let (directive, list) = match rest.split_once(char::is_whitespace) {
            Some((d, l)) => (d, l.trim()),
            None => (rest, ""),
        };

        allowed = match directive {
            "all" => AllowedVlans::All,
            "none" => AllowedVlans::None,
            "except" => AllowedVlans::Except(parse_ranges(list)?),
            "add" => {
                let added = parse_ranges(list)?;
                match allowed {
                    AllowedVlans::List(mut ranges) => {
                        ranges.extend(added);
                        AllowedVlans::List(ranges)
                    }
                    AllowedVlans::Implicit | AllowedVlans::None => AllowedVlans::List(added),
                    AllowedVlans::All => AllowedVlans::All,
                    AllowedVlans::Except(_) => {
                        return Err(ParseError::UnsupportedDirective(line.to_string()))
                    }
                }
            }
            "remove" => return Err(ParseError::UnsupportedDirective(line.to_string())),
            _ => AllowedVlans::List(parse_ranges(rest)?),
        };
    }

    Ok(allowed)
}
