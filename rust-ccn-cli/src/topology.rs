//! Links and routes files.
//!
//! Both are plain text with one whitespace-separated record per line.
//! Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! # links: name  ip  port  bandwidth_kbps  delay_ms
//! s0    127.0.0.1  9700  2000  5
//!
//! # routes: prefix  ip  port  [hops]
//! /video  127.0.0.1  9800  2
//! ```

use anyhow::{anyhow, bail, Context, Result};
use rust_ccn_common::Name;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// One line of a links file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub name: String,
    pub peer: SocketAddr,
    pub bandwidth_kbps: u64,
    pub delay_ms: u64,
}

/// One line of a routes file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub prefix: Name,
    pub next_hop: SocketAddr,
    pub hops: u32,
}

pub fn load_links(path: &Path) -> Result<Vec<LinkSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read links file {}", path.display()))?;
    parse_links(&text).with_context(|| format!("Invalid links file {}", path.display()))
}

pub fn load_routes(path: &Path) -> Result<Vec<RouteSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read routes file {}", path.display()))?;
    parse_routes(&text).with_context(|| format!("Invalid routes file {}", path.display()))
}

pub fn parse_links(text: &str) -> Result<Vec<LinkSpec>> {
    records(text)
        .map(|(line, fields)| {
            let [name, ip, port, bandwidth, delay] = fields[..] else {
                bail!("line {line}: expected 5 fields, found {}", fields.len());
            };
            let bandwidth_kbps = number(line, "bandwidth", bandwidth)?;
            if bandwidth_kbps == 0 {
                bail!("line {line}: bandwidth must be positive");
            }
            Ok(LinkSpec {
                name: name.to_string(),
                peer: endpoint(line, ip, port)?,
                bandwidth_kbps,
                delay_ms: number(line, "delay", delay)?,
            })
        })
        .collect()
}

pub fn parse_routes(text: &str) -> Result<Vec<RouteSpec>> {
    records(text)
        .map(|(line, fields)| {
            let (prefix, ip, port, hops) = match fields[..] {
                [prefix, ip, port] => (prefix, ip, port, None),
                [prefix, ip, port, hops] => (prefix, ip, port, Some(hops)),
                _ => bail!("line {line}: expected 3 or 4 fields, found {}", fields.len()),
            };
            Ok(RouteSpec {
                prefix: Name::from_string(prefix),
                next_hop: endpoint(line, ip, port)?,
                hops: hops.map(|hops| number(line, "hops", hops)).transpose()?.unwrap_or(1),
            })
        })
        .collect()
}

fn records(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(i, line)| (i, line.split_whitespace().collect()))
}

fn endpoint(line: usize, ip: &str, port: &str) -> Result<SocketAddr> {
    let ip: IpAddr = ip
        .parse()
        .map_err(|e| anyhow!("line {line}: bad address {ip:?}: {e}"))?;
    Ok(SocketAddr::new(ip, number(line, "port", port)?))
}

fn number<T: std::str::FromStr>(line: usize, what: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow!("line {line}: bad {what} {value:?}: {e}"))
}
