//! Network discovery for the ground station
//!
//! Finds the address an operator should use to reach the station, preferring
//! wired interfaces over wireless and virtual ones.

use anyhow::{anyhow, Context, Result};
use if_addrs::{get_if_addrs, IfAddr};
use std::net::Ipv4Addr;
use tracing::debug;

/// Priority order for interface selection
const INTERFACE_PRIORITY: &[&str] = &[
    "eth", "en", "ens", "enp", "eno",  // Ethernet
    "wlan", "wlp", "wlo", "wifi",      // WiFi
    "usb", "ppp",                      // Tethered links
    "br", "docker", "vir",             // Virtual (lower priority)
];

fn interface_rank(name: &str) -> usize {
    INTERFACE_PRIORITY
        .iter()
        .position(|prefix| name.starts_with(prefix))
        .unwrap_or(INTERFACE_PRIORITY.len())
}

/// First non-loopback IPv4 address, by interface priority
pub fn primary_ipv4() -> Result<Ipv4Addr> {
    let interfaces = get_if_addrs().context("Failed to enumerate network interfaces")?;

    let candidates = interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.addr {
            IfAddr::V4(v4) => Some((iface.name, v4.ip)),
            IfAddr::V6(_) => None,
        });

    let (name, ip) = pick_preferred(candidates).ok_or_else(|| anyhow!("No non-loopback IPv4 address"))?;
    debug!("Primary address {} on {}", ip, name);
    Ok(ip)
}

fn pick_preferred(candidates: impl Iterator<Item = (String, Ipv4Addr)>) -> Option<(String, Ipv4Addr)> {
    candidates.min_by_key(|(name, _)| interface_rank(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethernet_preferred_over_wifi_and_docker() {
        let candidates = vec![
            ("docker0".to_string(), Ipv4Addr::new(172, 17, 0, 1)),
            ("wlan0".to_string(), Ipv4Addr::new(192, 168, 4, 20)),
            ("eth0".to_string(), Ipv4Addr::new(10, 0, 0, 5)),
        ];
        let (name, ip) = pick_preferred(candidates.into_iter()).unwrap();
        assert_eq!(name, "eth0");
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_unknown_interfaces_rank_last() {
        assert!(interface_rank("wlan0") < interface_rank("tun0"));
        assert!(pick_preferred(std::iter::empty()).is_none());
    }
}
