use crate::inventory::Category;

/// Vendors keyed by the first three octets of the hardware address.
const VENDORS: &[(&str, &str)] = &[
    ("00:1A:2B", "Cisco"),
    ("00:1B:2C", "Cisco"),
    ("00:0C:29", "VMware"),
    ("FC:EC:DA", "Ubiquiti"),
    ("24:5A:4C", "Ubiquiti"),
    ("00:50:56", "VMware"),
    ("08:00:27", "VirtualBox"),
    ("B4:2E:99", "HP"),
    ("3C:D9:2B", "HP"),
    ("D4:BE:D9", "Dell"),
    ("18:A9:05", "Dell"),
];

const SWITCH_PREFIXES: &[&str] = &["00:1A:2B", "00:1B:2C", "00:1C:2D", "00:0C:29"];
const ACCESS_POINT_PREFIXES: &[&str] = &["FC:EC:DA", "24:5A:4C", "DC:9F:DB"];

pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Upper-case, colon-separated first three octets, e.g. `FC:EC:DA`.
pub fn prefix(mac: &str) -> String {
    mac.trim()
        .chars()
        .take(8)
        .collect::<String>()
        .to_ascii_uppercase()
        .replace('-', ":")
}

pub fn category_for(mac: &str) -> Category {
    let prefix = prefix(mac);
    if SWITCH_PREFIXES.iter().any(|p| prefix.starts_with(p)) {
        Category::Switch
    } else if ACCESS_POINT_PREFIXES.iter().any(|p| prefix.starts_with(p)) {
        Category::Ap
    } else {
        Category::Server
    }
}

pub fn vendor_for(mac: &str) -> &'static str {
    let prefix = prefix(mac);
    VENDORS
        .iter()
        .find(|(p, _)| prefix.starts_with(p))
        .map(|(_, vendor)| *vendor)
        .unwrap_or(UNKNOWN_VENDOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(prefix("fc-ec-da-11-22-33"), "FC:EC:DA");
        assert_eq!(prefix("fc:ec:da:11:22:33"), "FC:EC:DA");
    }

    #[test]
    fn known_prefixes_are_classified() {
        assert_eq!(category_for("FC:EC:DA:11:22:33"), Category::Ap);
        assert_eq!(vendor_for("FC:EC:DA:11:22:33"), "Ubiquiti");
        assert_eq!(category_for("00:1a:2b:00:00:01"), Category::Switch);
        assert_eq!(vendor_for("00:1a:2b:00:00:01"), "Cisco");
        assert_eq!(vendor_for("d4-be-d9-aa-bb-cc"), "Dell");
        assert_eq!(category_for("d4-be-d9-aa-bb-cc"), Category::Server);
    }

    #[test]
    fn unknown_prefix_defaults_to_server() {
        assert_eq!(category_for("AA:BB:CC:DD:EE:FF"), Category::Server);
        assert_eq!(vendor_for("AA:BB:CC:DD:EE:FF"), UNKNOWN_VENDOR);
        assert_eq!(vendor_for(""), UNKNOWN_VENDOR);
    }
}
