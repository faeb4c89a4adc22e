// dictionary.rs - attribute-type registry (component B)
//
// A Dictionary is a bidirectional mapping between (vendor_id, type_code) pairs and
// attribute names, built once at startup and read thereafter. Two hash indexes back the
// lookups so no call site ever needs to linear-scan or reflect over registered types.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{RadiusError, Result};

/// How an attribute's value is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    IpAddr,
    Octets,
}

/// `None` vendor_id means "no vendor" — a top-level RFC 2865 attribute.
/// `Some(vendor_id)` means this attribute is a VSA sub-attribute for that vendor.
#[derive(Debug, Clone)]
pub struct AttributeType {
    pub name: String,
    pub vendor_id: Option<u32>,
    pub type_code: u8,
    pub kind: ValueKind,
    /// Named integer aliases, e.g. Service-Type's "Login" -> 1, "Framed" -> 2.
    pub named_values: HashMap<String, i32>,
}

impl AttributeType {
    pub fn new(name: impl Into<String>, vendor_id: Option<u32>, type_code: u8, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            vendor_id,
            type_code,
            kind,
            named_values: HashMap::new(),
        }
    }

    pub fn with_named_values(mut self, values: &[(&str, i32)]) -> Self {
        self.named_values = values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self
    }
}

/// (vendor_id, type_code) key. `None` is the distinguished "no vendor" space.
type CodeKey = (Option<u32>, u8);

#[derive(Debug, Default)]
pub struct Dictionary {
    by_code: HashMap<CodeKey, AttributeType>,
    by_name: HashMap<String, CodeKey>,
    vendor_names: HashMap<u32, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute type. Fails if either its (vendor, code) pair or its name
    /// already has an entry — the two hash indexes must never drift apart.
    pub fn register(&mut self, attribute_type: AttributeType) -> Result<()> {
        let key = (attribute_type.vendor_id, attribute_type.type_code);

        if self.by_code.contains_key(&key) {
            return Err(RadiusError::MalformedPacket(format!(
                "duplicate dictionary entry for (vendor={:?}, code={})",
                attribute_type.vendor_id, attribute_type.type_code
            )));
        }
        if self.by_name.contains_key(&attribute_type.name) {
            return Err(RadiusError::MalformedPacket(format!(
                "duplicate dictionary entry for name '{}'",
                attribute_type.name
            )));
        }

        self.by_name.insert(attribute_type.name.clone(), key);
        self.by_code.insert(key, attribute_type);
        Ok(())
    }

    pub fn register_vendor_name(&mut self, vendor_id: u32, name: impl Into<String>) {
        self.vendor_names.insert(vendor_id, name.into());
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&AttributeType> {
        let key = self.by_name.get(name)?;
        self.by_code.get(key)
    }

    pub fn lookup_by_code(&self, vendor_id: Option<u32>, type_code: u8) -> Option<&AttributeType> {
        self.by_code.get(&(vendor_id, type_code))
    }

    pub fn vendor_name(&self, vendor_id: u32) -> Option<&str> {
        self.vendor_names.get(&vendor_id).map(String::as_str)
    }

    /// The embedded default dictionary: RFC 2865 attribute codes 1-79 (the subset in
    /// common use) plus Vendor-Specific (26), and a small built-in Cisco VSA set used by
    /// the VSA worked example and tests.
    pub fn with_defaults() -> Self {
        let mut dict = Self::new();
        for (name, code) in STANDARD_ATTRIBUTES {
            let kind = kind_for_standard_attribute(*code);
            dict.register(AttributeType::new(*name, None, *code, kind))
                .expect("embedded default dictionary must not contain duplicates");
        }
        dict.register(
            AttributeType::new("Service-Type", None, 6, ValueKind::Integer).with_named_values(&[
                ("Login", 1),
                ("Framed", 2),
                ("Callback-Login", 3),
                ("Callback-Framed", 4),
                ("Outbound", 5),
                ("Administrative", 6),
                ("NAS-Prompt", 7),
                ("Authenticate-Only", 8),
                ("Callback-NAS-Prompt", 9),
            ]),
        )
        .expect("Service-Type already registered by STANDARD_ATTRIBUTES");

        dict.register_vendor_name(9, "Cisco");
        dict.register(AttributeType::new("Cisco-AVPair", Some(9), 1, ValueKind::String))
            .expect("embedded Cisco VSA entry must not collide");

        dict
    }
}

/// (name, type_code) for the subset of RFC 2865 attributes in common use. Service-Type
/// is registered separately above so it can carry named integer aliases.
const STANDARD_ATTRIBUTES: &[(&str, u8)] = &[
    ("User-Name", 1),
    ("User-Password", 2),
    ("CHAP-Password", 3),
    ("NAS-IP-Address", 4),
    ("NAS-Port", 5),
    // 6 Service-Type registered separately
    ("Framed-Protocol", 7),
    ("Framed-IP-Address", 8),
    ("Framed-IP-Netmask", 9),
    ("Framed-Routing", 10),
    ("Filter-Id", 11),
    ("Framed-MTU", 12),
    ("Framed-Compression", 13),
    ("Login-IP-Host", 14),
    ("Login-Service", 15),
    ("Login-TCP-Port", 16),
    ("Reply-Message", 18),
    ("Callback-Number", 19),
    ("Callback-Id", 20),
    ("Framed-Route", 22),
    ("Framed-IPX-Network", 23),
    ("State", 24),
    ("Class", 25),
    ("Vendor-Specific", 26),
    ("Session-Timeout", 27),
    ("Idle-Timeout", 28),
    ("Termination-Action", 29),
    ("Called-Station-Id", 30),
    ("Calling-Station-Id", 31),
    ("NAS-Identifier", 32),
    ("Proxy-State", 33),
    ("Login-LAT-Service", 34),
    ("Login-LAT-Node", 35),
    ("Login-LAT-Group", 36),
    ("Framed-AppleTalk-Link", 37),
    ("Framed-AppleTalk-Network", 38),
    ("Framed-AppleTalk-Zone", 39),
    ("Acct-Status-Type", 40),
    ("Acct-Delay-Time", 41),
    ("Acct-Input-Octets", 42),
    ("Acct-Output-Octets", 43),
    ("Acct-Session-Id", 44),
    ("Acct-Authentic", 45),
    ("Acct-Session-Time", 46),
    // RFC 2869 accounting extensions
    ("Acct-Input-Packets", 47),
    ("Acct-Output-Packets", 48),
    ("Acct-Terminate-Cause", 49),
    ("Acct-Multi-Session-Id", 50),
    ("Acct-Link-Count", 51),
    ("Acct-Input-Gigawords", 52),
    ("Acct-Output-Gigawords", 53),
    // 54 unassigned
    ("Event-Timestamp", 55),
    ("Egress-VLANID", 56),
    ("Ingress-Filters", 57),
    ("Egress-VLAN-Name", 58),
    ("User-Priority-Table", 59),
    ("CHAP-Challenge", 60),
    ("NAS-Port-Type", 61),
    ("Port-Limit", 62),
    ("Login-LAT-Port", 63),
    // RFC 2868 tunneling attributes
    ("Tunnel-Type", 64),
    ("Tunnel-Medium-Type", 65),
    ("Tunnel-Client-Endpoint", 66),
    ("Tunnel-Server-Endpoint", 67),
    ("Acct-Tunnel-Connection", 68),
    ("Tunnel-Password", 69),
    // RFC 2869 ARAP and prompt attributes
    ("ARAP-Password", 70),
    ("ARAP-Features", 71),
    ("ARAP-Zone-Access", 72),
    ("ARAP-Security", 73),
    ("ARAP-Security-Data", 74),
    ("Password-Retry", 75),
    ("Prompt", 76),
    ("Connect-Info", 77),
    ("Configuration-Token", 78),
    ("EAP-Message", 79),
    ("Message-Authenticator", 80),
];

fn kind_for_standard_attribute(code: u8) -> ValueKind {
    match code {
        1 | 2 | 11 | 18 | 19 | 20 | 22 | 32 | 44 | 50 | 58 | 66 | 67 | 68 | 69 | 74 | 77 | 78 => {
            ValueKind::String
        }
        4 | 8 | 9 | 14 => ValueKind::IpAddr,
        5 | 7 | 10 | 12 | 13 | 15 | 16 | 27 | 28 | 29 | 40 | 41 | 42 | 43 | 45 | 46 | 47 | 48
        | 49 | 51 | 52 | 53 | 55 | 56 | 57 | 61 | 62 | 64 | 65 | 72 | 73 | 75 | 76 => {
            ValueKind::Integer
        }
        3 | 23 | 24 | 25 | 26 | 30 | 31 | 33 | 34 | 35 | 36 | 37 | 38 | 39 | 59 | 60 | 63 | 70
        | 71 | 79 | 80 => ValueKind::Octets,
        _ => ValueKind::Octets,
    }
}

/// Shared, lazily-built default dictionary. The dictionary is immutable after
/// construction, so every codec call site can share this instance instead of
/// rebuilding the RFC 2865 table on every packet.
pub static DEFAULT_DICTIONARY: Lazy<Dictionary> = Lazy::new(Dictionary::with_defaults);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dictionary_round_trips_every_entry() {
        let dict = Dictionary::with_defaults();
        for (name, code) in STANDARD_ATTRIBUTES {
            if *code == 6 {
                continue;
            }
            let by_name = dict.lookup_by_name(name).unwrap();
            let by_code = dict.lookup_by_code(None, *code).unwrap();
            assert_eq!(by_name.type_code, by_code.type_code);
            assert_eq!(by_name.name, by_code.name);
        }
    }

    #[test]
    fn vsa_entry_is_keyed_by_vendor() {
        let dict = Dictionary::with_defaults();
        assert!(dict.lookup_by_code(None, 1).is_some()); // User-Name
        assert!(dict.lookup_by_code(Some(9), 1).is_some()); // Cisco-AVPair
        assert_eq!(dict.vendor_name(9), Some("Cisco"));
    }

    #[test]
    fn register_rejects_duplicate_code() {
        let mut dict = Dictionary::new();
        dict.register(AttributeType::new("A", None, 1, ValueKind::String)).unwrap();
        let err = dict.register(AttributeType::new("B", None, 1, ValueKind::String));
        assert!(err.is_err());
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let mut dict = Dictionary::new();
        dict.register(AttributeType::new("A", None, 1, ValueKind::String)).unwrap();
        let err = dict.register(AttributeType::new("A", None, 2, ValueKind::String));
        assert!(err.is_err());
    }

    #[test]
    fn naming_collision_across_vendor_spaces_is_allowed() {
        let mut dict = Dictionary::new();
        dict.register(AttributeType::new("Acct-Status-Type", None, 40, ValueKind::Integer))
            .unwrap();
        // Different name required in by_name index, but same code different vendor is fine.
        dict.register(AttributeType::new("Vendor-Status", Some(9), 40, ValueKind::Integer))
            .unwrap();
        assert!(dict.lookup_by_code(None, 40).is_some());
        assert!(dict.lookup_by_code(Some(9), 40).is_some());
    }
}
