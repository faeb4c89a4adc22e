// attribute.rs - typed attribute values and the Vendor-Specific Attribute container
// (components C and D)
//
// Attribute polymorphism is a tagged variant dictated by the dictionary's declared
// value-kind for a given (vendor, code) pair, not a subclass tower (see SPEC_FULL
// Design Notes). Vsa is the one composite shape: a four-byte vendor-id prefix followed
// by an ordered list of sub-attributes, each itself an Attribute.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use crate::dictionary::{Dictionary, ValueKind};
use crate::error::{RadiusError, Result};

const MAX_VALUE_LEN: usize = 253;
const MAX_VSA_INNER_LEN: usize = 251;

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    String {
        type_code: u8,
        vendor_id: Option<u32>,
        value: String,
    },
    Integer {
        type_code: u8,
        vendor_id: Option<u32>,
        value: i32,
    },
    IpAddr {
        type_code: u8,
        vendor_id: Option<u32>,
        value: Ipv4Addr,
    },
    Octets {
        type_code: u8,
        vendor_id: Option<u32>,
        value: Vec<u8>,
    },
    Vsa(Vsa),
}

impl Attribute {
    pub fn type_code(&self) -> u8 {
        match self {
            Attribute::String { type_code, .. }
            | Attribute::Integer { type_code, .. }
            | Attribute::IpAddr { type_code, .. }
            | Attribute::Octets { type_code, .. } => *type_code,
            Attribute::Vsa(_) => 26,
        }
    }

    pub fn vendor_id(&self) -> Option<u32> {
        match self {
            Attribute::String { vendor_id, .. }
            | Attribute::Integer { vendor_id, .. }
            | Attribute::IpAddr { vendor_id, .. }
            | Attribute::Octets { vendor_id, .. } => *vendor_id,
            Attribute::Vsa(_) => None,
        }
    }

    pub fn name(&self, dict: &Dictionary) -> String {
        if let Attribute::Vsa(_) = self {
            return "Vendor-Specific".to_string();
        }
        dict.lookup_by_code(self.vendor_id(), self.type_code())
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("Unknown-{}", self.type_code()))
    }

    // --- Typed constructors, looked up by dictionary name ---

    pub fn string(dict: &Dictionary, name: &str, value: impl Into<String>) -> Result<Self> {
        let entry = lookup(dict, name)?;
        require_kind(entry_name(entry), entry.kind, ValueKind::String)?;
        let value = value.into();
        if value.is_empty() {
            return Err(RadiusError::InvalidValue {
                name: name.to_string(),
                reason: "string attribute value must not be empty".to_string(),
            });
        }
        if value.len() > MAX_VALUE_LEN {
            return Err(RadiusError::AttributeTooLong {
                name: name.to_string(),
                len: value.len(),
            });
        }
        Ok(Attribute::String {
            type_code: entry.type_code,
            vendor_id: entry.vendor_id,
            value,
        })
    }

    pub fn integer(dict: &Dictionary, name: &str, value: i32) -> Result<Self> {
        let entry = lookup(dict, name)?;
        require_kind(entry_name(entry), entry.kind, ValueKind::Integer)?;
        Ok(Attribute::Integer {
            type_code: entry.type_code,
            vendor_id: entry.vendor_id,
            value,
        })
    }

    pub fn integer_named(dict: &Dictionary, name: &str, alias: &str) -> Result<Self> {
        let entry = lookup(dict, name)?;
        require_kind(entry_name(entry), entry.kind, ValueKind::Integer)?;
        let value = *entry.named_values.get(alias).ok_or_else(|| RadiusError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{alias}' is not a known named value"),
        })?;
        Ok(Attribute::Integer {
            type_code: entry.type_code,
            vendor_id: entry.vendor_id,
            value,
        })
    }

    pub fn ipaddr(dict: &Dictionary, name: &str, value: Ipv4Addr) -> Result<Self> {
        let entry = lookup(dict, name)?;
        require_kind(entry_name(entry), entry.kind, ValueKind::IpAddr)?;
        Ok(Attribute::IpAddr {
            type_code: entry.type_code,
            vendor_id: entry.vendor_id,
            value,
        })
    }

    pub fn octets(dict: &Dictionary, name: &str, value: impl Into<Vec<u8>>) -> Result<Self> {
        let entry = lookup(dict, name)?;
        require_kind(entry_name(entry), entry.kind, ValueKind::Octets)?;
        let value = value.into();
        if value.len() > MAX_VALUE_LEN {
            return Err(RadiusError::AttributeTooLong {
                name: name.to_string(),
                len: value.len(),
            });
        }
        Ok(Attribute::Octets {
            type_code: entry.type_code,
            vendor_id: entry.vendor_id,
            value,
        })
    }

    /// Generic string-based setter: parses `raw` according to the dictionary's declared
    /// kind for `name`, failing with `InvalidValue` if `raw` cannot be parsed for that
    /// kind. Integer attributes accept either a decimal literal or a named alias.
    pub fn from_name_and_str(dict: &Dictionary, name: &str, raw: &str) -> Result<Self> {
        let entry = lookup(dict, name)?;
        match entry.kind {
            ValueKind::String => Attribute::string(dict, name, raw),
            ValueKind::Integer => match raw.parse::<i32>() {
                Ok(value) => Attribute::integer(dict, name, value),
                Err(_) => Attribute::integer_named(dict, name, raw),
            },
            ValueKind::IpAddr => {
                let addr: Ipv4Addr = raw.parse().map_err(|_| RadiusError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("'{raw}' is not a dotted-quad IPv4 address"),
                })?;
                Attribute::ipaddr(dict, name, addr)
            }
            ValueKind::Octets => {
                let bytes = decode_hex(raw).map_err(|_| RadiusError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("'{raw}' is not valid hex"),
                })?;
                Attribute::octets(dict, name, bytes)
            }
        }
    }

    /// Serialize this attribute's TLV (or, for a VSA, its full nested TLV).
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Attribute::String { type_code, value, .. } => encode_tlv(*type_code, value.as_bytes()),
            Attribute::Integer { type_code, value, .. } => {
                encode_tlv(*type_code, &value.to_be_bytes())
            }
            Attribute::IpAddr { type_code, value, .. } => encode_tlv(*type_code, &value.octets()),
            Attribute::Octets { type_code, value, .. } => encode_tlv(*type_code, value),
            Attribute::Vsa(vsa) => vsa.encode(),
        }
    }

    /// Decode one attribute TLV from the front of `data`, returning the attribute and
    /// the number of bytes it consumed.
    pub fn decode(dict: &Dictionary, data: &[u8]) -> Result<(Attribute, usize)> {
        if data.len() < 2 {
            return Err(RadiusError::MalformedPacket(
                "incomplete attribute header".to_string(),
            ));
        }
        let type_code = data[0];
        let length = data[1] as usize;
        if length < 2 {
            return Err(RadiusError::MalformedAttribute {
                attr_type: type_code,
                reason: format!("attribute length {length} is less than the 2-byte header"),
            });
        }
        if length > data.len() {
            return Err(RadiusError::MalformedAttribute {
                attr_type: type_code,
                reason: "attribute extends beyond the packet".to_string(),
            });
        }
        let value = &data[2..length];

        if type_code == 26 {
            let vsa = Vsa::decode(dict, value)?;
            return Ok((Attribute::Vsa(vsa), length));
        }

        let attribute = match dict.lookup_by_code(None, type_code).map(|t| t.kind) {
            Some(ValueKind::String) => Attribute::String {
                type_code,
                vendor_id: None,
                value: String::from_utf8_lossy(value).into_owned(),
            },
            Some(ValueKind::Integer) => {
                if value.len() != 4 {
                    return Err(RadiusError::MalformedAttribute {
                        attr_type: type_code,
                        reason: format!("integer attribute has {} value bytes, expected 4", value.len()),
                    });
                }
                Attribute::Integer {
                    type_code,
                    vendor_id: None,
                    value: i32::from_be_bytes([value[0], value[1], value[2], value[3]]),
                }
            }
            Some(ValueKind::IpAddr) => {
                if value.len() != 4 {
                    return Err(RadiusError::MalformedAttribute {
                        attr_type: type_code,
                        reason: format!("ipaddr attribute has {} value bytes, expected 4", value.len()),
                    });
                }
                Attribute::IpAddr {
                    type_code,
                    vendor_id: None,
                    value: Ipv4Addr::new(value[0], value[1], value[2], value[3]),
                }
            }
            Some(ValueKind::Octets) | None => Attribute::Octets {
                type_code,
                vendor_id: None,
                value: value.to_vec(),
            },
        };

        Ok((attribute, length))
    }
}

fn encode_tlv(type_code: u8, value: &[u8]) -> Result<Vec<u8>> {
    if value.len() > MAX_VALUE_LEN {
        return Err(RadiusError::AttributeTooLong {
            name: format!("type {type_code}"),
            len: value.len(),
        });
    }
    let mut buf = BytesMut::with_capacity(2 + value.len());
    buf.put_u8(type_code);
    buf.put_u8((2 + value.len()) as u8);
    buf.put_slice(value);
    Ok(buf.to_vec())
}

fn lookup<'d>(dict: &'d Dictionary, name: &str) -> Result<&'d crate::dictionary::AttributeType> {
    dict.lookup_by_name(name)
        .ok_or_else(|| RadiusError::UnknownAttribute(name.to_string()))
}

fn entry_name(entry: &crate::dictionary::AttributeType) -> &str {
    &entry.name
}

fn require_kind(name: &str, actual: ValueKind, expected: ValueKind) -> Result<()> {
    if actual != expected {
        return Err(RadiusError::InvalidValue {
            name: name.to_string(),
            reason: format!("attribute is declared as {actual:?}, not {expected:?}"),
        });
    }
    Ok(())
}

fn decode_hex(s: &str) -> std::result::Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let byte = std::str::from_utf8(chunk).ok().and_then(|h| u8::from_str_radix(h, 16).ok());
        out.push(byte.ok_or(())?);
    }
    Ok(out)
}

/// Vendor-Specific Attribute: a four-byte vendor-id prefix followed by an ordered list
/// of sub-attributes, each implicitly scoped to `vendor_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vsa {
    pub vendor_id: u32,
    pub sub_attributes: Vec<Attribute>,
}

impl Vsa {
    pub fn new(vendor_id: u32) -> Self {
        Self {
            vendor_id,
            sub_attributes: Vec::new(),
        }
    }

    pub fn add(&mut self, sub: Attribute) {
        self.sub_attributes.push(sub);
    }

    pub fn get_by_code(&self, code: u8) -> Vec<&Attribute> {
        self.sub_attributes.iter().filter(|a| a.type_code() == code).collect()
    }

    /// Returns the single sub-attribute with this code, failing if more than one entry
    /// shares the type.
    pub fn get_one_by_code(&self, code: u8) -> Result<Option<&Attribute>> {
        let mut matches = self.get_by_code(code).into_iter();
        match (matches.next(), matches.next()) {
            (None, _) => Ok(None),
            (Some(a), None) => Ok(Some(a)),
            (Some(_), Some(_)) => Err(RadiusError::MalformedAttribute {
                attr_type: code,
                reason: "multiple sub-attributes share this type code".to_string(),
            }),
        }
    }

    /// Remove every sub-attribute with this code, preserving the order of the rest.
    /// See SPEC_FULL REDESIGN FLAGS (iii): this must actually delete matching entries.
    pub fn remove_by_code(&mut self, code: u8) {
        self.sub_attributes.retain(|a| a.type_code() != code);
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut value = BytesMut::new();
        value.put_u32(self.vendor_id);
        for sub in &self.sub_attributes {
            value.put_slice(&sub.encode()?);
        }
        if value.len() > MAX_VSA_INNER_LEN {
            return Err(RadiusError::AttributeTooLong {
                name: "Vendor-Specific".to_string(),
                len: value.len(),
            });
        }

        let mut out = BytesMut::with_capacity(2 + value.len());
        out.put_u8(26);
        out.put_u8((2 + value.len()) as u8);
        out.put_slice(&value);
        Ok(out.to_vec())
    }

    /// `value` is the attribute's value region (i.e. everything after the outer
    /// type+length header).
    pub fn decode(dict: &Dictionary, value: &[u8]) -> Result<Self> {
        if value.len() < 4 {
            return Err(RadiusError::MalformedAttribute {
                attr_type: 26,
                reason: "Vendor-Specific attribute shorter than the 4-byte vendor-id".to_string(),
            });
        }
        let vendor_id = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
        let sub_region = &value[4..];

        let mut sub_attributes = Vec::new();
        let mut offset = 0;
        while offset < sub_region.len() {
            let remaining = &sub_region[offset..];
            if remaining.len() < 2 {
                return Err(RadiusError::MalformedAttribute {
                    attr_type: 26,
                    reason: "incomplete sub-attribute header".to_string(),
                });
            }
            let code = remaining[0];
            let length = remaining[1] as usize;
            if length < 2 || length > remaining.len() {
                return Err(RadiusError::MalformedAttribute {
                    attr_type: 26,
                    reason: format!("sub-attribute length {length} is invalid"),
                });
            }
            let sub_value = &remaining[2..length];
            let kind = dict
                .lookup_by_code(Some(vendor_id), code)
                .map(|t| t.kind)
                .unwrap_or(ValueKind::Octets);
            let sub = match kind {
                ValueKind::String => Attribute::String {
                    type_code: code,
                    vendor_id: Some(vendor_id),
                    value: String::from_utf8_lossy(sub_value).into_owned(),
                },
                ValueKind::Integer if sub_value.len() == 4 => Attribute::Integer {
                    type_code: code,
                    vendor_id: Some(vendor_id),
                    value: i32::from_be_bytes([sub_value[0], sub_value[1], sub_value[2], sub_value[3]]),
                },
                ValueKind::IpAddr if sub_value.len() == 4 => Attribute::IpAddr {
                    type_code: code,
                    vendor_id: Some(vendor_id),
                    value: Ipv4Addr::new(sub_value[0], sub_value[1], sub_value[2], sub_value[3]),
                },
                _ => Attribute::Octets {
                    type_code: code,
                    vendor_id: Some(vendor_id),
                    value: sub_value.to_vec(),
                },
            };
            sub_attributes.push(sub);
            offset += length;
        }

        if offset != sub_region.len() {
            return Err(RadiusError::MalformedAttribute {
                attr_type: 26,
                reason: "sub-attribute walk did not consume exactly the value region".to_string(),
            });
        }

        Ok(Vsa { vendor_id, sub_attributes })
    }
}
