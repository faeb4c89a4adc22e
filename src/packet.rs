// packet.rs - packet header, attribute list, and per-shape hook dispatch (component E)
//
// The teacher's protocol.rs models packet subtypes as data with no behavioral
// specialization, and keeps attributes in a HashMap<String, Attribute> that silently
// collapses repeated attribute names. SPEC_FULL's data model requires insertion-order
// preservation for repeated attributes, so attributes live in an ordered Vec here. The
// small enumerated PacketKind stands in for the "inheritance hierarchy" the Design Notes
// call out: encode/decode hook dispatch in codec.rs matches on it instead of relying on
// virtual dispatch.

use crate::dictionary::Dictionary;
use crate::identifier::next_identifier;

use super::attribute::Attribute;

/// RADIUS packet type codes (RFC 2865 / RFC 2866 / RFC 2882 / RFC 3576).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketCode {
    AccessRequest = 1,
    AccessAccept = 2,
    AccessReject = 3,
    AccountingRequest = 4,
    AccountingResponse = 5,
    AccessChallenge = 11,
    StatusServer = 12,
    StatusClient = 13,
    DisconnectRequest = 40,
    DisconnectAck = 41,
    DisconnectNak = 42,
    CoaRequest = 43,
    CoaAck = 44,
    CoaNak = 45,
    Reserved = 255,
}

impl PacketCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::AccessRequest),
            2 => Some(Self::AccessAccept),
            3 => Some(Self::AccessReject),
            4 => Some(Self::AccountingRequest),
            5 => Some(Self::AccountingResponse),
            11 => Some(Self::AccessChallenge),
            12 => Some(Self::StatusServer),
            13 => Some(Self::StatusClient),
            40 => Some(Self::DisconnectRequest),
            41 => Some(Self::DisconnectAck),
            42 => Some(Self::DisconnectNak),
            43 => Some(Self::CoaRequest),
            44 => Some(Self::CoaAck),
            45 => Some(Self::CoaNak),
            255 => Some(Self::Reserved),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AccessRequest => "Access-Request",
            Self::AccessAccept => "Access-Accept",
            Self::AccessReject => "Access-Reject",
            Self::AccountingRequest => "Accounting-Request",
            Self::AccountingResponse => "Accounting-Response",
            Self::AccessChallenge => "Access-Challenge",
            Self::StatusServer => "Status-Server",
            Self::StatusClient => "Status-Client",
            Self::DisconnectRequest => "Disconnect-Request",
            Self::DisconnectAck => "Disconnect-ACK",
            Self::DisconnectNak => "Disconnect-NAK",
            Self::CoaRequest => "CoA-Request",
            Self::CoaAck => "CoA-ACK",
            Self::CoaNak => "CoA-NAK",
            Self::Reserved => "Reserved",
        }
    }
}

/// The small enumerated set of encode/decode hook shapes (see Design Notes). Access-
/// Request obfuscates/deobfuscates User-Password; Accounting-Request computes/verifies
/// its own authenticator from the zero-filled draft; everything else is Generic and
/// carries no request-side hooks at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    AccessRequest,
    AccountingRequest,
    Generic,
}

#[derive(Debug, Clone)]
pub struct Packet {
    code: PacketCode,
    identifier: u8,
    authenticator: [u8; 16],
    attributes: Vec<Attribute>,
}

impl Packet {
    pub fn new(code: PacketCode, identifier: u8, authenticator: [u8; 16]) -> Self {
        Self {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    /// Build an Access-Request with the request authenticator left as a placeholder;
    /// the wire codec fills it in at encode time (§4.F/§4.G) before obfuscating
    /// User-Password, which this factory stores as raw cleartext.
    pub fn access_request(dict: &Dictionary, user: &str, password: &str) -> crate::error::Result<Self> {
        let mut packet = Self::new(PacketCode::AccessRequest, next_identifier(), [0u8; 16]);
        packet.add_attribute(Attribute::string(dict, "User-Name", user)?);
        packet.add_attribute(Attribute::string(dict, "User-Password", password)?);
        Ok(packet)
    }

    /// Build an Accounting-Request with a zero-initialized authenticator; the wire
    /// codec computes and fills in the real authenticator after serializing attributes
    /// (§4.F).
    pub fn accounting_request(attributes: Vec<Attribute>) -> Self {
        let mut packet = Self::new(PacketCode::AccountingRequest, next_identifier(), [0u8; 16]);
        packet.attributes = attributes;
        packet
    }

    /// Build a reply sharing this packet's identifier and authenticator (the
    /// authenticator is overwritten by the codec's response-authenticator derivation at
    /// encode time).
    pub fn create_response(&self, code: PacketCode) -> Self {
        Self {
            code,
            identifier: self.identifier,
            authenticator: self.authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn code(&self) -> PacketCode {
        self.code
    }

    pub fn kind(&self) -> PacketKind {
        match self.code {
            PacketCode::AccessRequest => PacketKind::AccessRequest,
            PacketCode::AccountingRequest => PacketKind::AccountingRequest,
            _ => PacketKind::Generic,
        }
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn authenticator(&self) -> &[u8; 16] {
        &self.authenticator
    }

    pub fn set_authenticator(&mut self, authenticator: [u8; 16]) {
        self.authenticator = authenticator;
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// First attribute matching `name` in the dictionary, if present.
    pub fn get_attribute<'a>(&'a self, dict: &Dictionary, name: &str) -> Option<&'a Attribute> {
        let entry = dict.lookup_by_name(name)?;
        self.attributes
            .iter()
            .find(|a| a.vendor_id() == entry.vendor_id && a.type_code() == entry.type_code)
    }

    /// Every attribute matching `name`, in wire order.
    pub fn get_attributes<'a>(&'a self, dict: &Dictionary, name: &str) -> Vec<&'a Attribute> {
        let Some(entry) = dict.lookup_by_name(name) else {
            return Vec::new();
        };
        self.attributes
            .iter()
            .filter(|a| a.vendor_id() == entry.vendor_id && a.type_code() == entry.type_code)
            .collect()
    }

    /// Remove every top-level attribute with this type code, preserving the order of
    /// the rest. See SPEC_FULL REDESIGN FLAGS (ii): a naive index-decrementing removal
    /// loop is explicitly rejected in favor of `retain`.
    pub fn remove_attributes(&mut self, type_code: u8) {
        self.attributes.retain(|a| a.type_code() != type_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    #[test]
    fn access_request_carries_username_and_raw_password() {
        let dict = Dictionary::with_defaults();
        let packet = Packet::access_request(&dict, "alice", "hunter2").unwrap();
        assert_eq!(packet.code(), PacketCode::AccessRequest);
        assert_eq!(packet.kind(), PacketKind::AccessRequest);
        let user = packet.get_attribute(&dict, "User-Name").unwrap();
        assert_eq!(user, &Attribute::String { type_code: 1, vendor_id: None, value: "alice".into() });
    }

    #[test]
    fn create_response_copies_identifier_and_authenticator() {
        let dict = Dictionary::with_defaults();
        let request = Packet::new(PacketCode::AccessRequest, 7, [0x01; 16]);
        let response = request.create_response(PacketCode::AccessAccept);
        assert_eq!(response.identifier(), 7);
        assert_eq!(response.authenticator(), &[0x01; 16]);
        assert!(response.attributes().is_empty());
        let _ = dict; // dictionary not needed further here, kept for clarity of intent
    }

    #[test]
    fn remove_attributes_deletes_all_matches_preserving_order() {
        let dict = Dictionary::with_defaults();
        let mut packet = Packet::new(PacketCode::AccessAccept, 1, [0u8; 16]);
        packet.add_attribute(Attribute::string(&dict, "Reply-Message", "a").unwrap());
        packet.add_attribute(Attribute::octets(&dict, "State", vec![1]).unwrap());
        packet.add_attribute(Attribute::string(&dict, "Reply-Message", "b").unwrap());
        packet.remove_attributes(18); // Reply-Message
        let remaining: Vec<u8> = packet.attributes().iter().map(|a| a.type_code()).collect();
        assert_eq!(remaining, vec![24]); // only State left
    }

    #[test]
    fn empty_attribute_list_has_no_attributes() {
        let packet = Packet::new(PacketCode::AccessAccept, 1, [0u8; 16]);
        assert!(packet.attributes().is_empty());
    }
}
