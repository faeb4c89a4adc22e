// codec.rs - wire encode/decode, authenticator application, and PAP hook dispatch (component G)
//
// The header layout is fixed: code(1) | identifier(1) | length_be(2) | authenticator(16)
// | attributes. Everything else here is about *when* to run the per-PacketKind hooks
// from authenticator.rs relative to attribute serialization, which is the part the
// teacher's protocol.rs never got right (its message-authenticator calculation was a
// stub that always returned sixteen zero bytes).

use crate::attribute::Attribute;
use crate::authenticator::{
    create_access_request_authenticator, create_accounting_request_authenticator,
    create_response_authenticator, pap_deobfuscate, pap_obfuscate,
    verify_accounting_request_authenticator, verify_response_authenticator,
};
use crate::dictionary::Dictionary;
use crate::error::{RadiusError, Result};
use crate::packet::{Packet, PacketCode, PacketKind};

pub const HEADER_LEN: usize = 20;
pub const MAX_PACKET_LEN: usize = 4096;

const USER_PASSWORD_CODE: u8 = 2;

/// Encode a client-originated request (Access-Request or Accounting-Request),
/// installing its authenticator and running the PAP obfuscation hook in place.
pub fn encode_request(packet: &mut Packet, secret: &[u8]) -> Result<Vec<u8>> {
    match packet.kind() {
        PacketKind::AccessRequest => {
            let authenticator = create_access_request_authenticator(secret);
            packet.set_authenticator(authenticator);
            obfuscate_user_password(packet, secret)?;
            let attrs = encode_attributes(packet)?;
            check_length(HEADER_LEN + attrs.len())?;
            Ok(build_wire(packet.code().to_u8(), packet.identifier(), packet.authenticator(), &attrs))
        }
        PacketKind::AccountingRequest => {
            let attrs = encode_attributes(packet)?;
            let length = HEADER_LEN + attrs.len();
            check_length(length)?;
            let authenticator = create_accounting_request_authenticator(
                packet.code().to_u8(),
                packet.identifier(),
                length as u16,
                &attrs,
                secret,
            );
            packet.set_authenticator(authenticator);
            Ok(build_wire(packet.code().to_u8(), packet.identifier(), packet.authenticator(), &attrs))
        }
        PacketKind::Generic => Err(RadiusError::MalformedPacket(format!(
            "{} is not a request code this client originates",
            packet.code().name()
        ))),
    }
}

/// Encode a reply to `request_authenticator`, deriving the response authenticator
/// after attributes are serialized.
pub fn encode_response(packet: &mut Packet, request_authenticator: &[u8; 16], secret: &[u8]) -> Result<Vec<u8>> {
    let attrs = encode_attributes(packet)?;
    let length = HEADER_LEN + attrs.len();
    check_length(length)?;
    let authenticator = create_response_authenticator(
        packet.code().to_u8(),
        packet.identifier(),
        length as u16,
        request_authenticator,
        &attrs,
        secret,
    );
    packet.set_authenticator(authenticator);
    Ok(build_wire(packet.code().to_u8(), packet.identifier(), packet.authenticator(), &attrs))
}

/// Decode an inbound request datagram (server side). Access-Request's authenticator is
/// never checked here — see SPEC_FULL REDESIGN FLAGS (i), it only seeds PAP. Accounting-
/// Request's authenticator is checked because it is a deterministic function of the
/// packet body.
pub fn decode_request(dict: &Dictionary, data: &[u8], secret: &[u8]) -> Result<Packet> {
    let (mut packet, attrs_region, length) = decode_header_and_attributes(dict, data)?;

    match packet.kind() {
        PacketKind::AccessRequest => {
            deobfuscate_user_password(&mut packet, secret);
        }
        PacketKind::AccountingRequest => {
            verify_accounting_request_authenticator(
                packet.code().to_u8(),
                packet.identifier(),
                length as u16,
                packet.authenticator(),
                attrs_region,
                secret,
            )?;
        }
        PacketKind::Generic => {}
    }

    Ok(packet)
}

/// Decode an inbound response datagram (client side), verifying it matches the request
/// that prompted it.
pub fn decode_response(
    dict: &Dictionary,
    data: &[u8],
    expected_identifier: u8,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<Packet> {
    let (packet, attrs_region, length) = decode_header_and_attributes(dict, data)?;

    if packet.identifier() != expected_identifier {
        return Err(RadiusError::IdentifierMismatch {
            expected: expected_identifier,
            actual: packet.identifier(),
        });
    }

    verify_response_authenticator(
        packet.code().to_u8(),
        packet.identifier(),
        length as u16,
        request_authenticator,
        attrs_region,
        secret,
        packet.authenticator(),
    )?;

    Ok(packet)
}

fn decode_header_and_attributes<'a>(dict: &Dictionary, data: &'a [u8]) -> Result<(Packet, &'a [u8], usize)> {
    if data.len() < HEADER_LEN {
        return Err(RadiusError::MalformedPacket(format!(
            "datagram of {} bytes is shorter than the {HEADER_LEN}-byte header",
            data.len()
        )));
    }

    let code = data[0];
    let identifier = data[1];
    let length = u16::from_be_bytes([data[2], data[3]]) as usize;
    let mut authenticator = [0u8; 16];
    authenticator.copy_from_slice(&data[4..20]);

    if !(HEADER_LEN..=MAX_PACKET_LEN).contains(&length) {
        return Err(RadiusError::MalformedPacket(format!(
            "packet length {length} outside the valid [{HEADER_LEN}, {MAX_PACKET_LEN}] range"
        )));
    }
    if length != data.len() {
        return Err(RadiusError::MalformedPacket(format!(
            "packet length field says {length} bytes but datagram is {} bytes",
            data.len()
        )));
    }

    let packet_code = PacketCode::from_u8(code)
        .ok_or_else(|| RadiusError::MalformedPacket(format!("unknown packet code {code}")))?;

    let attrs_region = &data[HEADER_LEN..length];
    let mut packet = Packet::new(packet_code, identifier, authenticator);
    let mut offset = 0;
    while offset < attrs_region.len() {
        let (attribute, consumed) = Attribute::decode(dict, &attrs_region[offset..])?;
        packet.add_attribute(attribute);
        offset += consumed;
    }

    Ok((packet, attrs_region, length))
}

fn encode_attributes(packet: &Packet) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for attribute in packet.attributes() {
        out.extend(attribute.encode()?);
    }
    Ok(out)
}

fn build_wire(code: u8, identifier: u8, authenticator: &[u8; 16], attrs: &[u8]) -> Vec<u8> {
    let length = (HEADER_LEN + attrs.len()) as u16;
    let mut out = Vec::with_capacity(length as usize);
    out.push(code);
    out.push(identifier);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(authenticator);
    out.extend_from_slice(attrs);
    out
}

fn check_length(length: usize) -> Result<()> {
    if length > MAX_PACKET_LEN {
        return Err(RadiusError::MalformedPacket(format!(
            "encoded packet would be {length} bytes, exceeding the {MAX_PACKET_LEN}-byte maximum"
        )));
    }
    Ok(())
}

fn obfuscate_user_password(packet: &mut Packet, secret: &[u8]) -> Result<()> {
    let authenticator = *packet.authenticator();
    for attribute in packet.attributes_mut() {
        if attribute.type_code() == USER_PASSWORD_CODE && attribute.vendor_id().is_none() {
            if let Attribute::String { type_code, vendor_id, value } = attribute {
                let cipher = pap_obfuscate(value.as_bytes(), secret, &authenticator)?;
                *attribute = Attribute::Octets {
                    type_code: *type_code,
                    vendor_id: *vendor_id,
                    value: cipher,
                };
            }
        }
    }
    Ok(())
}

fn deobfuscate_user_password(packet: &mut Packet, secret: &[u8]) {
    let authenticator = *packet.authenticator();
    for attribute in packet.attributes_mut() {
        if attribute.type_code() == USER_PASSWORD_CODE && attribute.vendor_id().is_none() {
            if let Attribute::Octets { type_code, vendor_id, value } = attribute {
                let plain = pap_deobfuscate(value, secret, &authenticator);
                *attribute = Attribute::String {
                    type_code: *type_code,
                    vendor_id: *vendor_id,
                    value: String::from_utf8_lossy(&plain).into_owned(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    #[test]
    fn access_request_round_trips_through_wire_with_password_obfuscated() {
        let dict = Dictionary::with_defaults();
        let secret = b"sharedsecret";
        let mut request = Packet::access_request(&dict, "alice", "hunter2").unwrap();

        let wire = encode_request(&mut request, secret).unwrap();
        assert_eq!(u16::from_be_bytes([wire[2], wire[3]]) as usize, wire.len());

        let decoded = decode_request(&dict, &wire, secret).unwrap();
        let user = decoded.get_attribute(&dict, "User-Name").unwrap();
        assert_eq!(user, &Attribute::String { type_code: 1, vendor_id: None, value: "alice".into() });
        let password = decoded.get_attribute(&dict, "User-Password").unwrap();
        assert_eq!(password, &Attribute::String { type_code: 2, vendor_id: None, value: "hunter2".into() });
    }

    #[test]
    fn response_round_trips_and_matches_request() {
        let dict = Dictionary::with_defaults();
        let secret = b"sharedsecret";
        let mut request = Packet::access_request(&dict, "bob", "letmein").unwrap();
        let request_wire = encode_request(&mut request, secret).unwrap();
        let decoded_request = decode_request(&dict, &request_wire, secret).unwrap();

        let mut response = decoded_request.create_response(PacketCode::AccessAccept);
        response.add_attribute(Attribute::string(&dict, "Reply-Message", "welcome").unwrap());
        let response_wire = encode_response(&mut response, decoded_request.authenticator(), secret).unwrap();

        let decoded_response = decode_response(
            &dict,
            &response_wire,
            decoded_request.identifier(),
            decoded_request.authenticator(),
            secret,
        )
        .unwrap();
        assert_eq!(decoded_response.code(), PacketCode::AccessAccept);
    }

    #[test]
    fn response_decode_rejects_identifier_mismatch() {
        let dict = Dictionary::with_defaults();
        let secret = b"sharedsecret";
        let request_authenticator = [0x42u8; 16];
        let mut response = Packet::new(PacketCode::AccessAccept, 9, request_authenticator);
        let wire = encode_response(&mut response, &request_authenticator, secret).unwrap();

        let err = decode_response(&dict, &wire, 8, &request_authenticator, secret).unwrap_err();
        assert!(matches!(err, RadiusError::IdentifierMismatch { expected: 8, actual: 9 }));
    }

    #[test]
    fn response_decode_rejects_wrong_secret() {
        let dict = Dictionary::with_defaults();
        let request_authenticator = [0x42u8; 16];
        let mut response = Packet::new(PacketCode::AccessAccept, 3, request_authenticator);
        let wire = encode_response(&mut response, &request_authenticator, b"correct-secret").unwrap();

        let err = decode_response(&dict, &wire, 3, &request_authenticator, b"wrong-secret").unwrap_err();
        assert!(matches!(err, RadiusError::AuthenticatorMismatch { identifier: 3 }));
    }

    #[test]
    fn accounting_request_round_trips_with_verified_authenticator() {
        let dict = Dictionary::with_defaults();
        let secret = b"acctsecret";
        let attrs = vec![
            Attribute::string(&dict, "User-Name", "carol").unwrap(),
            Attribute::integer(&dict, "Acct-Status-Type", 1).unwrap(),
        ];
        let mut request = Packet::accounting_request(attrs);
        let wire = encode_request(&mut request, secret).unwrap();
        let decoded = decode_request(&dict, &wire, secret).unwrap();
        assert_eq!(decoded.code(), PacketCode::AccountingRequest);
    }

    #[test]
    fn truncated_datagram_is_rejected() {
        let dict = Dictionary::with_defaults();
        let err = decode_request(&dict, &[1, 2, 3], b"secret").unwrap_err();
        assert!(matches!(err, RadiusError::MalformedPacket(_)));
    }

    #[test]
    fn length_field_mismatch_is_rejected() {
        let dict = Dictionary::with_defaults();
        let mut wire = vec![1u8, 1, 0, 20];
        wire.extend_from_slice(&[0u8; 16]);
        wire.push(0xFF); // trailing byte the length field doesn't account for
        let err = decode_request(&dict, &wire, b"secret").unwrap_err();
        assert!(matches!(err, RadiusError::MalformedPacket(_)));
    }
}
