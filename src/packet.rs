// packet.rs - RADIUS packet header, attribute list, and authenticator codec
// (RFC 2865 §3, §4, §5; RFC 2869 §5.14; RFC 6929 §2.1)
//
// This replaces the teacher's `protocol.rs`, which hard-coded three
// attribute types directly into `encode`/`decode` match arms and left the
// Authenticator and Message-Authenticator as TODO stubs returning
// `vec![0; 16]`. The shape survives -- a `Packet` type addressed by
// symbolic attribute name, an encode/decode pair on a processor-like
// entry point -- the wire-format correctness does not.

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use rand::RngCore;

use crate::attr_type::{DataType, Value};
use crate::crypto;
use crate::dictionary::{AttrCode, Dictionary, ExtendedCode};
use crate::error::{DecodeError, EncodeError};

pub const MIN_PACKET_LEN: usize = 20;
pub const MAX_PACKET_LEN: usize = 4096;
const MESSAGE_AUTHENTICATOR_CODE: u8 = 80;
const EAP_MESSAGE_CODE: u8 = 79;

/// RADIUS packet codes (RFC 2865 §3, RFC 2866 §3, RFC 2869 §5.13, RFC 5176 §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketCode {
    AccessRequest,
    AccessAccept,
    AccessReject,
    AccountingRequest,
    AccountingResponse,
    AccessChallenge,
    StatusServer,
    StatusClient,
    DisconnectRequest,
    DisconnectAck,
    DisconnectNak,
    CoaRequest,
    CoaAck,
    CoaNak,
}

impl PacketCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::AccessRequest,
            2 => Self::AccessAccept,
            3 => Self::AccessReject,
            4 => Self::AccountingRequest,
            5 => Self::AccountingResponse,
            11 => Self::AccessChallenge,
            12 => Self::StatusServer,
            13 => Self::StatusClient,
            40 => Self::DisconnectRequest,
            41 => Self::DisconnectAck,
            42 => Self::DisconnectNak,
            43 => Self::CoaRequest,
            44 => Self::CoaAck,
            45 => Self::CoaNak,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::AccessRequest => 1,
            Self::AccessAccept => 2,
            Self::AccessReject => 3,
            Self::AccountingRequest => 4,
            Self::AccountingResponse => 5,
            Self::AccessChallenge => 11,
            Self::StatusServer => 12,
            Self::StatusClient => 13,
            Self::DisconnectRequest => 40,
            Self::DisconnectAck => 41,
            Self::DisconnectNak => 42,
            Self::CoaRequest => 43,
            Self::CoaAck => 44,
            Self::CoaNak => 45,
        }
    }

    /// Request Authenticator is a fresh random value (RFC 2865 §3 /
    /// RFC 2869 §5.13), rather than the MD5-of-zeros form below.
    pub fn uses_random_authenticator(self) -> bool {
        matches!(self, Self::AccessRequest | Self::StatusServer)
    }

    /// Request Authenticator = MD5(code|id|len|16 zero bytes|attrs|secret)
    /// (RFC 2866 §3, RFC 5176 §3).
    pub fn uses_zeroed_request_authenticator(self) -> bool {
        matches!(
            self,
            Self::AccountingRequest | Self::CoaRequest | Self::DisconnectRequest
        )
    }

    /// True for every packet that is itself a reply to an outstanding
    /// request and thus carries a Response Authenticator keyed on the
    /// request's authenticator.
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Self::AccessAccept
                | Self::AccessReject
                | Self::AccessChallenge
                | Self::AccountingResponse
                | Self::DisconnectAck
                | Self::DisconnectNak
                | Self::CoaAck
                | Self::CoaNak
        )
    }
}

/// One decoded wire attribute: a top-level type, an optional vendor scope
/// (`Some` only for attributes unwrapped out of a Vendor-Specific
/// attribute), and the raw value payload (tag included, fragments already
/// merged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub code: u8,
    pub ext_sub_type: Option<u8>,
    pub vendor: Option<u32>,
    pub value: Vec<u8>,
    /// Long-extended fragment bookkeeping (RFC 6929 §2.1): true once a
    /// fragment without the More flag has been folded in. Irrelevant
    /// (always true) for ordinary attributes.
    complete: bool,
    /// Whether an oversize value may be chopped into RFC 2865 §5.1.5
    /// wire-level fragments. Only `string`/`text`/`octets`/`abinary` permit
    /// this (`DataType::is_splittable`); a `tlv` (or any other structured
    /// type) chopped at an arbitrary 253-byte boundary would corrupt its
    /// nested sub-attribute layout instead of producing a valid split.
    splittable: bool,
}

impl RawAttribute {
    fn attr_code(&self) -> AttrCode {
        match self.ext_sub_type {
            Some(sub) => AttrCode::Extended(ExtendedCode {
                parent: self.code,
                sub_type: sub,
            }),
            None => AttrCode::Plain(self.code),
        }
    }
}

/// A RADIUS packet: header fields plus an ordered, duplicate-preserving
/// attribute list (RADIUS explicitly permits repeated attributes; see
/// spec §9 "multiple-values-per-name semantics").
#[derive(Debug, Clone)]
pub struct Packet {
    pub code: PacketCode,
    pub identifier: u8,
    pub authenticator: [u8; 16],
    attributes: Vec<RawAttribute>,
    secret: Vec<u8>,
    dict: Arc<Dictionary>,
}

impl Packet {
    pub fn new(code: PacketCode, identifier: u8, secret: Vec<u8>, dict: Arc<Dictionary>) -> Self {
        Self {
            code,
            identifier,
            authenticator: [0u8; 16],
            attributes: Vec::new(),
            secret,
            dict,
        }
    }

    /// Build a response sharing this request's identifier, authenticator
    /// (the response MD5 below keys off it), secret, and dictionary.
    pub fn create_response(&self, code: PacketCode) -> Self {
        Self {
            code,
            identifier: self.identifier,
            authenticator: self.authenticator,
            attributes: Vec::new(),
            secret: self.secret.clone(),
            dict: self.dict.clone(),
        }
    }

    pub fn dict(&self) -> &Arc<Dictionary> {
        &self.dict
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn raw_attributes(&self) -> &[RawAttribute] {
        &self.attributes
    }

    /// Append a value under a dictionary-resolved attribute name, without a
    /// tag. See `push_tagged` for tagged attributes.
    pub fn push(&mut self, name: &str, value: Value) -> Result<(), EncodeError> {
        self.push_tagged(name, None, value)
    }

    pub fn push_tagged(
        &mut self,
        name: &str,
        tag: Option<u8>,
        value: Value,
    ) -> Result<(), EncodeError> {
        let def = self
            .dict
            .lookup_by_name(None, name)
            .ok_or_else(|| EncodeError::UnknownAttribute(name.to_string()))?;
        if def.data_type != value.data_type() {
            return Err(EncodeError::TypeMismatch {
                attribute: name.to_string(),
                expected: def.data_type.name(),
            });
        }
        if let Some(t) = tag {
            if t > 31 {
                return Err(EncodeError::TagOutOfRange(t));
            }
        }
        let bytes = value.encode(name)?;
        let tagged = apply_tag(def.data_type, def.has_tag, tag, bytes);
        let (code, ext_sub_type) = match def.code {
            AttrCode::Plain(c) => (c, None),
            AttrCode::Extended(e) => (e.parent, Some(e.sub_type)),
        };
        self.attributes.push(RawAttribute {
            code,
            ext_sub_type,
            vendor: def.vendor,
            value: tagged,
            complete: true,
            splittable: def.data_type.is_splittable(),
        });
        Ok(())
    }

    /// All decoded values stored under `name`, in wire order, each paired
    /// with its tag if the attribute is tagged (RADIUS permits duplicates;
    /// see spec §9).
    pub fn values_tagged(&self, name: &str) -> Result<Vec<(Option<u8>, Value)>, DecodeError> {
        let def = self
            .dict
            .lookup_by_name(None, name)
            .ok_or_else(|| DecodeError::WrongLength {
                attribute: name.to_string(),
                expected: "known attribute",
                actual: 0,
            })?;
        let mut out = Vec::new();
        for attr in &self.attributes {
            if attr.vendor != def.vendor || attr.attr_code() != def.code {
                continue;
            }
            let (tag, raw) = strip_tag(def.data_type, def.has_tag, &attr.value);
            let value = Value::decode(def.data_type, raw, name)?;
            out.push((tag, value));
        }
        Ok(out)
    }

    pub fn values(&self, name: &str) -> Result<Vec<Value>, DecodeError> {
        Ok(self
            .values_tagged(name)?
            .into_iter()
            .map(|(_, v)| v)
            .collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<Value>, DecodeError> {
        Ok(self.values(name)?.into_iter().next())
    }

    pub fn get_str(&self, name: &str) -> Result<Option<String>, DecodeError> {
        Ok(match self.get(name)? {
            Some(Value::Text(s)) => Some(s),
            Some(Value::String(b)) | Some(Value::Octets(b)) => {
                Some(String::from_utf8_lossy(&b).into_owned())
            }
            _ => None,
        })
    }

    pub fn get_u32(&self, name: &str) -> Result<Option<u32>, DecodeError> {
        Ok(match self.get(name)? {
            Some(Value::Integer(v)) => Some(v),
            _ => None,
        })
    }

    /// Encode the User-Password attribute per RFC 2865 §5.2, keying the
    /// MD5 chain off this packet's own Request Authenticator. Call after
    /// `authenticator` has been finalized for AccessRequest packets (i.e.
    /// after `finalize_authenticator`, or with an explicit RA already set).
    pub fn push_user_password(&mut self, password: &[u8]) -> Result<(), EncodeError> {
        let ciphertext = crypto::pw_crypt(password, &self.secret, &self.authenticator)?;
        self.push("User-Password", Value::String(ciphertext))
    }

    pub fn decrypt_user_password(&self) -> Result<Option<Vec<u8>>, DecodeError> {
        let raw = self.values("User-Password")?;
        Ok(raw.into_iter().next().map(|v| match v {
            Value::String(ct) => crypto::pw_decrypt(&ct, &self.secret, &self.authenticator),
            _ => Vec::new(),
        }))
    }

    /// Encode a Tunnel-Password attribute (RFC 2868 §3.5); `salt` must have
    /// its top bit set in the first octet.
    pub fn push_tunnel_password(
        &mut self,
        tag: Option<u8>,
        password: &[u8],
        salt: [u8; 2],
    ) -> Result<(), EncodeError> {
        let ciphertext = crypto::tunnel_pw_crypt(password, &self.secret, &self.authenticator, salt)?;
        self.push_tagged("Tunnel-Password", tag, Value::String(ciphertext))
    }

    /// Finalize this packet's Authenticator per its packet code (spec
    /// §4.C step 3), then encode to wire bytes, writing a valid
    /// Message-Authenticator if one is present (spec §4.C step 4).
    ///
    /// For response codes, `self.authenticator` must already hold the
    /// *request's* authenticator (as set by `create_response`) -- this is
    /// the value the Response Authenticator MD5 is keyed on.
    pub fn encode(&mut self) -> Result<Vec<u8>, EncodeError> {
        self.encode_with_rng(&mut rand::thread_rng())
    }

    pub fn encode_with_rng(&mut self, rng: &mut dyn RngCore) -> Result<Vec<u8>, EncodeError> {
        // A Message-Authenticator is computed whenever one is already
        // present, or mandated: any packet carrying EAP-Message (RFC 2869
        // §5.13) requires one (RFC 3579 §3.3) even if the caller never
        // pushed it explicitly.
        let has_eap_message = self.attributes.iter().any(|a| a.vendor.is_none() && a.code == EAP_MESSAGE_CODE);
        let has_message_authenticator = self.attributes.iter().any(|a| a.vendor.is_none() && a.code == MESSAGE_AUTHENTICATOR_CODE);
        if has_eap_message && !has_message_authenticator {
            self.attributes.push(RawAttribute {
                code: MESSAGE_AUTHENTICATOR_CODE,
                ext_sub_type: None,
                vendor: None,
                value: vec![0u8; 16],
                complete: true,
                splittable: false,
            });
        }

        let attr_bytes = encode_attributes(&self.attributes)?;
        let total_len = MIN_PACKET_LEN + attr_bytes.len();
        if total_len > MAX_PACKET_LEN {
            return Err(EncodeError::PacketTooLarge(total_len));
        }

        let mut buf = BytesMut::with_capacity(total_len);
        buf.put_u8(self.code.as_u8());
        buf.put_u8(self.identifier);
        buf.put_u16(total_len as u16);
        buf.put_slice(&[0u8; 16]); // authenticator placeholder, patched below
        buf.put_slice(&attr_bytes);

        if self.code.uses_random_authenticator() {
            crypto::fill_random(rng, &mut self.authenticator);
        } else if self.code.uses_zeroed_request_authenticator() {
            self.authenticator = crypto::md5(&[
                &buf[0..4],
                &[0u8; 16],
                &attr_bytes,
                &self.secret,
            ]);
        } else if self.code.is_response() {
            let request_authenticator = self.authenticator;
            self.authenticator = crypto::md5(&[
                &buf[0..4],
                &request_authenticator,
                &attr_bytes,
                &self.secret,
            ]);
        }
        buf[4..20].copy_from_slice(&self.authenticator);

        if let Some(offset) = message_authenticator_offset(&self.attributes) {
            let value_start = 20 + offset + 2;
            buf[value_start..value_start + 16].fill(0);
            let mac = crypto::hmac_md5(&self.secret, &buf);
            buf[value_start..value_start + 16].copy_from_slice(&mac);
        }

        Ok(buf.to_vec())
    }

    /// Decode a datagram using this packet's secret and dictionary (spec
    /// §4.C decode steps 1-5). The Request/Response Authenticator itself
    /// is *not* checked here -- callers verify it against the known peer
    /// authenticator via `verify_request_authenticator`/
    /// `verify_response_authenticator`, since only the caller knows which
    /// side of the exchange it is on (spec §4.C step 6).
    pub fn decode(
        data: &[u8],
        secret: Vec<u8>,
        dict: Arc<Dictionary>,
    ) -> Result<Self, DecodeError> {
        if data.len() < MIN_PACKET_LEN {
            return Err(DecodeError::TooShort(data.len()));
        }
        if data.len() > MAX_PACKET_LEN {
            return Err(DecodeError::TooLong(data.len()));
        }
        let code = PacketCode::from_u8(data[0]).ok_or(DecodeError::UnknownCode(data[0]))?;
        let identifier = data[1];
        let length = u16::from_be_bytes([data[2], data[3]]) as usize;
        if length < MIN_PACKET_LEN {
            return Err(DecodeError::LengthTooShort(length));
        }
        if length > data.len() {
            return Err(DecodeError::LengthMismatch {
                declared: length,
                actual: data.len(),
            });
        }
        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..20]);

        let attributes = decode_attributes(&data[20..length], &dict)?;

        if let Some(offset) = message_authenticator_offset(&attributes) {
            let mut verify_buf = data[..length].to_vec();
            let value_start = 20 + offset + 2;
            verify_buf[value_start..value_start + 16].fill(0);
            let expected = crypto::hmac_md5(&secret, &verify_buf);
            let actual = &data[value_start..value_start + 16];
            if actual != expected {
                return Err(DecodeError::WrongLength {
                    attribute: "Message-Authenticator".to_string(),
                    expected: "valid HMAC-MD5",
                    actual: 0,
                });
            }
        }

        Ok(Self {
            code,
            identifier,
            authenticator,
            attributes,
            secret,
            dict,
        })
    }

    /// Verify this (request) packet's Authenticator against the shared
    /// secret, for codes that carry a secret-dependent Request
    /// Authenticator (Accounting-Request, CoA-Request, Disconnect-Request;
    /// Access-Request's authenticator is random and unverifiable at the
    /// transport layer per spec §4.C step 6).
    pub fn verify_request_authenticator(&self, raw: &[u8]) -> bool {
        if !self.code.uses_zeroed_request_authenticator() {
            return true;
        }
        if raw.len() < MIN_PACKET_LEN {
            return false;
        }
        let length = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if length > raw.len() {
            return false;
        }
        let expected = crypto::md5(&[&raw[0..4], &[0u8; 16], &raw[20..length], &self.secret]);
        expected == self.authenticator
    }

    /// Verify a response's Authenticator against the request authenticator
    /// this packet was built from and the shared secret.
    pub fn verify_response_authenticator(&self, raw: &[u8], request_authenticator: &[u8; 16]) -> bool {
        if raw.len() < MIN_PACKET_LEN {
            return false;
        }
        let length = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if length > raw.len() {
            return false;
        }
        let expected = crypto::md5(&[
            &raw[0..4],
            request_authenticator,
            &raw[20..length],
            &self.secret,
        ]);
        expected == self.authenticator
    }
}

fn apply_tag(data_type: DataType, has_tag: bool, tag: Option<u8>, bytes: Vec<u8>) -> Vec<u8> {
    if !has_tag {
        return bytes;
    }
    match (data_type, tag) {
        (DataType::String, None) => bytes,
        (DataType::String, Some(0)) => bytes,
        (_, None) => {
            let mut out = vec![0u8];
            out.extend_from_slice(&bytes);
            out
        }
        (_, Some(t)) => {
            let mut out = vec![t];
            out.extend_from_slice(&bytes);
            out
        }
    }
}

fn strip_tag<'a>(data_type: DataType, has_tag: bool, bytes: &'a [u8]) -> (Option<u8>, &'a [u8]) {
    if !has_tag || bytes.is_empty() {
        return (None, bytes);
    }
    match data_type {
        DataType::String => {
            if bytes[0] <= 0x1F {
                (Some(bytes[0]), &bytes[1..])
            } else {
                (None, bytes)
            }
        }
        _ => {
            let tag = bytes[0];
            (if tag == 0 { None } else { Some(tag) }, &bytes[1..])
        }
    }
}

fn message_authenticator_offset(attributes: &[RawAttribute]) -> Option<usize> {
    let mut offset = 0usize;
    for attr in attributes {
        if attr.vendor.is_none() && attr.code == MESSAGE_AUTHENTICATOR_CODE {
            return Some(offset);
        }
        offset += attribute_wire_len(attr);
    }
    None
}

/// Re-derive how many wire octets one logical attribute occupies, matching
/// `encode_one_attribute`'s output, so the Message-Authenticator's slot can
/// be located without re-serializing everything.
fn attribute_wire_len(attr: &RawAttribute) -> usize {
    encode_one_attribute(attr)
        .map(|b| b.len())
        .unwrap_or(0)
}

const MAX_CHUNK: usize = 253;

/// Serialize every logical attribute to its wire form, handling VSA
/// wrapping and oversize splitting (spec §4.C step 1).
fn encode_attributes(attributes: &[RawAttribute]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    for attr in attributes {
        out.extend_from_slice(&encode_one_attribute(attr)?);
    }
    Ok(out)
}

fn encode_one_attribute(attr: &RawAttribute) -> Result<Vec<u8>, EncodeError> {
    match attr.vendor {
        None => encode_top_level(attr),
        Some(vendor_id) => encode_vsa(vendor_id, attr),
    }
}

fn encode_top_level(attr: &RawAttribute) -> Result<Vec<u8>, EncodeError> {
    if let Some(sub_type) = attr.ext_sub_type {
        return encode_long_extended(attr.code, sub_type, &attr.value);
    }
    if attr.value.len() <= MAX_CHUNK {
        return Ok(simple_attr(attr.code, &attr.value));
    }
    if !attr.splittable {
        return Err(EncodeError::ValueTooLong(format!("attribute {}", attr.code), attr.value.len()));
    }
    let mut out = Vec::new();
    for chunk in attr.value.chunks(MAX_CHUNK) {
        out.extend_from_slice(&simple_attr(attr.code, chunk));
    }
    Ok(out)
}

fn simple_attr(code: u8, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + value.len());
    out.push(code);
    out.push((2 + value.len()) as u8);
    out.extend_from_slice(value);
    out
}

/// RFC 6929 §2.1 long extended attribute: `type | length | ext-type |
/// flags(bit 0x80 = more) | value-chunk`, repeated with the More flag set
/// on every fragment but the last.
fn encode_long_extended(parent: u8, sub_type: u8, value: &[u8]) -> Result<Vec<u8>, EncodeError> {
    const HEADER: usize = 4;
    const CHUNK: usize = 255 - HEADER;
    if value.is_empty() {
        return Ok(vec![parent, HEADER as u8, sub_type, 0]);
    }
    let mut out = Vec::new();
    let chunks: Vec<&[u8]> = value.chunks(CHUNK).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        let more = i + 1 < chunks.len();
        out.push(parent);
        out.push((HEADER + chunk.len()) as u8);
        out.push(sub_type);
        out.push(if more { 0x80 } else { 0 });
        out.extend_from_slice(chunk);
    }
    Ok(out)
}

fn encode_vsa(vendor_id: u32, attr: &RawAttribute) -> Result<Vec<u8>, EncodeError> {
    // Vendor sub-attribute header width isn't known here (it lives on the
    // `Vendor` record) -- callers resolve format via `Packet::push`, which
    // stores the already-assembled raw attribute bytes in `attr.value`
    // when a non-default (1,1) format is needed. For the common (1,1)
    // case used by the overwhelming majority of vendors (and every vendor
    // in the crate's base dictionary), encode directly here.
    //
    // The budget for one sub-attribute's value has to leave room, inside
    // the top-level attribute's single length octet (max 255), for the
    // outer type+length header (2) and the vendor ID (4) in addition to
    // the sub-attribute's own type+length header (2): 255 - 2 - 4 - 2 = 247.
    const OUTER_HEADER: usize = 2;
    const VENDOR_ID_LEN: usize = 4;
    const SUB_HEADER: usize = 2;
    const MAX_SUB_VALUE: usize = 255 - OUTER_HEADER - VENDOR_ID_LEN - SUB_HEADER;
    let mut out = Vec::new();
    if attr.value.len() <= MAX_SUB_VALUE {
        out.extend_from_slice(&vsa_instance(vendor_id, attr.code, &attr.value)?);
    } else {
        for chunk in attr.value.chunks(MAX_SUB_VALUE) {
            out.extend_from_slice(&vsa_instance(vendor_id, attr.code, chunk)?);
        }
    }
    Ok(out)
}

fn vsa_instance(vendor_id: u32, sub_type: u8, chunk: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let sub_len = 2 + chunk.len();
    let inner_len = 4 + sub_len;
    let top_len = 2 + inner_len;
    if top_len > 255 {
        return Err(EncodeError::ValueTooLong(format!("vendor {vendor_id} sub-attribute {sub_type}"), chunk.len()));
    }
    let mut out = Vec::with_capacity(top_len);
    out.push(26);
    out.push(top_len as u8);
    out.extend_from_slice(&vendor_id.to_be_bytes());
    out.push(sub_type);
    out.push(sub_len as u8);
    out.extend_from_slice(chunk);
    Ok(out)
}

/// Parse the attribute-list portion of a packet into logical attributes,
/// unwrapping VSAs, merging long-extended fragments, and merging the
/// classic RFC 2865 §5.1.5 split-attribute form (same code repeated with
/// no continuation marker) for the splittable string-ish types.
fn decode_attributes(data: &[u8], dict: &Dictionary) -> Result<Vec<RawAttribute>, DecodeError> {
    let mut raw: Vec<RawAttribute> = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        if offset + 2 > data.len() {
            return Err(DecodeError::TruncatedHeader(offset));
        }
        let attr_type = data[offset];
        let attr_len = data[offset + 1];
        if attr_len < 2 {
            return Err(DecodeError::AttributeTooShort(attr_len));
        }
        if offset + attr_len as usize > data.len() {
            return Err(DecodeError::AttributeOverrun(offset));
        }
        let value = &data[offset + 2..offset + attr_len as usize];

        if attr_type == 26 {
            decode_vsa_into(value, dict, &mut raw)?;
        } else if is_extended_parent(attr_type) {
            decode_long_extended_fragment(attr_type, value, &mut raw)?;
        } else {
            push_or_merge(&mut raw, attr_type, None, None, value.to_vec());
        }
        offset += attr_len as usize;
    }
    Ok(raw)
}

fn is_extended_parent(code: u8) -> bool {
    (241..=246).contains(&code)
}

fn decode_long_extended_fragment(
    parent: u8,
    value: &[u8],
    out: &mut Vec<RawAttribute>,
) -> Result<(), DecodeError> {
    if value.len() < 2 {
        return Err(DecodeError::MalformedVsa(parent as u32));
    }
    let sub_type = value[0];
    let flags = value[1];
    let more = flags & 0x80 != 0;
    let chunk = &value[2..];

    if let Some(existing) = out
        .iter_mut()
        .find(|a| a.code == parent && a.ext_sub_type == Some(sub_type) && a.vendor.is_none())
    {
        if existing.complete {
            return Err(DecodeError::FragmentOutOfOrder(parent));
        }
        existing.value.extend_from_slice(chunk);
        existing.complete = !more;
    } else {
        out.push(RawAttribute {
            code: parent,
            ext_sub_type: Some(sub_type),
            vendor: None,
            value: chunk.to_vec(),
            complete: !more,
            splittable: true,
        });
    }
    Ok(())
}

fn decode_vsa_into(
    value: &[u8],
    dict: &Dictionary,
    out: &mut Vec<RawAttribute>,
) -> Result<(), DecodeError> {
    if value.len() < 4 {
        return Err(DecodeError::VsaTooShort);
    }
    let vendor_id = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
    let fmt = dict.vendor_by_id(vendor_id);
    let (type_width, length_width) = fmt.map(|v| (v.type_width, v.length_width)).unwrap_or((1, 1));
    let mut offset = 4usize;
    let body = value;
    while offset < body.len() {
        if offset + type_width as usize > body.len() {
            return Err(DecodeError::MalformedVsa(vendor_id));
        }
        let sub_type = read_be(&body[offset..offset + type_width as usize]);
        offset += type_width as usize;
        let sub_len = if length_width == 0 {
            (body.len() - offset) as u32
        } else {
            if offset + length_width as usize > body.len() {
                return Err(DecodeError::MalformedVsa(vendor_id));
            }
            let l = read_be(&body[offset..offset + length_width as usize]);
            offset += length_width as usize;
            l
        };
        let header = type_width as u32 + if length_width == 0 { 0 } else { length_width as u32 };
        let value_len = sub_len.saturating_sub(header) as usize;
        if length_width != 0 && (sub_len as usize) < header as usize {
            return Err(DecodeError::MalformedVsa(vendor_id));
        }
        if offset + value_len > body.len() {
            return Err(DecodeError::MalformedVsa(vendor_id));
        }
        let sub_value = &body[offset..offset + value_len];
        push_or_merge(out, sub_type as u8, None, Some(vendor_id), sub_value.to_vec());
        offset += value_len;
    }
    Ok(())
}

fn read_be(bytes: &[u8]) -> u32 {
    let mut v = 0u32;
    for b in bytes {
        v = (v << 8) | *b as u32;
    }
    v
}

/// Merge classic RFC 2865 §5.1.5 split attributes: if an attribute with the
/// same (vendor, code) already exists at the tail, concatenate instead of
/// creating a second logical attribute. This only triggers for repeated
/// *adjacent* occurrences, matching how encoders emit splits (attributes
/// that are legitimately multi-valued and non-adjacent stay distinct).
fn push_or_merge(
    out: &mut Vec<RawAttribute>,
    code: u8,
    ext_sub_type: Option<u8>,
    vendor: Option<u32>,
    value: Vec<u8>,
) {
    if let Some(last) = out.last_mut() {
        if last.code == code && last.ext_sub_type == ext_sub_type && last.vendor == vendor && last.value.len() == MAX_CHUNK
        {
            last.value.extend_from_slice(&value);
            return;
        }
    }
    out.push(RawAttribute {
        code,
        ext_sub_type,
        vendor,
        value,
        complete: true,
        splittable: true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use std::net::Ipv4Addr;

    fn dict() -> Arc<Dictionary> {
        Arc::new(Dictionary::base())
    }

    #[test]
    fn access_request_user_password_matches_rfc2865_example() {
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccessRequest, 1, b"xyzzy5461".to_vec(), d);
        pkt.authenticator = [0u8; 16];
        pkt.push("User-Name", Value::String(b"nemo".to_vec())).unwrap();
        pkt.push_user_password(b"arctangent").unwrap();
        pkt.push(
            "NAS-IP-Address",
            Value::Ipaddr(Ipv4Addr::new(192, 168, 1, 16)),
        )
        .unwrap();
        pkt.push("NAS-Port", Value::Integer(3)).unwrap();

        let values = pkt.values("User-Password").unwrap();
        match &values[0] {
            Value::String(ct) => assert_eq!(
                ct,
                &vec![
                    0x58, 0x9e, 0xc9, 0x42, 0x32, 0x50, 0xd8, 0x15, 0xba, 0x0c, 0xe2, 0x55, 0x03,
                    0x4b, 0xf5, 0x21,
                ]
            ),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn accounting_request_authenticator_vector() {
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccountingRequest, 0, b"s".to_vec(), d);
        let encoded = pkt.encode().unwrap();
        let expected = crypto::md5(&[&[4u8, 0, 0, 0x14], &[0u8; 16], b"s"]);
        assert_eq!(&encoded[4..20], &expected);
    }

    #[test]
    fn packet_round_trips() {
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccessRequest, 42, b"sharedsecret".to_vec(), d.clone());
        pkt.push("User-Name", Value::String(b"alice".to_vec())).unwrap();
        pkt.push("NAS-Port", Value::Integer(7)).unwrap();
        let encoded = pkt.encode().unwrap();

        let decoded = Packet::decode(&encoded, b"sharedsecret".to_vec(), d).unwrap();
        assert_eq!(decoded.code, PacketCode::AccessRequest);
        assert_eq!(decoded.identifier, 42);
        assert_eq!(
            decoded.get_str("User-Name").unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(decoded.get_u32("NAS-Port").unwrap(), Some(7));
    }

    #[test]
    fn response_authenticator_round_trips_and_detects_tamper() {
        let d = dict();
        let mut req = Packet::new(PacketCode::AccessRequest, 5, b"topsecret".to_vec(), d.clone());
        req.authenticator = [3u8; 16];
        let mut resp = req.create_response(PacketCode::AccessAccept);
        resp.push("Reply-Message", Value::Text("welcome".into())).unwrap();
        let encoded = resp.encode().unwrap();

        assert!(resp.verify_response_authenticator(&encoded, &req.authenticator));

        let mut tampered = encoded.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xFF;
        assert!(!resp.verify_response_authenticator(&tampered, &req.authenticator));
    }

    #[test]
    fn message_authenticator_tamper_detected() {
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccessRequest, 1, b"secret".to_vec(), d.clone());
        pkt.push("User-Name", Value::String(b"bob".to_vec())).unwrap();
        pkt.push("Message-Authenticator", Value::Octets(vec![0; 16])).unwrap();
        let mut encoded = pkt.encode().unwrap();

        let decoded = Packet::decode(&encoded, b"secret".to_vec(), d.clone());
        assert!(decoded.is_ok());

        let last = encoded.len() - 1;
        encoded[last] ^= 0x01;
        let decoded = Packet::decode(&encoded, b"secret".to_vec(), d);
        assert!(decoded.is_err());
    }

    #[test]
    fn long_attribute_splits_and_merges() {
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccessRequest, 1, b"secret".to_vec(), d.clone());
        let long_value = vec![0x42u8; 300];
        pkt.push("Class", Value::Octets(long_value.clone())).unwrap();
        let encoded = pkt.encode().unwrap();

        // Two wire attributes of the same type (25 = Class).
        let attr_bytes = &encoded[20..];
        assert_eq!(attr_bytes[0], 25);
        assert_eq!(attr_bytes[1] as usize, 2 + 253);

        let decoded = Packet::decode(&encoded, b"secret".to_vec(), d).unwrap();
        let values = decoded.values("Class").unwrap();
        assert_eq!(values.len(), 1);
        match &values[0] {
            Value::Octets(v) => assert_eq!(v, &long_value),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn vsa_round_trips_cisco_avpair_example() {
        let path = std::env::temp_dir().join(format!("rr-vsa-{}.txt", std::process::id()));
        std::fs::write(
            &path,
            "VENDOR Cisco 9\nBEGIN-VENDOR Cisco\nATTRIBUTE Cisco-AVPair 1 string\nEND-VENDOR Cisco\n",
        )
        .unwrap();
        let dict = Arc::new(Dictionary::load(&[&path]).unwrap());
        let mut pkt = Packet::new(PacketCode::AccessAccept, 1, b"secret".to_vec(), dict.clone());
        pkt.push("Cisco-AVPair", Value::String(b"shell:priv-lvl=15".to_vec()))
            .unwrap();
        let attr_bytes = encode_attributes(pkt.raw_attributes()).unwrap();
        assert_eq!(attr_bytes[0], 26);
        assert_eq!(&attr_bytes[2..6], &[0, 0, 0, 9]);
        assert_eq!(attr_bytes[6], 1);
        assert_eq!(attr_bytes[7] as usize, 2 + "shell:priv-lvl=15".len());
        assert_eq!(&attr_bytes[8..], b"shell:priv-lvl=15");

        let encoded = pkt.encode().unwrap();
        let decoded = Packet::decode(&encoded, b"secret".to_vec(), dict).unwrap();
        let values = decoded.values("Cisco-AVPair").unwrap();
        assert_eq!(values[0], Value::String(b"shell:priv-lvl=15".to_vec()));
    }

    #[test]
    fn vsa_sub_attribute_over_budget_is_rejected_not_truncated() {
        let path = std::env::temp_dir().join(format!("rr-vsa-overflow-{}.txt", std::process::id()));
        std::fs::write(
            &path,
            "VENDOR Cisco 9\nBEGIN-VENDOR Cisco\nATTRIBUTE Cisco-AVPair 1 string\nEND-VENDOR Cisco\n",
        )
        .unwrap();
        let dict = Arc::new(Dictionary::load(&[&path]).unwrap());
        let mut pkt = Packet::new(PacketCode::AccessAccept, 1, b"secret".to_vec(), dict);
        // One byte over the 247-octet budget (255 - 2 outer header - 4 vendor id - 2 sub header).
        pkt.push("Cisco-AVPair", Value::String(vec![0x41u8; 248])).unwrap();
        let err = encode_attributes(pkt.raw_attributes()).unwrap_err();
        assert!(matches!(err, EncodeError::ValueTooLong(_, 248)));
    }

    #[test]
    fn eap_message_mandates_a_message_authenticator() {
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccessRequest, 1, b"secret".to_vec(), d.clone());
        pkt.push("EAP-Message", Value::Octets(vec![0x02, 0x01, 0x00, 0x04])).unwrap();
        let encoded = pkt.encode().unwrap();
        let decoded = Packet::decode(&encoded, b"secret".to_vec(), d).unwrap();
        assert!(decoded.values("Message-Authenticator").unwrap().into_iter().next().is_some());
    }

    #[test]
    fn non_splittable_attribute_over_chunk_size_is_rejected() {
        // Force a non-splittable RawAttribute directly, since no base dictionary
        // attribute is both Tlv-typed and reachable via push().
        let raw = RawAttribute {
            code: 241,
            ext_sub_type: None,
            vendor: None,
            value: vec![0u8; 254],
            complete: true,
            splittable: false,
        };
        let err = encode_one_attribute(&raw).unwrap_err();
        assert!(matches!(err, EncodeError::ValueTooLong(_, 254)));
    }

    #[test]
    fn ipv6prefix_attribute_round_trips_through_packet() {
        use crate::attr_type::Ipv6Prefix;
        use std::net::Ipv6Addr;
        let d = dict();
        let mut pkt = Packet::new(PacketCode::AccessRequest, 1, b"secret".to_vec(), d.clone());
        pkt.push(
            "Framed-IPv6-Prefix",
            Value::Ipv6prefix(Ipv6Prefix {
                prefix_len: 64,
                addr: "2001:db8::".parse::<Ipv6Addr>().unwrap(),
            }),
        )
        .unwrap();
        let encoded = pkt.encode().unwrap();
        let decoded = Packet::decode(&encoded, b"secret".to_vec(), d).unwrap();
        match decoded.values("Framed-IPv6-Prefix").unwrap().remove(0) {
            Value::Ipv6prefix(p) => assert_eq!(p.prefix_len, 64),
            _ => panic!("wrong variant"),
        }
    }
}
