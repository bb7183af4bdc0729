/// file: src/intent.rs
/// description: EIP-681 style payment URIs scanned from QR codes
/// reference: https://eips.ethereum.org/EIPS/eip-681
use alloy_primitives::{Address, hex};
use std::str::FromStr;

pub const PAYMENT_URI_SCHEME: &str = "ethereum:";

const ADDRESS_LEN: usize = 42;
const TRANSFER_PATH: &str = "/transfer?";

/// Recipient (and optional amount) decoded from a scanned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub recipient: Address,
    pub amount: Option<String>,
}

/// `0x` followed by exactly 40 hex digits. No checksum enforcement.
pub fn is_address(candidate: &str) -> bool {
    candidate.len() == ADDRESS_LEN
        && candidate.starts_with("0x")
        && candidate[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

fn to_address(candidate: &str) -> Option<Address> {
    if !is_address(candidate) {
        return None;
    }
    Address::from_str(candidate).ok()
}

/// Plain non-negative decimal: `digits[.digits]`.
pub fn is_decimal_amount(candidate: &str) -> bool {
    let (whole, fraction) = match candidate.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (candidate, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match fraction {
        Some(fraction) => digits(whole) && digits(fraction),
        None => digits(whole),
    }
}

/// Decodes a scanned payload. Returns `None` for anything that does not yield a
/// well-formed recipient; the caller keeps scanning.
pub fn parse_payment_uri(scanned: &str) -> Option<PaymentIntent> {
    let scanned = scanned.trim();

    let Some(rest) = scanned.strip_prefix(PAYMENT_URI_SCHEME) else {
        return to_address(scanned).map(|recipient| PaymentIntent {
            recipient,
            amount: None,
        });
    };

    if let Some(query) = transfer_query(rest) {
        return parse_transfer_query(query);
    }

    // ethereum:<address>[@chain][?params]
    let plain = rest.split('@').next().unwrap_or(rest);
    let plain = plain.split('?').next().unwrap_or(plain);
    to_address(plain).map(|recipient| PaymentIntent {
        recipient,
        amount: None,
    })
}

/// Matches `<0x + 40 hex>/transfer?<query>` case-insensitively and returns the query.
fn transfer_query(rest: &str) -> Option<&str> {
    let target = rest.get(..ADDRESS_LEN)?.as_bytes();
    let tail = rest.get(ADDRESS_LEN..)?;
    if target[0] != b'0'
        || !target[1].eq_ignore_ascii_case(&b'x')
        || !target[2..].iter().all(u8::is_ascii_hexdigit)
    {
        return None;
    }
    let path = tail.get(..TRANSFER_PATH.len())?;
    if !path.eq_ignore_ascii_case(TRANSFER_PATH) {
        return None;
    }
    let query = &tail[TRANSFER_PATH.len()..];
    (!query.is_empty()).then_some(query)
}

fn parse_transfer_query(query: &str) -> Option<PaymentIntent> {
    let mut recipient = None;
    let mut amount = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "address" if recipient.is_none() => recipient = Some(value.into_owned()),
            "amount" if amount.is_none() => amount = Some(value.into_owned()),
            _ => {}
        }
    }

    let recipient = to_address(recipient.as_deref()?)?;
    Some(PaymentIntent {
        recipient,
        amount: amount.filter(|a| is_decimal_amount(a)),
    })
}

/// Receive-side QR payload: `ethereum:<token>/transfer?address=<recipient>`.
pub fn payment_uri(token: Address, recipient: Address) -> String {
    format!(
        "{PAYMENT_URI_SCHEME}{}/transfer?address={}",
        hex::encode_prefixed(token),
        recipient.to_checksum(None)
    )
}
