/// file: src/transfer.rs
/// description: send-form validation and ERC-20 transfer calldata for the external chain client
use crate::{
    intent::{PaymentIntent, is_address},
    types::Token,
};
use alloy_primitives::{
    Address, U256, hex,
    utils::{ParseUnits, parse_units},
};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

/// transfer(address,uint256)
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please enter recipient address and amount")]
    MissingFields,

    #[error("Invalid recipient address")]
    InvalidRecipient,

    #[error("Invalid amount")]
    InvalidAmount,
}

#[derive(Debug, Clone, Default)]
pub struct TransferForm {
    pub recipient: String,
    pub amount: String,
}

impl TransferForm {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }

    /// Fills the form from a scanned intent. An intent without an amount leaves
    /// whatever the user already typed.
    pub fn apply_intent(&mut self, intent: &PaymentIntent) {
        self.recipient = intent.recipient.to_checksum(None);
        if let Some(amount) = &intent.amount {
            self.amount = amount.clone();
        }
    }

    pub fn validate(&self, token: &Token) -> Result<TransferRequest, FormError> {
        let recipient = self.recipient.trim();
        let amount = self.amount.trim();

        if recipient.is_empty() || amount.is_empty() {
            return Err(FormError::MissingFields);
        }

        if !is_address(recipient) {
            return Err(FormError::InvalidRecipient);
        }
        let recipient = Address::from_str(recipient).map_err(|_| FormError::InvalidRecipient)?;

        let amount = match parse_units(amount, token.decimals) {
            Ok(ParseUnits::U256(value)) if !value.is_zero() => value,
            _ => return Err(FormError::InvalidAmount),
        };

        Ok(TransferRequest {
            token: token.contract,
            recipient,
            amount,
        })
    }
}

/// A validated transfer ready to hand to a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
}

impl TransferRequest {
    pub fn calldata(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + 32 + 32);
        data.extend_from_slice(&TRANSFER_SELECTOR);
        data.extend_from_slice(self.recipient.into_word().as_slice());
        data.extend_from_slice(&self.amount.to_be_bytes::<32>());
        data
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "to": self.token,
            "recipient": self.recipient,
            "amount": self.amount.to_string(),
            "data": hex::encode_prefixed(self.calldata()),
        })
    }
}
