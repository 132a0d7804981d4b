// Canonical encoding
//
// The byte layout produced here is the compatibility contract for block
// hashes and transaction signatures. Any change to it must bump
// CANONICAL_ENCODING_VERSION.

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use std::io;

use super::block::Block;
use super::transaction::Transaction;

/// Version of the canonical encoding implemented by this module
pub const CANONICAL_ENCODING_VERSION: u8 = 1;

#[derive(Serialize)]
struct CanonicalTransaction<'a> {
    sender_blockchain_address: &'a str,
    recipient_blockchain_address: &'a str,
    value: f32,
}

impl<'a> From<&'a Transaction> for CanonicalTransaction<'a> {
    fn from(transaction: &'a Transaction) -> Self {
        CanonicalTransaction {
            sender_blockchain_address: transaction.sender().as_str(),
            recipient_blockchain_address: transaction.recipient().as_str(),
            value: transaction.value(),
        }
    }
}

#[derive(Serialize)]
struct CanonicalBlock<'a> {
    nonce: u64,
    previous_hash: String,
    transactions: Vec<CanonicalTransaction<'a>>,
    time_stamp: i64,
}

/// Compact JSON with shortest f32 digits and HTML-safe strings
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_value(value).as_bytes())
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if matches!(c, '<' | '>' | '&' | '\u{2028}' | '\u{2029}') {
                writer.write_all(fragment[start..i].as_bytes())?;
                write!(writer, "\\u{:04x}", c as u32)?;
                start = i + c.len_utf8();
            }
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

fn to_canonical_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut serializer = Serializer::with_formatter(Vec::with_capacity(128), CanonicalFormatter);
    value.serialize(&mut serializer)?;
    Ok(serializer.into_inner())
}

/// Encodes a transaction as
/// `{"sender_blockchain_address":..,"recipient_blockchain_address":..,"value":..}`.
///
/// These bytes are both the signing payload and the transaction object
/// embedded in a block encoding.
pub fn encode_transaction(transaction: &Transaction) -> Result<Vec<u8>, serde_json::Error> {
    to_canonical_vec(&CanonicalTransaction::from(transaction))
}

/// Encodes a block as
/// `{"nonce":..,"previous_hash":"<hex>","transactions":[..],"time_stamp":..}`.
pub fn encode_block(block: &Block) -> Result<Vec<u8>, serde_json::Error> {
    to_canonical_vec(&CanonicalBlock {
        nonce: block.nonce(),
        previous_hash: block.previous_hash().to_string(),
        transactions: block.transactions().iter().map(CanonicalTransaction::from).collect(),
        time_stamp: block.timestamp(),
    })
}

/// Formats a transfer value with the shortest digits that round-trip as f32.
///
/// Decimal notation is used for `1e-6 <= |v| < 1e21` and zero, exponent
/// notation (`1e-7`, `1.5e+21`) outside that range. Callers guarantee the
/// value is finite.
pub fn format_value(value: f32) -> String {
    let abs = value.abs();
    if abs == 0.0 || (1e-6..1e21).contains(&abs) {
        return format!("{}", value);
    }

    let formatted = format!("{:e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::block::BlockHash;
    use crate::blockchain::crypto::Wallet;

    fn encoded_transaction(transaction: &Transaction) -> String {
        String::from_utf8(encode_transaction(transaction).unwrap()).unwrap()
    }

    fn encoded_block(block: &Block) -> String {
        String::from_utf8(encode_block(block).unwrap()).unwrap()
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(0.1), "0.1");
        assert_eq!(format_value(100.0), "100");
        assert_eq!(format_value(1e-7), "1e-7");
        assert_eq!(format_value(1.5e21), "1.5e+21");
    }

    #[test]
    fn test_string_escapes() {
        let raw = CanonicalTransaction {
            sender_blockchain_address: "a\"b\\c\n<&>\u{1}",
            recipient_blockchain_address: "\u{2028}x\u{2029}",
            value: 1e-7,
        };
        let encoded = String::from_utf8(to_canonical_vec(&raw).unwrap()).unwrap();

        assert_eq!(
            encoded,
            "{\"sender_blockchain_address\":\"a\\\"b\\\\c\\n\\u003c\\u0026\\u003e\\u0001\",\
             \"recipient_blockchain_address\":\"\\u2028x\\u2029\",\
             \"value\":1e-7}"
        );
    }

    #[test]
    fn test_encode_transaction_layout() {
        let sender = Wallet::new();
        let recipient = Wallet::new();
        let transaction =
            Transaction::new(sender.address().clone(), recipient.address().clone(), 1.0).unwrap();

        let expected = format!(
            "{{\"sender_blockchain_address\":\"{}\",\
             \"recipient_blockchain_address\":\"{}\",\"value\":1}}",
            sender.address(),
            recipient.address()
        );
        assert_eq!(encoded_transaction(&transaction), expected);
    }

    #[test]
    fn test_encode_zero_block() {
        let expected = format!(
            "{{\"nonce\":0,\"previous_hash\":\"{}\",\"transactions\":[],\"time_stamp\":0}}",
            "0".repeat(64)
        );
        assert_eq!(encoded_block(&Block::zero()), expected);
    }

    #[test]
    fn test_encode_block_keeps_transaction_order() {
        let a = Wallet::new();
        let b = Wallet::new();
        let first = Transaction::new(a.address().clone(), b.address().clone(), 1.0).unwrap();
        let second = Transaction::new(b.address().clone(), a.address().clone(), 2.5).unwrap();

        let transactions = vec![first.clone(), second.clone()];
        let block = Block::with_timestamp(7, BlockHash::ZERO, transactions, 42);

        let expected = format!(
            "{{\"nonce\":7,\"previous_hash\":\"{}\",\"transactions\":[{},{}],\"time_stamp\":42}}",
            BlockHash::ZERO,
            encoded_transaction(&first),
            encoded_transaction(&second)
        );
        assert_eq!(encoded_block(&block), expected);
    }

    #[test]
    fn test_encoding_is_valid_json() {
        let a = Wallet::new();
        let b = Wallet::new();
        let transaction = Transaction::new(a.address().clone(), b.address().clone(), 0.5).unwrap();
        let timestamp = 1_700_000_000_000_000_000;
        let block = Block::with_timestamp(1, BlockHash::ZERO, vec![transaction], timestamp);

        let encoded = encode_block(&block).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(parsed["nonce"], 1);
        assert_eq!(parsed["time_stamp"], timestamp);
        assert_eq!(parsed["transactions"][0]["value"], 0.5);
    }
}
