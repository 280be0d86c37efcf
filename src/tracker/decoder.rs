use alloy::primitives::U256;
use alloy::rpc::types::Log;
use alloy::sol;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::str::FromStr;

use super::types::{BridgeDirection, ReceiptLog, Transaction};
use crate::error::{ChainError, TrackerError};
use crate::tokens::registry::TokenRegistry;

// Generate the cashier Receipt event ABI using alloy's sol! macro.
// This gives us Receipt::SIGNATURE_HASH and a typed decoder.
sol! {
    event Receipt(address indexed token, uint256 indexed id, address sender, address recipient, uint256 amount, uint256 fee);
}

/// Decode a log returned for the Receipt filter. A matching log that does
/// not decode fails the window.
pub fn decode_receipt_log(log: &Log) -> Result<ReceiptLog, ChainError> {
    let decoded = log
        .log_decode::<Receipt>()
        .map_err(|e| ChainError::Decode(format!("Receipt log: {}", e)))?;
    let event = decoded.inner.data;

    let block_number = log
        .block_number
        .ok_or_else(|| ChainError::Decode("Receipt log without block number".to_string()))?;
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| ChainError::Decode("Receipt log without transaction hash".to_string()))?;
    // Part of the stored dedup key, so never defaulted.
    let log_index = log
        .log_index
        .ok_or_else(|| ChainError::Decode("Receipt log without log index".to_string()))?;

    Ok(ReceiptLog {
        block_number,
        tx_hash,
        log_index,
        token: event.token,
        deposit_id: event.id,
        sender: event.sender,
        recipient: event.recipient,
        amount: event.amount,
        fee: event.fee,
    })
}

/// Scale a raw integer token amount down by `10^decimals`, exactly.
pub fn normalize_amount(raw: U256, decimals: u8) -> BigDecimal {
    // "<digits>e-<decimals>" keeps every digit; no float ever touches the value.
    BigDecimal::from_str(&format!("{}e-{}", raw, decimals))
        .unwrap_or_default()
        .normalized()
}

fn integer(raw: U256) -> BigDecimal {
    BigDecimal::from_str(&raw.to_string()).unwrap_or_default()
}

/// Turn a receipt into a canonical transaction for `direction`.
///
/// Fails if the receipt's token is not in the registry.
pub fn build_transaction(
    direction: &BridgeDirection,
    registry: &TokenRegistry,
    receipt: &ReceiptLog,
    timestamp: DateTime<Utc>,
) -> Result<Transaction, TrackerError> {
    let token = registry
        .get(&receipt.token)
        .ok_or_else(|| TrackerError::UnknownToken {
            direction: direction.name.clone(),
            token: receipt.token,
        })?;

    Ok(Transaction {
        direction: direction.name.clone(),
        bridge: direction.bridge.clone(),
        source: direction.source.clone(),
        destination: direction.destination.clone(),
        block_number: receipt.block_number,
        tx_hash: receipt.tx_hash,
        log_index: receipt.log_index,
        token: token.address,
        symbol: token.symbol.clone(),
        deposit_id: integer(receipt.deposit_id),
        sender: receipt.sender,
        recipient: receipt.recipient,
        amount: normalize_amount(receipt.amount, token.decimals),
        fee: normalize_amount(receipt.fee, token.decimals),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{direction, registry_with, usdt};
    use alloy::primitives::{address, b256, Address, LogData};
    use alloy::sol_types::SolEvent;

    fn receipt_rpc_log(amount: u64) -> Log {
        let event = Receipt {
            token: usdt().address,
            id: U256::from(77u64),
            sender: address!("1111111111111111111111111111111111111111"),
            recipient: address!("2222222222222222222222222222222222222222"),
            amount: U256::from(amount),
            fee: U256::from(10_000u64),
        };
        let data: LogData = event.encode_log_data();
        Log {
            inner: alloy::primitives::Log {
                address: address!("a0fd7430852361931b23a16f91e7da8c3c0136e9"),
                data,
            },
            block_number: Some(1234),
            transaction_hash: Some(b256!(
                "00000000000000000000000000000000000000000000000000000000000000aa"
            )),
            log_index: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_receipt_log() {
        let decoded = decode_receipt_log(&receipt_rpc_log(1_500_000)).unwrap();
        assert_eq!(decoded.block_number, 1234);
        assert_eq!(decoded.log_index, 3);
        assert_eq!(decoded.token, usdt().address);
        assert_eq!(decoded.deposit_id, U256::from(77u64));
        assert_eq!(decoded.amount, U256::from(1_500_000u64));
        assert_eq!(decoded.fee, U256::from(10_000u64));
        assert_eq!(
            decoded.sender,
            address!("1111111111111111111111111111111111111111")
        );
    }

    #[test]
    fn test_decode_rejects_foreign_event() {
        let mut log = receipt_rpc_log(1);
        let topics = vec![b256!(
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        )];
        log.inner.data = LogData::new_unchecked(topics, Default::default());
        assert!(matches!(
            decode_receipt_log(&log),
            Err(ChainError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_requires_block_number() {
        let mut log = receipt_rpc_log(1);
        log.block_number = None;
        assert!(decode_receipt_log(&log).is_err());
    }

    #[test]
    fn test_decode_requires_log_index() {
        let mut log = receipt_rpc_log(1);
        log.log_index = None;
        assert!(matches!(
            decode_receipt_log(&log),
            Err(ChainError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_sibling_receipts_in_one_tx_keep_distinct_keys() {
        let dir = direction(100, 20);
        let registry = registry_with(vec![usdt()]);
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let mut second = receipt_rpc_log(2_000_000);
        second.log_index = Some(4);
        let txs = [receipt_rpc_log(1_000_000), second]
            .iter()
            .map(|log| {
                let receipt = decode_receipt_log(log).unwrap();
                build_transaction(&dir, &registry, &receipt, ts).unwrap()
            })
            .collect::<Vec<_>>();
        assert_eq!(txs[0].tx_hash, txs[1].tx_hash);

        let store = crate::testing::MemoryStore::default();
        crate::db::CheckpointStore::record_transactions(&store, &txs)
            .await
            .unwrap();
        assert_eq!(store.transactions().len(), 2);
    }

    #[test]
    fn test_normalize_exact() {
        let amount = normalize_amount(U256::from(1_500_000u64), 6);
        assert_eq!(amount, BigDecimal::from_str("1.5").unwrap());
        assert_eq!(amount.to_string(), "1.5");

        let wei = normalize_amount(U256::from(1u64), 18);
        assert_eq!(wei, BigDecimal::from_str("0.000000000000000001").unwrap());

        assert_eq!(
            normalize_amount(U256::from(42u64), 0),
            BigDecimal::from(42)
        );
        assert_eq!(normalize_amount(U256::ZERO, 18), BigDecimal::from(0));
    }

    #[test]
    fn test_normalize_scales_back_to_raw() {
        let raws = [
            U256::from(1u64),
            U256::from(999_999u64),
            U256::from(123_456_789_012_345_678u128),
            U256::MAX,
        ];
        for raw in raws {
            for decimals in 0u8..=18 {
                let amount = normalize_amount(raw, decimals);
                let scale = BigDecimal::from_str(&format!("1e{}", decimals)).unwrap();
                assert_eq!(
                    amount * scale,
                    integer(raw),
                    "raw={} decimals={}",
                    raw,
                    decimals
                );
            }
        }
    }

    #[test]
    fn test_build_transaction() {
        let dir = direction(100, 20);
        let registry = registry_with(vec![usdt()]);
        let receipt = decode_receipt_log(&receipt_rpc_log(1_500_000)).unwrap();
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let tx = build_transaction(&dir, &registry, &receipt, ts).unwrap();
        assert_eq!(tx.direction, dir.name);
        assert_eq!(tx.symbol, "USDT");
        assert_eq!(tx.amount, BigDecimal::from_str("1.5").unwrap());
        assert_eq!(tx.fee, BigDecimal::from_str("0.01").unwrap());
        assert_eq!(tx.deposit_id, BigDecimal::from(77));
        assert_eq!(tx.timestamp, ts);
    }

    #[test]
    fn test_build_transaction_unknown_token() {
        let dir = direction(100, 20);
        let registry = registry_with(vec![]);
        let mut receipt = decode_receipt_log(&receipt_rpc_log(1)).unwrap();
        receipt.token = Address::repeat_byte(0x99);

        let err = build_transaction(&dir, &registry, &receipt, Utc::now()).unwrap_err();
        assert!(matches!(err, TrackerError::UnknownToken { token, .. } if token == Address::repeat_byte(0x99)));
    }
}
