//! CSV format handling for operations and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserializing operations
//! - Conversion from CSV records to processor operations
//! - Balance and transaction output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Operation columns
//!
//! `type,user,tx,brand,amount,coins,reference,method,note,admin`
//!
//! | type      | uses                                                    |
//! |-----------|---------------------------------------------------------|
//! | `submit`  | brand, amount (bill), coins (to redeem), reference (receipt) |
//! | `approve` | admin, note                                             |
//! | `reject`  | admin, note (reason, required)                          |
//! | `pay`     | admin, reference, method, amount (paid out), note       |
//! | `welcome` | coins                                                   |
//! | `adjust`  | admin, coins (signed), note                             |

use crate::types::{
    AdminId, BrandId, CoinBalance, CoinTransaction, Coins, Operation, PaymentDetails,
    PaymentMethod, SubmitRewardRequest, TransactionId, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Only `type`, `user` and `tx` are always required; which of the other
/// columns matter depends on the operation.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    pub user: UserId,
    pub tx: TransactionId,
    #[serde(default)]
    pub brand: Option<BrandId>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub coins: Option<Coins>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub admin: Option<AdminId>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_amount(value: Option<String>, tx: TransactionId) -> Result<Option<Decimal>, String> {
    match non_blank(value) {
        Some(raw) => Decimal::from_str(&raw)
            .map(Some)
            .map_err(|_| format!("Invalid amount '{}' for tx {}", raw, tx)),
        None => Ok(None),
    }
}

/// Convert a CsvRecord to an Operation
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(Operation) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<Operation, String> {
    let CsvRecord {
        op_type,
        user,
        tx,
        brand,
        amount,
        coins,
        reference,
        method,
        note,
        admin,
    } = csv_record;

    let amount = parse_amount(amount, tx)?;
    let reference = non_blank(reference);
    let note = non_blank(note);
    let name = op_type.trim().to_lowercase();
    let require_admin = || {
        admin.ok_or_else(|| format!("{} of tx {} for user {} requires an admin", name, tx, user))
    };

    let operation = match name.as_str() {
        "submit" => {
            let brand = brand.ok_or_else(|| format!("submit tx {} requires a brand", tx))?;
            let bill_amount =
                amount.ok_or_else(|| format!("submit tx {} requires a bill amount", tx))?;
            let mut request = SubmitRewardRequest::new(tx, user, brand, bill_amount)
                .with_redemption(coins.unwrap_or(0));
            request.receipt_url = reference;
            Operation::Submit(request)
        }
        "approve" => Operation::Approve {
            tx,
            user,
            admin: require_admin()?,
            notes: note,
        },
        "reject" => Operation::Reject {
            tx,
            user,
            admin: require_admin()?,
            reason: note.unwrap_or_default(),
        },
        "pay" => {
            let method = match non_blank(method) {
                Some(raw) => PaymentMethod::from_str(&raw)?,
                None => PaymentMethod::Other,
            };
            Operation::Pay {
                tx,
                user,
                admin: require_admin()?,
                payment: PaymentDetails {
                    reference: reference.unwrap_or_default(),
                    method,
                    amount: amount.unwrap_or(Decimal::ZERO),
                    notes: note,
                },
            }
        }
        "welcome" => Operation::WelcomeBonus {
            tx,
            user,
            coins: coins.ok_or_else(|| format!("welcome tx {} requires coins", tx))?,
        },
        "adjust" => Operation::Adjust {
            tx,
            user,
            admin: require_admin()?,
            delta: coins.ok_or_else(|| format!("adjust tx {} requires coins", tx))?,
            notes: note,
        },
        _ => {
            return Err(format!(
                "Invalid operation type: '{}' for tx {}",
                op_type, tx
            ))
        }
    };

    Ok(operation)
}

/// Write ledger rows to CSV format
///
/// Writes rows with columns: user, balance, total_earned, total_redeemed.
/// Rows are sorted by user ID for deterministic output.
pub fn write_balances_csv(balances: &[CoinBalance], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["user", "balance", "total_earned", "total_redeemed"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = balances.to_vec();
    sorted.sort_by_key(|row| row.user_id);

    for row in sorted {
        writer
            .write_record(&[
                row.user_id.to_string(),
                row.balance.to_string(),
                row.total_earned.to_string(),
                row.total_redeemed.to_string(),
            ])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write transaction records to CSV format
///
/// Writes records with columns: tx, user, brand, type, status, bill_amount,
/// coins_earned, coins_redeemed, amount. Records are sorted by transaction ID.
pub fn write_transactions_csv(
    transactions: &[CoinTransaction],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "tx",
            "user",
            "brand",
            "type",
            "status",
            "bill_amount",
            "coins_earned",
            "coins_redeemed",
            "amount",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = transactions.to_vec();
    sorted.sort_by_key(|record| record.id);

    for record in sorted {
        writer
            .write_record(&[
                record.id.to_string(),
                record.user_id.to_string(),
                record.brand_id.map(|b| b.to_string()).unwrap_or_default(),
                record.tx_type.to_string(),
                record.status.to_string(),
                format!("{:.2}", record.bill_amount),
                record.coins_earned.to_string(),
                record.coins_redeemed.to_string(),
                record.amount.to_string(),
            ])
            .map_err(|e| format!("Failed to write transaction record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionStatus, TransactionType};
    use chrono::Utc;
    use rstest::rstest;

    fn record(op_type: &str) -> CsvRecord {
        CsvRecord {
            op_type: op_type.to_string(),
            user: 1,
            tx: 10,
            ..CsvRecord::default()
        }
    }

    #[test]
    fn test_convert_submit() {
        let csv_record = CsvRecord {
            brand: Some(3),
            amount: Some(" 1000.50 ".to_string()),
            coins: Some(50),
            reference: Some("s3://receipts/10.jpg".to_string()),
            ..record("submit")
        };

        let Operation::Submit(request) = convert_csv_record(csv_record).unwrap() else {
            panic!("Expected submit");
        };
        assert_eq!(request.tx, 10);
        assert_eq!(request.user, 1);
        assert_eq!(request.brand, 3);
        assert_eq!(request.bill_amount, Decimal::new(100050, 2));
        assert_eq!(request.coins_to_redeem, 50);
        assert_eq!(request.receipt_url.as_deref(), Some("s3://receipts/10.jpg"));
    }

    #[test]
    fn test_convert_submit_defaults_to_no_redemption() {
        let csv_record = CsvRecord {
            brand: Some(3),
            amount: Some("100".to_string()),
            reference: Some("  ".to_string()),
            ..record("SUBMIT")
        };

        let Operation::Submit(request) = convert_csv_record(csv_record).unwrap() else {
            panic!("Expected submit");
        };
        assert_eq!(request.coins_to_redeem, 0);
        assert!(request.receipt_url.is_none());
    }

    #[test]
    fn test_convert_review_operations() {
        let approve = CsvRecord {
            admin: Some(7),
            note: Some("looks good".to_string()),
            ..record("approve")
        };
        assert_eq!(
            convert_csv_record(approve),
            Ok(Operation::Approve {
                tx: 10,
                user: 1,
                admin: 7,
                notes: Some("looks good".to_string()),
            })
        );

        let reject = CsvRecord {
            admin: Some(7),
            ..record("reject")
        };
        assert_eq!(
            convert_csv_record(reject),
            Ok(Operation::Reject {
                tx: 10,
                user: 1,
                admin: 7,
                reason: String::new(),
            })
        );
    }

    #[test]
    fn test_convert_pay() {
        let csv_record = CsvRecord {
            admin: Some(7),
            reference: Some("UTR123".to_string()),
            method: Some("bank_transfer".to_string()),
            amount: Some("50".to_string()),
            ..record("pay")
        };

        let Operation::Pay { payment, admin, .. } = convert_csv_record(csv_record).unwrap() else {
            panic!("Expected pay");
        };
        assert_eq!(admin, 7);
        assert_eq!(payment.reference, "UTR123");
        assert_eq!(payment.method, PaymentMethod::BankTransfer);
        assert_eq!(payment.amount, Decimal::new(50, 0));
    }

    #[test]
    fn test_convert_welcome_and_adjust() {
        let welcome = CsvRecord {
            coins: Some(25),
            ..record("welcome")
        };
        assert_eq!(
            convert_csv_record(welcome),
            Ok(Operation::WelcomeBonus {
                tx: 10,
                user: 1,
                coins: 25
            })
        );

        let adjust = CsvRecord {
            coins: Some(-5),
            admin: Some(2),
            ..record("adjust")
        };
        assert!(matches!(
            convert_csv_record(adjust),
            Ok(Operation::Adjust { delta: -5, admin: 2, .. })
        ));
    }

    #[rstest]
    #[case::invalid_type(record("deposit"), "Invalid operation type")]
    #[case::submit_missing_brand(CsvRecord { amount: Some("10".into()), ..record("submit") }, "requires a brand")]
    #[case::submit_missing_amount(CsvRecord { brand: Some(1), ..record("submit") }, "requires a bill amount")]
    #[case::invalid_amount(CsvRecord { brand: Some(1), amount: Some("ten".into()), ..record("submit") }, "Invalid amount")]
    #[case::approve_missing_admin(record("approve"), "requires an admin")]
    #[case::welcome_missing_coins(record("welcome"), "requires coins")]
    #[case::unknown_method(CsvRecord { admin: Some(1), method: Some("cheque".into()), ..record("pay") }, "Unknown payment method")]
    fn test_convert_csv_record_errors(#[case] csv_record: CsvRecord, #[case] expected_error: &str) {
        let result = convert_csv_record(csv_record);
        assert!(result.is_err());
        let message = result.unwrap_err();
        assert!(message.contains(expected_error), "got: {}", message);
    }

    #[rstest]
    #[case::empty(vec![], "user,balance,total_earned,total_redeemed\n")]
    #[case::sorted_by_user(
        vec![
            CoinBalance { user_id: 2, balance: 50, total_earned: 100, total_redeemed: 50 },
            CoinBalance { user_id: 1, balance: 100, total_earned: 100, total_redeemed: 0 },
        ],
        "user,balance,total_earned,total_redeemed\n1,100,100,0\n2,50,100,50\n"
    )]
    fn test_write_balances_csv(#[case] balances: Vec<CoinBalance>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_balances_csv(&balances, &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }

    #[test]
    fn test_write_transactions_csv() {
        let now = Utc::now();
        let base = CoinTransaction {
            id: 2,
            user_id: 1,
            brand_id: Some(3),
            tx_type: TransactionType::RewardRequest,
            bill_amount: Decimal::new(1000, 0),
            bill_date: None,
            coins_earned: 100,
            coins_redeemed: 50,
            amount: 50,
            status: TransactionStatus::Approved,
            receipt_url: None,
            admin_notes: None,
            reviewed_by: None,
            payment: None,
            created_at: now,
            status_updated_at: now,
            processed_at: None,
            payment_processed_at: None,
        };
        let bonus = CoinTransaction {
            id: 1,
            brand_id: None,
            tx_type: TransactionType::WelcomeBonus,
            bill_amount: Decimal::ZERO,
            coins_earned: 25,
            coins_redeemed: 0,
            amount: 25,
            status: TransactionStatus::Paid,
            ..base.clone()
        };

        let mut output = Vec::new();
        write_transactions_csv(&[base, bonus], &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "tx,user,brand,type,status,bill_amount,coins_earned,coins_redeemed,amount\n\
             1,1,,WELCOME_BONUS,PAID,0.00,25,0,25\n\
             2,1,3,REWARD_REQUEST,APPROVED,1000.00,100,50,50\n"
        );
    }
}
