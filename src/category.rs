// 🏷️ Transaction taxonomy
// Closed set of categories shared by the categorizer and the analytics aggregator

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionType {
    IncomingMoney,
    PaymentsToCodeHolders,
    TransfersToMobileNumbers,
    BankDeposits,
    AirtimeBillPayments,
    CashPowerBillPayments,
    ThirdPartyInitiated,
    AgentWithdrawals,
    BankTransfers,
    BundlePurchases,

    /// Catch-all; never reported in the per-category breakdown
    Other,
}

impl TransactionType {
    /// The 10 named categories, in categorization order
    pub const NAMED: [TransactionType; 10] = [
        TransactionType::IncomingMoney,
        TransactionType::PaymentsToCodeHolders,
        TransactionType::TransfersToMobileNumbers,
        TransactionType::BankDeposits,
        TransactionType::AirtimeBillPayments,
        TransactionType::CashPowerBillPayments,
        TransactionType::ThirdPartyInitiated,
        TransactionType::AgentWithdrawals,
        TransactionType::BankTransfers,
        TransactionType::BundlePurchases,
    ];

    /// Label as stored and reported
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::IncomingMoney => "Incoming Money",
            TransactionType::PaymentsToCodeHolders => "Payments to Code Holders",
            TransactionType::TransfersToMobileNumbers => "Transfers to Mobile Numbers",
            TransactionType::BankDeposits => "Bank Deposits",
            TransactionType::AirtimeBillPayments => "Airtime Bill Payments",
            TransactionType::CashPowerBillPayments => "Cash Power Bill Payments",
            TransactionType::ThirdPartyInitiated => "Transactions Initiated by Third Parties",
            TransactionType::AgentWithdrawals => "Withdrawals from Agents",
            TransactionType::BankTransfers => "Bank Transfers",
            TransactionType::BundlePurchases => "Internet and Voice Bundle Purchases",
            TransactionType::Other => "Other",
        }
    }

    pub fn is_named(&self) -> bool {
        *self != TransactionType::Other
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransactionType(pub String);

impl fmt::Display for UnknownTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transaction type: {:?}", self.0)
    }
}

impl std::error::Error for UnknownTransactionType {}

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == TransactionType::Other.label() {
            return Ok(TransactionType::Other);
        }
        TransactionType::NAMED
            .iter()
            .copied()
            .find(|t| t.label() == s)
            .ok_or_else(|| UnknownTransactionType(s.to_string()))
    }
}

// Serialized as the label so the wire format matches the stored column
impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
