// 🏷️ Categorization Rules - Rules as Data
// Ordered waterfall of phrase cues; the first matching rule decides the category

use crate::category::TransactionType;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    /// Every phrase must appear in the body
    pub all_of: &'static [&'static str],

    /// At least one phrase must appear (ignored when empty)
    pub any_of: &'static [&'static str],

    /// Category assigned on match
    pub category: TransactionType,
}

impl CategoryRule {
    /// Case-sensitive substring match, as the cues are copied from the operator's templates
    pub fn matches(&self, body: &str) -> bool {
        self.all_of.iter().all(|cue| body.contains(cue))
            && (self.any_of.is_empty() || self.any_of.iter().any(|cue| body.contains(cue)))
    }
}

/// Precedence matters: "You have received" must win over "transferred to", etc.
pub const DEFAULT_RULES: [CategoryRule; 10] = [
    CategoryRule {
        all_of: &["You have received"],
        any_of: &[],
        category: TransactionType::IncomingMoney,
    },
    CategoryRule {
        all_of: &["Your payment of", "has been completed"],
        any_of: &[],
        category: TransactionType::PaymentsToCodeHolders,
    },
    CategoryRule {
        all_of: &[],
        any_of: &["transferred to", "sent to"],
        category: TransactionType::TransfersToMobileNumbers,
    },
    CategoryRule {
        all_of: &["A bank deposit of", "has been added"],
        any_of: &[],
        category: TransactionType::BankDeposits,
    },
    CategoryRule {
        all_of: &["Your airtime purchase of"],
        any_of: &[],
        category: TransactionType::AirtimeBillPayments,
    },
    CategoryRule {
        all_of: &["Cash Power bill payment"],
        any_of: &[],
        category: TransactionType::CashPowerBillPayments,
    },
    CategoryRule {
        all_of: &["initiated by a third party"],
        any_of: &[],
        category: TransactionType::ThirdPartyInitiated,
    },
    CategoryRule {
        all_of: &["You have withdrawn"],
        any_of: &[],
        category: TransactionType::AgentWithdrawals,
    },
    CategoryRule {
        all_of: &["Bank transfer of"],
        any_of: &[],
        category: TransactionType::BankTransfers,
    },
    CategoryRule {
        all_of: &["Your bundle purchase of"],
        any_of: &[],
        category: TransactionType::BundlePurchases,
    },
];

// ============================================================================
// CATEGORIZER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
}

impl Categorizer {
    /// Categorizer with the built-in waterfall
    pub fn new() -> Self {
        Categorizer {
            rules: DEFAULT_RULES.to_vec(),
        }
    }

    /// Rules are evaluated in the given order
    pub fn from_rules(rules: Vec<CategoryRule>) -> Self {
        Categorizer { rules }
    }

    /// Total: falls back to `Other` when nothing matches
    pub fn categorize(&self, body: &str) -> TransactionType {
        first_match(&self.rules, body)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Categorize with the built-in rules
pub fn categorize(body: &str) -> TransactionType {
    first_match(&DEFAULT_RULES, body)
}

fn first_match(rules: &[CategoryRule], body: &str) -> TransactionType {
    rules
        .iter()
        .find(|rule| rule.matches(body))
        .map(|rule| rule.category)
        .unwrap_or(TransactionType::Other)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_named_category() {
        let cases = [
            ("You have received 2,000 RWF from Jane Smith (*********013).", TransactionType::IncomingMoney),
            ("TxId: 73214484437. Your payment of 1,000 RWF to Jane Smith 12845 has been completed at 2024-05-10 16:31:39.", TransactionType::PaymentsToCodeHolders),
            ("*165*S*10000 RWF transferred to Samuel Carter (250791666666) from 36521838.", TransactionType::TransfersToMobileNumbers),
            ("*113*R*A bank deposit of 40000 RWF has been added to your mobile money account.", TransactionType::BankDeposits),
            ("*162*TxId:13913173274*S*Your airtime purchase of 2000 RWF has been completed.", TransactionType::AirtimeBillPayments),
            ("Your Cash Power bill payment of 5,000 RWF for meter 0412 succeeded.", TransactionType::CashPowerBillPayments),
            ("A transaction of 3,500 RWF by DIRECT PAYMENT LTD was initiated by a third party.", TransactionType::ThirdPartyInitiated),
            ("You Abebe Chala CHEBUDIE (*********036) have via agent: Agent Sophia (250790777777), withdrawn 20000 RWF", TransactionType::Other),
            ("You have withdrawn 20,000 RWF via agent Sophia.", TransactionType::AgentWithdrawals),
            ("Bank transfer of 15,000 RWF to I&M Bank completed.", TransactionType::BankTransfers),
            ("Your bundle purchase of 1,000 RWF for 2GB has been completed.", TransactionType::BundlePurchases),
        ];

        for (body, expected) in cases {
            assert_eq!(categorize(body), expected, "body: {}", body);
        }
    }

    #[test]
    fn test_received_wins_over_transferred() {
        let body = "You have received 5,000 RWF which was transferred to your account.";
        assert_eq!(categorize(body), TransactionType::IncomingMoney);
    }

    #[test]
    fn test_payment_requires_both_cues() {
        // Without "has been completed" rule 2 does not fire; falls through to rule 3
        let body = "Your payment of 1,000 RWF sent to Linda.";
        assert_eq!(categorize(body), TransactionType::TransfersToMobileNumbers);
    }

    #[test]
    fn test_cues_are_case_sensitive() {
        assert_eq!(categorize("YOU HAVE RECEIVED 100 RWF"), TransactionType::Other);
        assert_eq!(categorize("bank transfer of 100 RWF"), TransactionType::Other);
    }

    #[test]
    fn test_total_and_deterministic() {
        let inputs = ["", " ", "random text", "RWF 1,000", "🙂 sent to", "\u{0}"];
        for input in inputs {
            let first = categorize(input);
            assert_eq!(categorize(input), first);
            assert_eq!(Categorizer::new().categorize(input), first);
        }
        assert_eq!(categorize(""), TransactionType::Other);
    }

    #[test]
    fn test_custom_rule_order() {
        // Reversing the waterfall changes the outcome for ambiguous bodies
        let mut rules = DEFAULT_RULES.to_vec();
        rules.reverse();
        let reversed = Categorizer::from_rules(rules);

        let body = "You have received 100 RWF; Bank transfer of 100 RWF";
        assert_eq!(categorize(body), TransactionType::IncomingMoney);
        assert_eq!(reversed.categorize(body), TransactionType::BankTransfers);
        assert_eq!(reversed.rule_count(), 10);
    }

    #[test]
    fn test_default_rules_cover_every_named_category() {
        let categories: Vec<TransactionType> = DEFAULT_RULES.iter().map(|r| r.category).collect();
        assert_eq!(categories, TransactionType::NAMED.to_vec());
    }
}
