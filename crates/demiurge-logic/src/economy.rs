//! Personal economy — possessions, wealth, ledgers, and the derived tier.

use serde::{Deserialize, Serialize};

/// Economic standing, derived from net worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EconomicTier {
    Destitute,
    Poor,
    Modest,
    Comfortable,
    Wealthy,
    Elite,
}

impl EconomicTier {
    pub fn from_net_worth(net_worth: f32) -> Self {
        if net_worth < 10.0 {
            Self::Destitute
        } else if net_worth < 50.0 {
            Self::Poor
        } else if net_worth < 150.0 {
            Self::Modest
        } else if net_worth < 500.0 {
            Self::Comfortable
        } else if net_worth < 2000.0 {
            Self::Wealthy
        } else {
            Self::Elite
        }
    }

    /// Whether this tier puts pressure on the security need.
    pub fn is_precarious(self) -> bool {
        matches!(self, Self::Destitute | Self::Poor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Possession {
    pub name: String,
    pub value: f32,
}

/// A single income or expense line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub label: String,
    /// Amount per turn, always non-negative; direction comes from the ledger.
    pub amount: f32,
    /// Recurring entries settle every turn; one-off entries settle once.
    pub recurring: bool,
}

impl LedgerEntry {
    pub fn recurring(label: impl Into<String>, amount: f32) -> Self {
        Self {
            label: label.into(),
            amount: amount.max(0.0),
            recurring: true,
        }
    }

    pub fn once(label: impl Into<String>, amount: f32) -> Self {
        Self {
            label: label.into(),
            amount: amount.max(0.0),
            recurring: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Economy {
    pub possessions: Vec<Possession>,
    pub wealth: f32,
    pub income: Vec<LedgerEntry>,
    pub expenses: Vec<LedgerEntry>,
    pub tier: EconomicTier,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            possessions: Vec::new(),
            wealth: 50.0,
            income: Vec::new(),
            expenses: Vec::new(),
            tier: EconomicTier::Modest,
        }
    }
}

impl Economy {
    pub fn net_worth(&self) -> f32 {
        self.wealth + self.possessions.iter().map(|p| p.value.max(0.0)).sum::<f32>()
    }

    /// Apply one turn of income and expenses; wealth never drops below zero.
    /// One-off entries are consumed. Returns the net change applied.
    pub fn settle(&mut self) -> f32 {
        let income: f32 = self.income.iter().map(|e| e.amount).sum();
        let expenses: f32 = self.expenses.iter().map(|e| e.amount).sum();
        let before = self.wealth;
        self.wealth = (self.wealth + income - expenses).max(0.0);
        self.income.retain(|e| e.recurring);
        self.expenses.retain(|e| e.recurring);
        self.refresh_tier();
        self.wealth - before
    }

    /// Add (or with a negative amount, remove) wealth directly.
    pub fn adjust(&mut self, amount: f32) {
        self.wealth = (self.wealth + amount).max(0.0);
        self.refresh_tier();
    }

    pub fn refresh_tier(&mut self) {
        self.tier = EconomicTier::from_net_worth(self.net_worth());
    }
}
