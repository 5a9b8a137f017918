//! Attempt budget shared by the repair loops.

/// Monotonic attempt counter with a hard ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairBudget {
    used: u32,
    max: u32,
}

impl RepairBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }

    /// Spend one attempt and return its 1-indexed number, or `None` once the
    /// ceiling is reached. `used` never exceeds `max`.
    pub fn try_spend(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spends_up_to_max_then_refuses() {
        let mut budget = RepairBudget::new(2);
        assert_eq!(budget.try_spend(), Some(1));
        assert!(!budget.is_exhausted());
        assert_eq!(budget.try_spend(), Some(2));
        assert!(budget.is_exhausted());
        assert_eq!(budget.try_spend(), None);
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        let mut budget = RepairBudget::new(0);
        assert!(budget.is_exhausted());
        assert_eq!(budget.try_spend(), None);
        assert_eq!(budget.used(), 0);
    }
}
