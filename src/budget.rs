/// Calls charged for one paired fetch (normal + token transactions).
pub const PAIRED_FETCH_COST: u32 = 2;

/// Per-invocation ceiling on external provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    ceiling: u32,
    used: u32,
}

impl CallBudget {
    pub fn new(ceiling: u32) -> Self {
        Self { ceiling, used: 0 }
    }

    /// Charges `cost` calls if they fit under the ceiling. Nothing is charged on refusal.
    pub fn try_charge(&mut self, cost: u32) -> bool {
        match self.used.checked_add(cost) {
            Some(next) if next <= self.ceiling => {
                self.used = next;
                true
            }
            _ => false,
        }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn remaining(&self) -> u32 {
        self.ceiling.saturating_sub(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charges_until_ceiling() {
        let mut budget = CallBudget::new(5);
        assert!(budget.try_charge(PAIRED_FETCH_COST));
        assert!(budget.try_charge(PAIRED_FETCH_COST));
        assert_eq!(budget.used(), 4);
        assert!(!budget.try_charge(PAIRED_FETCH_COST));
        assert_eq!(budget.used(), 4);
        assert_eq!(budget.remaining(), 1);
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        let mut budget = CallBudget::new(2);
        assert!(budget.try_charge(PAIRED_FETCH_COST));
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_zero_and_one_refuse_a_pair() {
        assert!(!CallBudget::new(0).try_charge(PAIRED_FETCH_COST));
        assert!(!CallBudget::new(1).try_charge(PAIRED_FETCH_COST));
    }

    #[test]
    fn test_overflow_is_refused() {
        let mut budget = CallBudget::new(u32::MAX);
        assert!(budget.try_charge(u32::MAX - 1));
        assert!(!budget.try_charge(PAIRED_FETCH_COST));
    }
}
