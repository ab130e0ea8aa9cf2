//! Platform commission split for tip amounts.

/// How a tip amount divides between the platform and the creator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionSplit {
    /// Platform commission, in decimal currency units.
    pub commission: f64,
    /// What the creator keeps, in decimal currency units.
    pub creator_receives: f64,
}

/// Split a tip amount by a commission rate given in whole percent.
///
/// Pure and deterministic; `commission + creator_receives` always equals the
/// tip amount within floating tolerance. Unit conversion happens separately
/// when the figures cross the wire.
pub fn commission_split(tip_amount: f64, rate_percent: u8) -> CommissionSplit {
    let commission = tip_amount * (rate_percent as f64 / 100.0);
    CommissionSplit {
        commission,
        creator_receives: tip_amount - commission,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rate() {
        let split = commission_split(1.0, 10);
        assert!((split.commission - 0.10).abs() < 1e-9);
        assert!((split.creator_receives - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_partner_rate() {
        let split = commission_split(1.0, 3);
        assert!((split.commission - 0.03).abs() < 1e-9);
        assert!((split.creator_receives - 0.97).abs() < 1e-9);
    }

    #[test]
    fn test_split_sums_to_tip() {
        for rate in [3u8, 10] {
            for tip in [0.0, 0.01, 1.0, 7.77, 250.0] {
                let split = commission_split(tip, rate);
                assert!(
                    (split.commission + split.creator_receives - tip).abs() < 1e-9,
                    "split of {tip} at {rate}% must sum back"
                );
            }
        }
    }

    #[test]
    fn test_zero_rate_gives_everything_to_creator() {
        let split = commission_split(5.0, 0);
        assert_eq!(split.commission, 0.0);
        assert_eq!(split.creator_receives, 5.0);
    }
}
