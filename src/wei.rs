//! Wei/ether formatting helpers (spec §1, §8) — out of the core's scope,
//! carried forward as a pure, store-independent utility.
//!
//! Grounded on original_source's `src/utils/math.py`
//! (`wei_to_ether`/`ether_to_wei`, `Decimal` precision 80).

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use std::str::FromStr;

fn wei_per_ether() -> BigDecimal {
    BigDecimal::from_str("1000000000000000000").expect("literal always parses")
}

pub fn wei_to_ether(wei: &BigUint) -> BigDecimal {
    BigDecimal::from_str(&wei.to_string()).expect("BigUint digits are valid decimal digits")
        / wei_per_ether()
}

pub fn ether_to_wei(ether: &BigDecimal) -> BigUint {
    let wei = ether * wei_per_ether();
    let rounded = wei.round(0);
    BigUint::from_str(&rounded.to_bigint().expect("rounded to integer").to_string())
        .expect("non-negative ether input yields a non-negative wei amount")
}

pub fn format_ether(wei: &BigUint) -> String {
    wei_to_ether(wei).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_ether() {
        for w in [0u64, 1, 1_000_000_000_000_000_000, 123_456_789_012_345_678] {
            let wei = BigUint::from(w);
            let ether = wei_to_ether(&wei);
            assert_eq!(ether_to_wei(&ether), wei, "round-trip failed for {w}");
        }
    }

    #[test]
    fn one_ether_is_one_quintillion_wei() {
        let wei = BigUint::from(1_000_000_000_000_000_000u64);
        assert_eq!(wei_to_ether(&wei), BigDecimal::from_str("1").unwrap());
    }
}
