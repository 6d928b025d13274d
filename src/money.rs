//! Integer-cent arithmetic.
//!
//! Amounts are `i64` cents, rates are basis points (1 bp = 0.01 %).

/// Basis points in 100 %.
pub const FULL_BP: u32 = 10_000;

/// `amount × bp / 10 000`, rounded half away from zero.
pub fn bp_of(amount_cents: i64, bp: u32) -> i64 {
    let product = i128::from(amount_cents) * i128::from(bp);
    let rounded = (product.abs() + i128::from(FULL_BP / 2)) / i128::from(FULL_BP);
    let signed = if product < 0 { -rounded } else { rounded };
    signed as i64
}

/// Split a non-negative total into `parts` shares that differ by at most
/// one cent. Remainder cents go to the first shares.
pub fn split_even(total_cents: i64, parts: u32) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let parts_i = i64::from(parts);
    let base = total_cents / parts_i;
    let remainder = total_cents % parts_i;
    (0..parts_i)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Format cents as Brazilian reais, e.g. `R$ 1.234,56`.
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let reais = (abs / 100).to_string();
    let centavos = abs % 100;

    let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
    for (i, ch) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{sign}R$ {grouped},{centavos:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bp_rounds_half_up() {
        // 2.5 % of R$ 1,00 = 2.5 cents → 3
        assert_eq!(bp_of(100, 250), 3);
        // 2.4 % of R$ 1,00 = 2.4 cents → 2
        assert_eq!(bp_of(100, 240), 2);
        assert_eq!(bp_of(-100, 250), -3);
        assert_eq!(bp_of(123_456, FULL_BP), 123_456);
        assert_eq!(bp_of(123_456, 0), 0);
    }

    #[test]
    fn split_puts_remainder_first() {
        assert_eq!(split_even(1000, 3), vec![334, 333, 333]);
        assert_eq!(split_even(900, 3), vec![300, 300, 300]);
        assert_eq!(split_even(2, 3), vec![1, 1, 0]);
        assert!(split_even(100, 0).is_empty());
    }

    #[test]
    fn brl_formatting() {
        assert_eq!(format_brl(0), "R$ 0,00");
        assert_eq!(format_brl(5), "R$ 0,05");
        assert_eq!(format_brl(123_456), "R$ 1.234,56");
        assert_eq!(format_brl(100_000_000), "R$ 1.000.000,00");
        assert_eq!(format_brl(-99_950), "-R$ 999,50");
    }

    proptest! {
        #[test]
        fn split_sums_to_total(total in 0i64..10_000_000, parts in 1u32..=24) {
            let shares = split_even(total, parts);
            prop_assert_eq!(shares.len(), parts as usize);
            prop_assert_eq!(shares.iter().sum::<i64>(), total);
            let max = *shares.iter().max().unwrap();
            let min = *shares.iter().min().unwrap();
            prop_assert!(max - min <= 1);
        }

        #[test]
        fn bp_never_exceeds_amount(amount in 0i64..10_000_000, bp in 0u32..=FULL_BP) {
            let fee = bp_of(amount, bp);
            prop_assert!(fee >= 0);
            prop_assert!(fee <= amount);
        }
    }
}
