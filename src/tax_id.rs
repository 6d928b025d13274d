//! CPF / CNPJ normalisation and check-digit validation.

use crate::error::ShopError;
use crate::models::enums::PersonKind;

const CPF_LEN: usize = 11;
const CNPJ_LEN: usize = 14;

const CNPJ_WEIGHTS_1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_WEIGHTS_2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Keep only ASCII digits (drops `.`, `-`, `/` and spaces).
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a tax id for the given person kind and return its digits.
pub fn validate(kind: PersonKind, raw: &str) -> Result<String, ShopError> {
    let digits = normalize(raw);
    let ok = match kind {
        PersonKind::Individual => is_valid_cpf(&digits),
        PersonKind::Company => is_valid_cnpj(&digits),
    };
    if ok {
        Ok(digits)
    } else {
        let label = match kind {
            PersonKind::Individual => "CPF",
            PersonKind::Company => "CNPJ",
        };
        Err(ShopError::Validation(format!("invalid {label}: {raw}")))
    }
}

pub fn is_valid_cpf(digits: &str) -> bool {
    let Some(d) = to_digits(digits, CPF_LEN) else {
        return false;
    };

    let first = cpf_check_digit(&d[..9]);
    let second = cpf_check_digit(&d[..10]);
    d[9] == first && d[10] == second
}

pub fn is_valid_cnpj(digits: &str) -> bool {
    let Some(d) = to_digits(digits, CNPJ_LEN) else {
        return false;
    };

    let first = cnpj_check_digit(&d[..12], &CNPJ_WEIGHTS_1);
    let second = cnpj_check_digit(&d[..13], &CNPJ_WEIGHTS_2);
    d[12] == first && d[13] == second
}

/// Parse exactly `len` digits, rejecting repeated-digit sequences.
fn to_digits(s: &str, len: usize) -> Option<Vec<u32>> {
    if s.len() != len {
        return None;
    }
    let digits: Vec<u32> = s.chars().map(|c| c.to_digit(10)).collect::<Option<_>>()?;
    if digits.iter().all(|&d| d == digits[0]) {
        return None;
    }
    Some(digits)
}

fn cpf_check_digit(prefix: &[u32]) -> u32 {
    let top = prefix.len() as u32 + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 {
        0
    } else {
        rest
    }
}

fn cnpj_check_digit(prefix: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = prefix.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 {
        0
    } else {
        11 - rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_cpf_with_punctuation() {
        assert_eq!(
            validate(PersonKind::Individual, "529.982.247-25").unwrap(),
            "52998224725"
        );
    }

    #[test]
    fn cpf_wrong_check_digit() {
        assert!(!is_valid_cpf("52998224724"));
        assert!(validate(PersonKind::Individual, "529.982.247-24").is_err());
    }

    #[test]
    fn repeated_digits_rejected() {
        assert!(!is_valid_cpf("11111111111"));
        assert!(!is_valid_cnpj("00000000000000"));
    }

    #[test]
    fn valid_cnpj() {
        assert_eq!(
            validate(PersonKind::Company, "11.222.333/0001-81").unwrap(),
            "11222333000181"
        );
        assert!(!is_valid_cnpj("11222333000182"));
    }

    #[test]
    fn kind_mismatch_is_invalid() {
        assert!(validate(PersonKind::Company, "529.982.247-25").is_err());
        assert!(validate(PersonKind::Individual, "11.222.333/0001-81").is_err());
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(!is_valid_cpf("5299822472"));
        assert!(!is_valid_cnpj(""));
    }
}
