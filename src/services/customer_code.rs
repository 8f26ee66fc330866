//! Member codes shown at partner counters

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;

use crate::error::{OmniError, Result};
use crate::models::User;
use crate::models::user::MemberCodeResponse;
use crate::storage::Tables;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ATTEMPTS: usize = 16;
const FALLBACK_REGION: &str = "TEMP";

/// Region segment: first three ASCII letters of the country, uppercased.
pub fn region_code(country: &str) -> String {
    let letters: String = country
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();

    if letters.len() < 2 || country.trim().eq_ignore_ascii_case("unknown") {
        FALLBACK_REGION.to_string()
    } else {
        letters
    }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, country: &str) -> String {
    let chars: String = (0..4)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    let digits = rng.gen_range(0..1000);
    format!("OMP-{}-{}-{:03}", region_code(country), chars, digits)
}

/// Generates a customer id not yet present in `tables`.
pub fn allocate(tables: &Tables, country: &str) -> Result<String> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ATTEMPTS {
        let candidate = generate(&mut rng, country);
        if !tables.customer_id_taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(OmniError::internal(
        "Could not allocate a unique customer id",
    ))
}

/// Barcode payload: the id without separators
pub fn barcode_value(customer_id: &str) -> String {
    customer_id.replace('-', "")
}

pub fn member_code(user: &User, points_balance: i64, now: DateTime<Utc>) -> MemberCodeResponse {
    let qr_payload = json!({
        "type": "OMNIPASS_MEMBER",
        "userId": user.id,
        "email": user.email,
        "name": user.name,
        "customerId": user.customer_id,
        "timestamp": now.timestamp_millis(),
    })
    .to_string();

    MemberCodeResponse {
        customer_id: user.customer_id.clone(),
        name: user.name.clone(),
        points_balance,
        qr_payload,
        barcode_value: barcode_value(&user.customer_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use regex::Regex;

    lazy_static! {
        static ref CODE_RE: Regex = Regex::new(r"^OMP-[A-Z]{2,4}-[A-Z0-9]{4}-[0-9]{3}$").unwrap();
    }

    #[test]
    fn test_region_code() {
        assert_eq!(region_code("Japan"), "JAP");
        assert_eq!(region_code("United States"), "UNI");
        assert_eq!(region_code("Unknown"), "TEMP");
        assert_eq!(region_code("대한민국"), "TEMP");
        assert_eq!(region_code("UK"), "UK");
    }

    #[test]
    fn test_generated_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for country in ["Japan", "Unknown", "France"] {
            let code = generate(&mut rng, country);
            assert!(CODE_RE.is_match(&code), "unexpected code {code}");
        }
    }

    #[test]
    fn test_barcode_strips_separators() {
        assert_eq!(barcode_value("OMP-JAP-AB12-007"), "OMPJAPAB12007");
    }
}
