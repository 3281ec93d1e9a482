//! Coupon display codes.
//!
//! A coupon is addressed by its UUID everywhere in the system; the code is a
//! short human-readable handle printed on receipts and read back over the
//! counter. Codes are 6-char base-36 derived from UUID v4 randomness and
//! carry no uniqueness constraint - a collision between two customers'
//! coupons is harmless.

use uuid::Uuid;

/// Length of a coupon display code.
pub const COUPON_CODE_LEN: usize = 6;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a 6-char base-36 coupon code.
///
/// ## Example
/// ```rust
/// use perk_core::coupon_code::generate_code;
///
/// let code = generate_code();
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_lowercase()));
/// ```
pub fn generate_code() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut code = [0u8; COUPON_CODE_LEN];
    for slot in code.iter_mut() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    // Safe: alphabet is ASCII.
    String::from_utf8_lossy(&code).into_owned()
}
