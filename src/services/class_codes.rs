use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;

use crate::repositories;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

pub(crate) const CLASS_CODE_LEN: usize = 6;

/// The code space holds 26^3 * 10^3 combinations, so a handful of retries
/// is enough outside of a nearly-full namespace.
const MAX_CODE_ATTEMPTS: usize = 32;

#[derive(Debug, Error)]
pub(crate) enum CodeError {
    #[error("class code space exhausted after {0} attempts")]
    SpaceExhausted(usize),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Three uniform uppercase letters followed by three uniform digits.
pub(crate) fn generate_class_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(CLASS_CODE_LEN);
    for _ in 0..3 {
        let index = rng.gen_range(0..LETTERS.len());
        code.push(LETTERS[index] as char);
    }
    for _ in 0..3 {
        let index = rng.gen_range(0..DIGITS.len());
        code.push(DIGITS[index] as char);
    }
    code
}

/// Codes are stored upper-case; lookups normalize first so matching is
/// case-insensitive everywhere.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub(crate) async fn allocate_class_code(pool: &PgPool) -> Result<String, CodeError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_class_code();
        let existing = repositories::classes::find_by_code(pool, &code).await?;
        if existing.is_none() {
            return Ok(code);
        }
    }

    Err(CodeError::SpaceExhausted(MAX_CODE_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_match_format() {
        for _ in 0..200 {
            let code = generate_class_code();
            assert_eq!(code.len(), CLASS_CODE_LEN);
            assert!(code[..3].chars().all(|c| c.is_ascii_uppercase()));
            assert!(code[3..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn normalize_uppercases_and_trims() {
        assert_eq!(normalize_code(" abc123 "), "ABC123");
        assert_eq!(normalize_code("Cs101A"), "CS101A");
        assert_eq!(normalize_code("EXAM001"), "EXAM001");
    }
}
