//! Human-facing account identifiers.

use rand::Rng;

/// Generate a short public account id of the form `SSL` followed by six
/// digits. Not a primary key; a display handle shown next to the user's
/// name, like the original platform's member numbers.
pub fn generate_public_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("SSL{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape() {
        let id = generate_public_id();
        assert_eq!(id.len(), 9);
        assert!(id.starts_with("SSL"));
        assert!(id[3..].chars().all(|c| c.is_ascii_digit()));
    }
}
