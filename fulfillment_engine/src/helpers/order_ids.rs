use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderId;

/// Generates a fresh order id: `ord-` followed by 16 random lowercase alphanumerics. Ids are generated per
/// checkout attempt, so collisions surface as an insert error rather than an upsert.
pub fn new_order_id() -> OrderId {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect::<String>().to_lowercase();
    OrderId(format!("ord-{suffix}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_have_the_expected_shape() {
        let id = new_order_id();
        assert!(id.as_str().starts_with("ord-"));
        assert_eq!(id.as_str().len(), 20);
        assert!(id.as_str().chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn ids_are_unique_enough() {
        let a = new_order_id();
        let b = new_order_id();
        assert_ne!(a, b);
    }
}
