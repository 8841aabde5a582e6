//! PostgreSQL repository implementations

pub mod user_repo_impl;
pub mod product_repo_impl;
pub mod checkpoint_repo_impl;

pub use user_repo_impl::PgUserRepository;
pub use product_repo_impl::PgProductRepository;
pub use checkpoint_repo_impl::PgCheckpointRepository;

/// Unique-index names the schema declares. The insert paths match the
/// failing constraint by name so conflicts surface as the right domain
/// error instead of a generic database error.
const UNIQUE_CONSTRAINTS: [&str; 3] = [
    "User_email_key",
    "User_walletAddress_key",
    "Product_productId_key",
];

/// Picks the violated unique index out of a database error message, or
/// `None` when the error is not a uniqueness failure.
pub(crate) fn violated_constraint(msg: &str) -> Option<&'static str> {
    if !(msg.contains("unique") || msg.contains("duplicate")) {
        return None;
    }
    UNIQUE_CONSTRAINTS.iter().find(|name| msg.contains(*name)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_postgres_unique_violations_by_constraint_name() {
        let msg = r#"error returned from database: duplicate key value violates unique constraint "User_email_key""#;
        assert_eq!(violated_constraint(msg), Some("User_email_key"));

        let msg = r#"duplicate key value violates unique constraint "Product_productId_key""#;
        assert_eq!(violated_constraint(msg), Some("Product_productId_key"));
    }

    #[test]
    fn other_database_errors_are_not_conflicts() {
        assert_eq!(violated_constraint("connection refused"), None);
        // A uniqueness failure on an index we did not declare stays generic.
        assert_eq!(
            violated_constraint(r#"duplicate key value violates unique constraint "Other_key""#),
            None
        );
    }
}
