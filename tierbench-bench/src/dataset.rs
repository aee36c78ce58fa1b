//! Synthetic record generation.

use chrono::Utc;

/// Name and email for one record to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticUser {
    pub name: String,
    pub email: String,
}

/// Run-level wall-clock tag mixed into every generated email.
///
/// Two runs against the same table therefore never collide on email even if
/// a previous run's cleanup did not finish.
pub fn run_tag() -> i64 {
    Utc::now().timestamp_millis()
}

/// Email suffix shared by every user generated for `run_tag`.
pub fn email_suffix(run_tag: i64) -> String {
    format!("_{}@benchmark.test", run_tag)
}

/// Generate `count` users with deterministic names and unique emails.
pub fn generate_users(count: usize, run_tag: i64) -> Vec<SyntheticUser> {
    let suffix = email_suffix(run_tag);
    (0..count)
        .map(|i| SyntheticUser {
            name: format!("User {}", i),
            email: format!("user{}{}", i, suffix),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_emails_are_unique() {
        let users = generate_users(5_000, 1_700_000_000_000);
        let emails: HashSet<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails.len(), 5_000);
    }

    #[test]
    fn test_naming_scheme() {
        let users = generate_users(2, 42);
        assert_eq!(users[0].name, "User 0");
        assert_eq!(users[1].email, "user1_42@benchmark.test");
    }

    #[test]
    fn test_suffix_matches_only_its_own_run() {
        let suffix = email_suffix(42);
        assert!(generate_users(3, 42).iter().all(|u| u.email.ends_with(&suffix)));
        assert!(generate_users(3, 142).iter().all(|u| !u.email.ends_with(&suffix)));
    }

    #[test]
    fn test_different_runs_do_not_collide() {
        let a = generate_users(10, 1);
        let b = generate_users(10, 2);
        assert!(a.iter().all(|u| !b.contains(u)));
    }
}
