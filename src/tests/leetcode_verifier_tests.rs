use crate::leetcode_verifier::{find_recent_submission, LeetCodeSubmission};

fn submission(slug: &str, timestamp: &str) -> LeetCodeSubmission {
    LeetCodeSubmission {
        title: slug.replace('-', " "),
        title_slug: slug.to_string(),
        timestamp: timestamp.to_string(),
    }
}

#[test]
fn test_submission_inside_window_matches() {
    let submissions = vec![
        submission("add-two-numbers", "1700000500"),
        submission("two-sum", "1700000100"),
    ];

    let found = find_recent_submission(&submissions, "two-sum", 1_700_000_000);
    assert_eq!(found, Some(&submissions[1]));
}

#[test]
fn test_submission_before_cutoff_ignored() {
    let submissions = vec![submission("two-sum", "1699999999")];

    assert_eq!(
        find_recent_submission(&submissions, "two-sum", 1_700_000_000),
        None
    );
}

#[test]
fn test_unparseable_timestamp_ignored() {
    let submissions = vec![submission("two-sum", "yesterday")];

    assert_eq!(find_recent_submission(&submissions, "two-sum", 0), None);
}

#[test]
fn test_submission_deserializes_from_graphql_shape() {
    let parsed: LeetCodeSubmission = serde_json::from_str(
        r#"{"title":"Two Sum","titleSlug":"two-sum","timestamp":"1700000100"}"#,
    )
    .unwrap();

    assert_eq!(parsed.title_slug, "two-sum");
    assert_eq!(parsed.submitted_at(), Some(1_700_000_100));
}
