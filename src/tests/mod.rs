mod leetcode_verifier_tests;
mod profile_service_tests;
