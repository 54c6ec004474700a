// Exit codes for scripted triage
use veribuf::Verification;

pub const EXIT_MATCH: i32 = 0;
pub const EXIT_MISMATCH: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

/// Exit code for a run that reached the comparison.
pub fn exit_code(verification: &Verification) -> i32 {
    if verification.passed() {
        EXIT_MATCH
    } else {
        EXIT_MISMATCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_maps_to_zero() {
        assert_eq!(exit_code(&Verification::Match { elements: 1024 }), EXIT_MATCH);
    }

    #[test]
    fn mismatch_maps_to_one() {
        let v = Verification::Mismatch { index: 0, expected: 1, actual: 0 };
        assert_eq!(exit_code(&v), EXIT_MISMATCH);
    }

    #[test]
    fn fatal_code_distinct_from_outcomes() {
        assert_eq!(EXIT_FATAL, 2);
        assert_ne!(EXIT_FATAL, EXIT_MATCH);
        assert_ne!(EXIT_FATAL, EXIT_MISMATCH);
    }
}
