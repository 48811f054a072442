use proptest::prelude::*;
use records_core::resilience::CallOutcome;

/// Strategy for generating any recordable call outcome
pub fn call_outcome_strategy() -> impl Strategy<Value = CallOutcome> {
    prop_oneof![
        Just(CallOutcome::Success),
        Just(CallOutcome::Failure),
        Just(CallOutcome::Timeout),
        Just(CallOutcome::Rejected),
        Just(CallOutcome::Panicked),
        Just(CallOutcome::ShortCircuited),
    ]
}

/// Strategy for generating record ids the way callers supply them
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,35}"
}

/// Strategy for generating a scripted run of store results, `true` meaning failure
pub fn failure_script_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..40)
}
