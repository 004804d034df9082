//! Pure data types for mapping data-plane error kinds to RFC 9457 problem
//! details, with no dependency on CloudEvents or the HTTP codec itself.

pub mod catalog;
pub mod problem;

pub use catalog::ErrDef;
pub use problem::{APPLICATION_PROBLEM_JSON, Problem};

/// Attach a request instance path to a Problem before returning it.
pub fn finalize(p: Problem, instance: &str) -> Problem {
    p.with_instance(instance)
}
