//! Candidate ordering utilities.

pub(crate) mod rank;
