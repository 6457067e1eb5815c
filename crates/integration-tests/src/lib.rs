//! Cross-crate tests of the rule engine and the HTTP surface live under
//! `tests/`; this crate has no library code of its own.
