//! Wire protocol definitions
//!
//! Every Auditor endpoint answers with the same envelope: a `type` marker and
//! a `data` payload whose shape depends on the call.

pub mod envelope;
