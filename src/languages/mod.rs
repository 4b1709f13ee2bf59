//! Emitters rendering the query algebra into concrete target dialects.
//!
//! Each emitter is a pure function over the algebra. Callers are expected
//! to hand emitters that cannot persist intermediate result sets a sequence
//! rewritten by [`crate::query::remove_intermediate_sets`].

mod joda;
mod jq;
mod mongodb;
mod postgres;
mod spark;

pub use joda::Joda;
pub use jq::Jq;
pub use mongodb::MongoDb;
pub use postgres::Postgres;
pub use spark::Spark;

use crate::query::Query;

/// A target dialect the benchmark can be rendered into.
pub trait Language: Sync {
    /// Display name, for humans.
    fn name(&self) -> &'static str;
    /// Unique short name, used to derive CLI flags and file names.
    fn short_name(&self) -> &'static str;
    /// Renders one query.
    fn translate(&self, query: &Query) -> String;
    /// Wraps a line in the dialect's comment syntax.
    fn comment(&self, comment: &str) -> String;
    /// Preface written once at the top of an emitted file.
    fn header(&self) -> &'static str;
    /// Terminator appended after every rendered query.
    fn query_delimiter(&self) -> &'static str;
    /// Whether the dialect can persist intermediate result sets.
    fn supports_intermediate_sets(&self) -> bool;
}

/// All built-in dialects.
pub fn index() -> Vec<&'static dyn Language> {
    vec![&Jq, &MongoDb, &Postgres, &Spark, &Joda]
}

fn comparison_operator(smaller: bool, equal: bool) -> &'static str {
    match (smaller, equal) {
        (true, true) => "<=",
        (true, false) => "<",
        (false, true) => ">=",
        (false, false) => ">",
    }
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn short_names_are_unique() {
        let names: BTreeSet<_> = index().iter().map(|l| l.short_name()).collect();
        assert_eq!(names.len(), index().len());
    }
}
