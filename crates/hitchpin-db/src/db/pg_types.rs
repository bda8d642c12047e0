//! Custom `PostgreSQL` type mappings for Diesel
//!
//! This module provides type-safe wrappers for columns that don't have direct
//! Diesel equivalents, currently the JSONB-encoded recurrence rule.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Jsonb;
use diesel::{AsExpression, FromSqlRow};
use std::io::Write;

use hitchpin_core::types::RecurrenceRule;

/// Wrapper mapping [`RecurrenceRule`] onto the `job.recurrence_rule` JSONB column.
///
/// JSONB wire format is a one-byte version tag followed by JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = Jsonb)]
pub struct JsonRule(pub RecurrenceRule);

impl From<RecurrenceRule> for JsonRule {
    fn from(rule: RecurrenceRule) -> Self {
        Self(rule)
    }
}

impl From<JsonRule> for RecurrenceRule {
    fn from(wrapper: JsonRule) -> Self {
        wrapper.0
    }
}

impl FromSql<Jsonb, Pg> for JsonRule {
    fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
        let bytes = value.as_bytes();
        if bytes.first() != Some(&1) {
            return Err("Unsupported JSONB encoding version".into());
        }
        Ok(Self(serde_json::from_slice(&bytes[1..])?))
    }
}

impl ToSql<Jsonb, Pg> for JsonRule {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(&[1])?;
        serde_json::to_writer(out, &self.0)?;
        Ok(IsNull::No)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitchpin_core::types::{Frequency, RecurrenceEnd};

    #[test]
    fn json_rule_converts_both_ways() {
        let rule = RecurrenceRule::new(Frequency::Monthly, 1, RecurrenceEnd::Forever)
            .expect("valid rule");
        let wrapped = JsonRule::from(rule);
        assert_eq!(RecurrenceRule::from(wrapped), rule);
    }
}
