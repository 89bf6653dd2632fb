use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::fmt;

/// Item/folder properties a filter or sort order can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemProperty {
    DateTimeReceived,
    Subject,
    DisplayName,
    Other(String),
}

impl ItemProperty {
    pub fn wire_name(&self) -> &str {
        match self {
            ItemProperty::DateTimeReceived => "receivedDateTime",
            ItemProperty::Subject => "subject",
            ItemProperty::DisplayName => "displayName",
            ItemProperty::Other(name) => name,
        }
    }

    fn from_wire_name(name: &str) -> Self {
        match name {
            "receivedDateTime" => ItemProperty::DateTimeReceived,
            "subject" => ItemProperty::Subject,
            "displayName" => ItemProperty::DisplayName,
            other => ItemProperty::Other(other.to_string()),
        }
    }

    fn is_textual(&self) -> bool {
        matches!(self, ItemProperty::Subject | ItemProperty::DisplayName)
    }
}

/// A server-side restriction, in the OData `$filter` form the mail API speaks.
///
/// Only the comparison shapes this tool creates are modelled; anything else a
/// server hands back is kept verbatim as `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    IsGreaterThanOrEqualTo {
        property: ItemProperty,
        value: String,
    },
    IsEqualTo {
        property: ItemProperty,
        value: String,
    },
    Unrecognized(String),
}

impl SearchFilter {
    /// `receivedDateTime ge <cutoff>`
    pub fn received_on_or_after(cutoff: DateTime<Utc>) -> Self {
        SearchFilter::IsGreaterThanOrEqualTo {
            property: ItemProperty::DateTimeReceived,
            value: format_instant(cutoff),
        }
    }

    pub fn display_name_is(name: &str) -> Self {
        SearchFilter::IsEqualTo {
            property: ItemProperty::DisplayName,
            value: name.to_string(),
        }
    }

    pub fn parse(expr: &str) -> Self {
        let unrecognized = || SearchFilter::Unrecognized(expr.to_string());

        let trimmed = expr.trim();
        let mut parts = trimmed.splitn(3, char::is_whitespace);
        let (Some(property), Some(op), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return unrecognized();
        };

        let rest = rest.trim();
        let value = if let Some(quoted) = rest.strip_prefix('\'') {
            let Some(inner) = quoted.strip_suffix('\'') else {
                return unrecognized();
            };
            // a lone quote inside means the expression continues past the literal
            if inner.replace("''", "").contains('\'') {
                return unrecognized();
            }
            inner.replace("''", "'")
        } else if rest.is_empty() || rest.contains(char::is_whitespace) {
            return unrecognized();
        } else {
            rest.to_string()
        };

        let property = ItemProperty::from_wire_name(property);
        match op {
            "ge" => SearchFilter::IsGreaterThanOrEqualTo { property, value },
            "eq" => SearchFilter::IsEqualTo { property, value },
            _ => unrecognized(),
        }
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (property, op, value) = match self {
            SearchFilter::IsGreaterThanOrEqualTo { property, value } => (property, "ge", value),
            SearchFilter::IsEqualTo { property, value } => (property, "eq", value),
            SearchFilter::Unrecognized(expr) => return f.write_str(expr),
        };

        if property.is_textual() {
            write!(
                f,
                "{} {} '{}'",
                property.wire_name(),
                op,
                value.replace('\'', "''")
            )
        } else {
            write!(f, "{} {} {}", property.wire_name(), op, value)
        }
    }
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a date operand as stored by the server. Accepts RFC 3339, a zone-less
/// timestamp (taken as UTC) or a bare date (UTC midnight).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
