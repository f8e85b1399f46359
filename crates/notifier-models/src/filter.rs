//! Row filters understood by every record store.

/// A single column predicate. Multiple filters are combined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: String },
    /// `column IN (values)`
    In { column: String, values: Vec<String> },
    /// `column IS NOT NULL`
    NotNull { column: String },
}

impl Filter {
    /// Equality filter.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Set-membership filter.
    pub fn is_in<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Non-null filter.
    pub fn not_null(column: impl Into<String>) -> Self {
        Self::NotNull {
            column: column.into(),
        }
    }

    /// Column the filter applies to.
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } | Self::NotNull { column } => column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(
            Filter::eq("status", "active"),
            Filter::Eq {
                column: "status".into(),
                value: "active".into()
            }
        );
        let f = Filter::is_in("id", ["1", "2"]);
        assert_eq!(f.column(), "id");
        assert!(matches!(f, Filter::In { ref values, .. } if values.len() == 2));
        assert_eq!(Filter::not_null("project").column(), "project");
    }
}
