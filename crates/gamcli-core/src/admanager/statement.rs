//! PQL statement builder
//!
//! Builds the `WHERE .. ORDER BY .. LIMIT ..` query string the statement
//! services accept. Multiple where clauses are ANDed in insertion order.

use super::soap::xml_escape;

#[derive(Debug, Clone, Default)]
pub struct Statement {
    wheres: Vec<String>,
    order_by: Option<(String, bool)>,
    limit: Option<u32>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(mut self, condition: impl Into<String>) -> Self {
        self.wheres.push(condition.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.order_by = Some((field.into(), ascending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The PQL query string.
    pub fn to_query(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.wheres.is_empty() {
            parts.push(format!("WHERE {}", self.wheres.join(" AND ")));
        }
        if let Some((field, ascending)) = &self.order_by {
            let direction = if *ascending { "ASC" } else { "DESC" };
            parts.push(format!("ORDER BY {} {}", field, direction));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {}", limit));
        }
        parts.join(" ")
    }

    /// The `filterStatement` payload for a statement-based service call.
    pub fn to_payload(&self) -> String {
        format!(
            "<filterStatement><query>{}</query></filterStatement>",
            xml_escape(&self.to_query())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_composition() {
        let stmt = Statement::new()
            .where_clause("id > 0")
            .order_by("id", false)
            .limit(10);
        assert_eq!(stmt.to_query(), "WHERE id > 0 ORDER BY id DESC LIMIT 10");
    }

    #[test]
    fn test_multiple_wheres_are_anded() {
        let stmt = Statement::new()
            .where_clause("id > 0")
            .where_clause("status = 'APPROVED'")
            .order_by("id", false)
            .limit(500);
        assert_eq!(
            stmt.to_query(),
            "WHERE id > 0 AND status = 'APPROVED' ORDER BY id DESC LIMIT 500"
        );
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(Statement::new().to_query(), "");
    }

    #[test]
    fn test_payload_escapes_query() {
        let stmt = Statement::new().where_clause("id > 0");
        assert_eq!(
            stmt.to_payload(),
            "<filterStatement><query>WHERE id &gt; 0</query></filterStatement>"
        );
    }
}
