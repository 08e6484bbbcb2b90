//! Minimal SOQL inspection: target sObject and declared select list.

use regex::Regex;
use rev_core::{Error, Result};
use std::sync::OnceLock;

fn from_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bFROM\s+(\w+)").expect("valid regex"))
}

fn select_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*SELECT\s").expect("valid regex"))
}

fn from_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\sFROM\s").expect("valid regex"))
}

/// sObject named by the outermost `FROM` clause
pub fn sobject_name(soql: &str) -> Result<String> {
    let outer = strip_subqueries(soql);
    from_clause()
        .captures(&outer)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::Validation("Could not determine object from query".to_string()))
}

/// Column names a query declares, in select-list order.
///
/// Aliased expressions use their alias; unaliased aggregates are named
/// `expr0`, `expr1`, ... as the API does. Returns `None` when the select
/// list cannot be found.
pub fn select_fields(soql: &str) -> Option<Vec<String>> {
    let start = select_keyword().find(soql)?.end();
    let outer = strip_subqueries(soql);
    let end = start + from_keyword().find(&outer[start..])?.start();
    let list = &soql[start..end];

    let mut fields = Vec::new();
    let mut expr_index = 0;
    for item in split_top_level(list) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if item.starts_with('(') {
            // Subquery: the relationship name follows its FROM
            if let Some(c) = from_clause().captures(item) {
                fields.push(c[1].to_string());
            }
            continue;
        }
        let tokens: Vec<&str> = item.split_whitespace().collect();
        let name = if item.contains('(') {
            match item.rfind(')') {
                Some(end) if !item[end + 1..].trim().is_empty() => {
                    item[end + 1..].trim().to_string()
                }
                _ => {
                    let name = format!("expr{}", expr_index);
                    expr_index += 1;
                    name
                }
            }
        } else {
            tokens.last().map(|t| t.to_string()).unwrap_or_default()
        };
        fields.push(name);
    }

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

/// Split on commas outside parentheses.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Blank out parenthesized sections so nested FROMs are ignored. Byte
/// offsets into the result match the input.
fn strip_subqueries(soql: &str) -> String {
    let mut out = String::with_capacity(soql.len());
    let mut depth = 0usize;
    for ch in soql.chars() {
        let inside = depth > 0;
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if inside || ch == '(' {
            out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sobject_name() {
        assert_eq!(sobject_name("SELECT Id FROM Account").unwrap(), "Account");
        assert_eq!(
            sobject_name("select id from custom_object__c where name = 'x'").unwrap(),
            "custom_object__c"
        );
        assert_eq!(
            sobject_name("\n    SELECT\n        Id\n        , Name\n    FROM Contact\n").unwrap(),
            "Contact"
        );
    }

    #[test]
    fn test_sobject_name_ignores_subquery() {
        let soql = "SELECT Id, (SELECT Id FROM Contacts) FROM Account";
        assert_eq!(sobject_name(soql).unwrap(), "Account");
    }

    #[test]
    fn test_sobject_name_missing() {
        assert!(matches!(sobject_name("SELECT Id"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_select_fields() {
        let fields = select_fields("\n SELECT \n Id \n , Name \n FROM Contact").unwrap();
        assert_eq!(fields, vec!["Id", "Name"]);

        let query = concat!(
            "SELECT Account.Name, COUNT(Id), MAX(Amount) top, (SELECT Id FROM Contacts) ",
            "FROM Opportunity GROUP BY Account.Name"
        );
        let fields = select_fields(query).unwrap();
        assert_eq!(fields, vec!["Account.Name", "expr0", "top", "Contacts"]);
    }

    #[test]
    fn test_select_fields_unparseable() {
        assert!(select_fields("FIND {Acme}").is_none());
    }
}
