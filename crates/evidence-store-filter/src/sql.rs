use crate::ast::{Atom, CompareOp, Expr, Literal};

/// A translated predicate: a SQL `WHERE`-clause fragment (without the
/// `WHERE` keyword) plus its positional parameters, suitable for a
/// parameter-binding API such as `rusqlite`'s `?`-placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub clause: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Str(String),
    Bool(bool),
}

/// A row-backed column the predicate may reference: its name and its
/// declared logical type (e.g. `"bool"`, `"int"`, `"str"`, `"timestamp"`),
/// per the schema/data-type registry table in §4.3.
#[derive(Debug, Clone, Copy)]
pub struct SqlColumn<'a> {
    pub name: &'a str,
    pub logical_type: &'a str,
}

/// Attempts to translate `expr` into a SQL predicate whose columns are all
/// drawn from `columns` (the row-backed fields of the target table).
///
/// Returns `None` when any part of the expression cannot be pushed down:
/// a bare (non-comparison) atom, a comparison whose field is not a known
/// column, a comparison between two literals, or a comparison whose literal
/// does not belong to the column's declared logical type. That last case
/// matters as much as the others: `evidence_store_filter::eval::matches`
/// treats a type-mismatched comparison as unconditionally `false` (never
/// erroring, never deferring to the storage engine's own coercion rules),
/// so pushing a mismatched literal down as a bound SQL parameter and
/// letting SQLite's column-affinity coercion decide the answer would
/// silently disagree with the in-process evaluator. Per §4.8, a predicate
/// that cannot be fully translated falls back to in-process evaluation
/// rather than partially pushing down and risking a mismatch between the
/// SQL-filtered rows and what the in-process evaluator would have selected.
pub fn translate(expr: &Expr, columns: &[SqlColumn<'_>]) -> Option<SqlPredicate> {
    match expr {
        Expr::Comparison { op, left, right } => translate_comparison(*op, left, right, columns),
        Expr::Bare(_) => None,
        Expr::And(left, right) => combine(left, right, columns, "AND"),
        Expr::Or(left, right) => combine(left, right, columns, "OR"),
        Expr::Not(inner) => {
            let inner = translate(inner, columns)?;
            Some(SqlPredicate {
                clause: format!("NOT ({})", inner.clause),
                params: inner.params,
            })
        }
    }
}

fn combine(left: &Expr, right: &Expr, columns: &[SqlColumn<'_>], joiner: &str) -> Option<SqlPredicate> {
    let left = translate(left, columns)?;
    let right = translate(right, columns)?;
    let mut params = left.params;
    params.extend(right.params);
    Some(SqlPredicate {
        clause: format!("({}) {} ({})", left.clause, joiner, right.clause),
        params,
    })
}

/// Whether `literal` belongs to the same comparison family as
/// `logical_type`, mirroring `eval::compare`'s notion of "matching types"
/// (including its rule that `int` and `timestamp` compare as one family).
fn literal_matches_logical_type(literal: &Literal, logical_type: &str) -> bool {
    match literal {
        Literal::Int(_) => logical_type == "int" || logical_type == "timestamp",
        Literal::Str(_) => logical_type == "str",
        Literal::Bool(_) => logical_type == "bool",
    }
}

fn translate_comparison(
    op: CompareOp,
    left: &Atom,
    right: &Atom,
    columns: &[SqlColumn<'_>],
) -> Option<SqlPredicate> {
    let (column, literal) = match (left, right) {
        (Atom::Field(name), Atom::Literal(lit)) => (name, lit),
        (Atom::Literal(lit), Atom::Field(name)) => (name, lit),
        _ => return None,
    };
    let declared = columns.iter().find(|c| c.name == column.as_str())?;
    if !literal_matches_logical_type(literal, declared.logical_type) {
        return None;
    }
    let sql_op = match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    };
    let param = match literal {
        Literal::Int(i) => SqlParam::Int(*i),
        Literal::Str(s) => SqlParam::Str(s.clone()),
        Literal::Bool(b) => SqlParam::Bool(*b),
    };
    Some(SqlPredicate {
        clause: format!("\"{column}\" {sql_op} ?"),
        params: vec![param],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn col<'a>(name: &'a str, logical_type: &'a str) -> SqlColumn<'a> {
        SqlColumn { name, logical_type }
    }

    #[test]
    fn simple_comparison_translates() {
        let expr = parse("age > 10").unwrap();
        let predicate = translate(&expr, &[col("age", "int")]).unwrap();
        assert_eq!(predicate.clause, "\"age\" > ?");
        assert_eq!(predicate.params, vec![SqlParam::Int(10)]);
    }

    #[test]
    fn unknown_column_falls_back() {
        let expr = parse("age > 10").unwrap();
        assert!(translate(&expr, &[col("other", "int")]).is_none());
    }

    #[test]
    fn and_or_compose() {
        let expr = parse("age > 10 and name == \"x\"").unwrap();
        let predicate = translate(&expr, &[col("age", "int"), col("name", "str")]).unwrap();
        assert_eq!(predicate.clause, "(\"age\" > ?) AND (\"name\" = ?)");
        assert_eq!(predicate.params.len(), 2);
    }

    #[test]
    fn bare_atom_is_not_pushable() {
        let expr = parse("active").unwrap();
        assert!(translate(&expr, &[col("active", "bool")]).is_none());
    }

    #[test]
    fn not_wraps_inner_clause() {
        let expr = parse("not age > 10").unwrap();
        let predicate = translate(&expr, &[col("age", "int")]).unwrap();
        assert_eq!(predicate.clause, "NOT (\"age\" > ?)");
    }

    #[test]
    fn mixed_pushable_and_unpushable_falls_back_entirely() {
        let expr = parse("age > 10 and active").unwrap();
        assert!(translate(&expr, &[col("age", "int"), col("active", "bool")]).is_none());
    }

    #[test]
    fn mismatched_literal_type_falls_back_instead_of_pushing_a_coerced_comparison() {
        let expr = parse(r#"age == "1""#).unwrap();
        assert!(translate(&expr, &[col("age", "int")]).is_none());
    }

    #[test]
    fn int_literal_matches_a_timestamp_column() {
        let expr = parse("seen > 10").unwrap();
        let predicate = translate(&expr, &[col("seen", "timestamp")]).unwrap();
        assert_eq!(predicate.clause, "\"seen\" > ?");
    }
}
