use evidence_store_core::{AttributeValue, Container};

use crate::ast::{Atom, CompareOp, Expr, Literal};

/// Evaluates a compiled predicate against `container`. `predicate = None`
/// matches every container (§4.5, "no filter" reads as unconditionally
/// true).
///
/// Comparisons on mismatched types, and any comparison where either operand
/// resolves to an absent field, evaluate to `false` for every operator,
/// including `!=` — a literal reading of "Comparisons on mismatched types
/// yield false (never error). Absent compares unequal to any literal."
pub fn matches(container: &Container, predicate: Option<&Expr>) -> bool {
    match predicate {
        None => true,
        Some(expr) => eval(expr, container),
    }
}

fn eval(expr: &Expr, container: &Container) -> bool {
    match expr {
        Expr::Comparison { op, left, right } => {
            let lhs = resolve(left, container);
            let rhs = resolve(right, container);
            compare(*op, &lhs, &rhs)
        }
        Expr::Bare(atom) => match resolve(atom, container) {
            AttributeValue::Bool(b) => b,
            _ => false,
        },
        Expr::And(left, right) => eval(left, container) && eval(right, container),
        Expr::Or(left, right) => eval(left, container) || eval(right, container),
        Expr::Not(inner) => !eval(inner, container),
    }
}

/// Resolves an atom to its runtime value: a literal maps directly, a field
/// name resolves through the container (absent if unset or unknown).
fn resolve(atom: &Atom, container: &Container) -> AttributeValue {
    match atom {
        Atom::Literal(Literal::Int(i)) => AttributeValue::Int(*i),
        Atom::Literal(Literal::Str(s)) => AttributeValue::Str(s.clone()),
        Atom::Literal(Literal::Bool(b)) => AttributeValue::Bool(*b),
        Atom::Field(name) => container.get(name).cloned().unwrap_or(AttributeValue::Absent),
    }
}

/// Compares two resolved values under a given operator. `Timestamp` is
/// treated as the same family as `Int` for comparison purposes, since the
/// grammar has no dedicated timestamp literal and a timestamp field is an
/// opaque integer per §4.3's "opaque units" note.
fn compare(op: CompareOp, lhs: &AttributeValue, rhs: &AttributeValue) -> bool {
    use AttributeValue::*;

    if lhs.is_absent() || rhs.is_absent() {
        return false;
    }

    match (lhs, rhs) {
        (Bool(a), Bool(b)) => compare_ord(op, a, b),
        (Int(a), Int(b)) => compare_ord(op, a, b),
        (Timestamp(a), Timestamp(b)) => compare_ord(op, a, b),
        (Int(a), Timestamp(b)) | (Timestamp(b), Int(a)) => compare_ord(op, a, b),
        (Str(a), Str(b)) => compare_ord(op, a, b),
        (Identifier(a), Identifier(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => false,
            _ => false,
        },
        (StrSequence(a), StrSequence(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => false,
            _ => false,
        },
        _ => false,
    }
}

fn compare_ord<T: PartialOrd>(op: CompareOp, a: T, b: T) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => false,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use evidence_store_core::{ContainerTypeName, FieldDefinition, FieldName, LogicalTypeName, SchemaDefinition};

    use super::*;
    use crate::parser::parse;

    fn container_with(name: &str, value: AttributeValue) -> Container {
        let logical_type = match &value {
            AttributeValue::Bool(_) => LogicalTypeName::bool(),
            AttributeValue::Int(_) => LogicalTypeName::int(),
            AttributeValue::Str(_) => LogicalTypeName::str(),
            _ => LogicalTypeName::str(),
        };
        let schema = Arc::new(
            SchemaDefinition::new(
                ContainerTypeName::new("test_container").unwrap(),
                vec![FieldDefinition::new(FieldName::new(name).unwrap(), logical_type)],
            )
            .unwrap(),
        );
        let mut container = Container::new(schema);
        container.set(name, value).unwrap();
        container
    }

    #[test]
    fn no_predicate_always_matches() {
        let container = container_with("active", AttributeValue::Bool(true));
        assert!(matches(&container, None));
    }

    #[test]
    fn equality_on_matching_types() {
        let container = container_with("attribute", AttributeValue::Str("MyAttribute".into()));
        let expr = parse(r#"attribute == "MyAttribute""#).unwrap();
        assert!(matches(&container, Some(&expr)));
    }

    #[test]
    fn mismatched_types_never_equal() {
        let container = container_with("attribute", AttributeValue::Int(1));
        let expr = parse(r#"attribute == "1""#).unwrap();
        assert!(!matches(&container, Some(&expr)));
    }

    #[test]
    fn mismatched_types_never_unequal_either() {
        let container = container_with("attribute", AttributeValue::Int(1));
        let expr = parse(r#"attribute != "1""#).unwrap();
        assert!(!matches(&container, Some(&expr)));
    }

    #[test]
    fn absent_field_never_equals_a_literal() {
        let container = container_with("other", AttributeValue::Int(1));
        let expr = parse("attribute == 1").unwrap();
        assert!(!matches(&container, Some(&expr)));
    }

    #[test]
    fn absent_field_never_not_equals_a_literal_either() {
        let container = container_with("other", AttributeValue::Int(1));
        let expr = parse("attribute != 1").unwrap();
        assert!(!matches(&container, Some(&expr)));
    }

    #[test]
    fn ordering_comparisons() {
        let container = container_with("age", AttributeValue::Int(42));
        assert!(matches(&container, Some(&parse("age > 10").unwrap())));
        assert!(!matches(&container, Some(&parse("age < 10").unwrap())));
        assert!(matches(&container, Some(&parse("age >= 42").unwrap())));
        assert!(matches(&container, Some(&parse("age <= 42").unwrap())));
    }

    #[test]
    fn bare_boolean_field_is_truthy() {
        let container = container_with("active", AttributeValue::Bool(true));
        assert!(matches(&container, Some(&parse("active").unwrap())));

        let container = container_with("active", AttributeValue::Bool(false));
        assert!(!matches(&container, Some(&parse("active").unwrap())));
    }

    #[test]
    fn bare_non_boolean_field_is_never_truthy() {
        let container = container_with("attribute", AttributeValue::Str("x".into()));
        assert!(!matches(&container, Some(&parse("attribute").unwrap())));
    }

    #[test]
    fn and_or_not_combinators() {
        let container = container_with("age", AttributeValue::Int(42));
        assert!(matches(&container, Some(&parse("age > 10 and age < 100").unwrap())));
        assert!(!matches(&container, Some(&parse("age > 10 and age > 100").unwrap())));
        assert!(matches(&container, Some(&parse("age > 100 or age < 50").unwrap())));
        assert!(matches(&container, Some(&parse("not age > 100").unwrap())));
    }
}
