use criteria::CriteriaError;

mod common;

#[test]
fn quantified_all_comparison() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.name")?
        .ge_all()
        .from("Person", "p")?
        .select("p.name")?
        .where_("p.age")?
        .gt(18)?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.name >= \
         ALL(SELECT p.name FROM Person p WHERE p.age > :param_0)"
    );
    Ok(())
}

#[test]
fn quantified_any_comparison() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .eq_any()
        .from("Person", "p")?
        .select("p.age")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age = ANY(SELECT p.age FROM Person p)"
    );
    Ok(())
}

#[test]
fn plain_subquery_comparison_parenthesizes() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .ge_subquery()
        .from("Person", "p")?
        .select("AVG(p.age)")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age >= (SELECT AVG(p.age) FROM Person p)"
    );
    Ok(())
}

#[test]
fn exists_with_a_correlated_path() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_exists()?
        .from("Person", "p")?
        .select("p.id")?
        .where_("p.name")?
        .eq_expression("d.name")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE EXISTS \
         (SELECT p.id FROM Person p WHERE p.name = d.name)"
    );
    Ok(())
}

#[test]
fn not_exists_defaults_to_the_subquery_root() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_not_exists()?
        .from("Person", "p")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE NOT EXISTS (SELECT p FROM Person p)"
    );
    Ok(())
}

#[test]
fn in_subquery() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .in_subquery()
        .from("Person", "p")?
        .select("p.age")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age IN (SELECT p.age FROM Person p)"
    );
    Ok(())
}

#[test]
fn select_subquery_with_alias() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.name")?
        .select_subquery_as("cnt")?
        .from("Person", "p")?
        .select("COUNT(p.id)")?
        .where_("p.partnerDocument.id")?
        .eq_expression("d.id")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d.name, (SELECT COUNT(p.id) FROM Person p \
         LEFT JOIN p.partnerDocument partnerDocument_1 \
         WHERE partnerDocument_1.id = d.id) AS cnt FROM Document d"
    );
    Ok(())
}

#[test]
fn subqueries_carry_group_by_and_order_by() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .ge_all()
        .from("Person", "p")?
        .select("AVG(p.age)")?
        .group_by("p.name")?
        .order_by_desc("AVG(p.age)")?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age >= \
         ALL(SELECT AVG(p.age) FROM Person p GROUP BY p.name \
         ORDER BY AVG(p.age) DESC NULLS FIRST)"
    );
    Ok(())
}

#[test]
fn positional_parameters_number_across_the_query_tree() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .gt(1)?
        .where_("d.name")?
        .in_subquery()
        .from("Person", "p")?
        .select("p.name")?
        .where_("p.age")?
        .gt(2)?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age > :param_0 AND d.name IN \
         (SELECT p.name FROM Person p WHERE p.age > :param_1)"
    );
    let names: Vec<_> = cb.parameters().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["param_0", "param_1"]);
    Ok(())
}
