use criteria::{CriteriaError, Value};

mod common;

#[test]
fn comparison_operators() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .ge(18)?
        .where_("d.idx")?
        .lt(100)?
        .where_("d.name")?
        .not_eq("draft")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age >= :param_0 AND d.idx < :param_1 \
         AND d.name <> :param_2"
    );
    Ok(())
}

#[test]
fn comparison_against_expression_text() -> Result<(), CriteriaError> {
    let cb = common::document("d").where_("d.age")?.gt_expression("d.idx + 1")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age > d.idx + 1"
    );
    Ok(())
}

#[test]
fn between_and_not_between() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .between(18)
        .and(65)?
        .where_("d.idx")?
        .not_between(1)
        .and(10)?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age BETWEEN :param_0 AND :param_1 \
         AND d.idx NOT BETWEEN :param_2 AND :param_3"
    );
    Ok(())
}

#[test]
fn between_expressions() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .between_expression("d.idx")?
        .and_expression("d.idx + 10")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age BETWEEN d.idx AND d.idx + 10"
    );
    Ok(())
}

#[test]
fn like_case_insensitive_wraps_both_sides() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.name")?
        .like_insensitive("doc%")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE UPPER(d.name) LIKE UPPER(:param_0)"
    );
    Ok(())
}

#[test]
fn like_with_escape_character() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.name")?
        .like_escape("100!%%", '!')?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.name LIKE :param_0 ESCAPE '!'"
    );
    Ok(())
}

#[test]
fn in_binds_the_list_as_one_parameter() -> Result<(), CriteriaError> {
    let cb = common::document("d").where_("d.age")?.in_values([1, 2, 3])?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age IN (:param_0)"
    );
    assert_eq!(
        cb.parameters()[0].value,
        Some(Value::List(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3)
        ]))
    );
    Ok(())
}

#[test]
fn not_in_binds_the_list_as_one_parameter() -> Result<(), CriteriaError> {
    let cb = common::document("d").where_("d.age")?.not_in_values(["a"])?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age NOT IN (:param_0)"
    );
    Ok(())
}

#[test]
fn in_expression_items_render_inline() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .in_expressions(&["1", "2", "d.idx"])?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age IN (1, 2, d.idx)"
    );
    Ok(())
}

#[test]
fn null_checks() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.name")?
        .is_not_null()?
        .where_("d.partnerDocument")?
        .is_null()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.name IS NOT NULL AND d.partnerDocument IS NULL"
    );
    Ok(())
}

#[test]
fn collection_emptiness_does_not_join() -> Result<(), CriteriaError> {
    let cb = common::document("d").where_("d.versions")?.is_empty()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.versions IS EMPTY"
    );
    Ok(())
}

#[test]
fn member_of_keeps_both_sides_unjoined() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.owner")?
        .member_of("d.people")?
        .where_(":p")?
        .not_member_of("d.partners")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.owner MEMBER OF d.people \
         AND :p NOT MEMBER OF d.partners"
    );
    Ok(())
}

#[test]
fn or_group_with_nested_and_groups() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_or()?
        .and_group()?
        .and("d.name")?
        .eq("a")?
        .and("d.age")?
        .gt(1)?
        .end()?
        .and_group()?
        .and("d.name")?
        .eq("b")?
        .and("d.age")?
        .lt(10)?
        .end()?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE (d.name = :param_0 AND d.age > :param_1) \
         OR (d.name = :param_2 AND d.age < :param_3)"
    );
    Ok(())
}

#[test]
fn or_group_mixing_plain_and_grouped_restrictions() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_or()?
        .or("d.name")?
        .eq("a")?
        .and_group()?
        .and("d.age")?
        .gt(1)?
        .and("d.idx")?
        .lt(5)?
        .end()?
        .end()?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.name = :param_0 \
         OR (d.age > :param_1 AND d.idx < :param_2)"
    );
    Ok(())
}

#[test]
fn empty_group_is_dropped() -> Result<(), CriteriaError> {
    let cb = common::document("d").where_or()?.end()?;
    assert_eq!(cb.query_string()?, "SELECT d FROM Document d");
    Ok(())
}
