use criteria::{CriteriaError, Value};

mod common;

#[test]
fn empty_select_renders_the_root_alias() -> Result<(), CriteriaError> {
    let cb = common::document("d");
    assert_eq!(cb.query_string()?, "SELECT d FROM Document d");
    Ok(())
}

#[test]
fn select_items_render_in_order_with_aliases() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.name")?
        .select_as("d.age", "age")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d.name, d.age AS age FROM Document d"
    );
    Ok(())
}

#[test]
fn distinct_select() -> Result<(), CriteriaError> {
    let cb = common::document("d").select("d.name")?.distinct()?;
    assert_eq!(cb.query_string()?, "SELECT DISTINCT d.name FROM Document d");
    Ok(())
}

#[test]
fn where_restrictions_are_and_combined() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .where_("d.age")?
        .gt(20)?
        .where_("d.name")?
        .like("Doc%")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.age > :param_0 AND d.name LIKE :param_1"
    );

    let params = cb.parameters();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "param_0");
    assert_eq!(params[0].value, Some(Value::Int(20)));
    assert_eq!(params[1].value, Some(Value::Text("Doc%".into())));
    Ok(())
}

#[test]
fn group_by_and_having() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.age")?
        .group_by("d.age")?
        .having("COUNT(d.id)")?
        .gt(2)?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d.age FROM Document d GROUP BY d.age HAVING COUNT(d.id) > :param_0"
    );
    Ok(())
}

#[test]
fn having_without_group_by_is_rejected() {
    let err = common::expect_err(common::document("d").having("d.age"));
    assert!(matches!(err, CriteriaError::Chaining(_)));
}

#[test]
fn order_by_directions_and_null_placement() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .order_by_asc("d.name")?
        .order_by_desc("d.age")?
        .order_by("d.idx", true, true)?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d ORDER BY d.name ASC NULLS LAST, \
         d.age DESC NULLS FIRST, d.idx ASC NULLS FIRST"
    );
    Ok(())
}

#[test]
fn order_by_prefers_the_select_alias() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select_as("UPPER(d.name)", "uname")?
        .order_by_asc("uname")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT UPPER(d.name) AS uname FROM Document d ORDER BY uname ASC NULLS LAST"
    );
    Ok(())
}

#[test]
fn function_arguments_render_without_spaces() -> Result<(), CriteriaError> {
    let cb = common::document("d").select("CONCAT(d.name,' - ',d.age)")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT CONCAT(d.name,' - ',d.age) FROM Document d"
    );
    Ok(())
}

#[test]
fn arithmetic_keeps_explicit_grouping() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.age + d.idx * 2")?
        .select("(d.age + d.idx) * 2")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d.age + d.idx * 2, (d.age + d.idx) * 2 FROM Document d"
    );
    Ok(())
}

#[test]
fn named_parameters_stay_pending_until_bound() -> Result<(), CriteriaError> {
    let cb = common::document("d").where_("d.name")?.eq_expression(":nm")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT d FROM Document d WHERE d.name = :nm"
    );

    let params = cb.parameters();
    assert_eq!(params.len(), 1);
    assert!(params[0].is_pending());

    let cb = cb.set_parameter("nm", "Kevin");
    assert_eq!(cb.parameters()[0].value, Some(Value::Text("Kevin".into())));
    Ok(())
}

#[test]
fn projection_metadata_follows_the_select_list() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select("d.name")?
        .select_as("d.age", "age")?;
    assert_eq!(
        cb.projection()?,
        vec![
            ("d.name".to_owned(), None),
            ("d.age".to_owned(), Some("age".to_owned())),
        ]
    );
    Ok(())
}

#[test]
fn unknown_attribute_fails_at_render_time() {
    let cb = common::document("d").select("d.nope").unwrap();
    let err = cb.query_string().unwrap_err();
    assert!(matches!(err, CriteriaError::Resolution(_)));
}
