use criteria::CriteriaError;

mod common;

#[test]
fn case_when_chain_with_groups_and_otherwise() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select_case_as("myAlias")?
        .when("d.name")?
        .eq_expression("'v'")?
        .then("2")?
        .when_and()?
        .and("d.name")?
        .eq_expression("'v'")?
        .and("d.age")?
        .eq_expression("1")?
        .then("1")?
        .when_or()?
        .or("d.name")?
        .eq_expression("'v'")?
        .or("d.name")?
        .eq_expression("'i'")?
        .then("1")?
        .otherwise("0")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT CASE WHEN d.name = 'v' THEN 2 \
         WHEN d.name = 'v' AND d.age = 1 THEN 1 \
         WHEN d.name = 'v' OR d.name = 'i' THEN 1 \
         ELSE 0 END AS myAlias FROM Document d"
    );
    Ok(())
}

#[test]
fn unaliased_case_renders_bare() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select_case()?
        .when("d.age")?
        .gt(18)?
        .then("'adult'")?
        .otherwise("'minor'")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT CASE WHEN d.age > :param_0 THEN 'adult' ELSE 'minor' END \
         FROM Document d"
    );
    Ok(())
}

#[test]
fn case_conditions_pull_in_joins() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select_case_as("ownerName")?
        .when("d.owner.age")?
        .ge(18)?
        .then("d.owner.name")?
        .otherwise("d.name")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT CASE WHEN owner_1.age >= :param_0 THEN owner_1.name \
         ELSE d.name END AS ownerName FROM Document d JOIN d.owner owner_1"
    );
    Ok(())
}

#[test]
fn when_exists_branch() -> Result<(), CriteriaError> {
    let cb = common::document("d")
        .select_case_as("flag")?
        .when_exists()?
        .from("Person", "p")?
        .select("p.id")?
        .where_("p.name")?
        .eq_expression("d.name")?
        .end()?
        .then("1")?
        .otherwise("0")?;
    assert_eq!(
        cb.query_string()?,
        "SELECT CASE WHEN EXISTS (SELECT p.id FROM Person p WHERE p.name = d.name) \
         THEN 1 ELSE 0 END AS flag FROM Document d"
    );
    Ok(())
}

#[test]
fn case_requires_a_when_branch() -> Result<(), CriteriaError> {
    let err = common::expect_err(common::document("d").select_case()?.otherwise("0"));
    assert!(matches!(err, CriteriaError::Chaining(_)));
    Ok(())
}

#[test]
fn when_group_requires_a_restriction() -> Result<(), CriteriaError> {
    let err = common::expect_err(common::document("d").select_case()?.when_and()?.then("1"));
    assert!(matches!(err, CriteriaError::Chaining(_)));
    Ok(())
}
